//! Registry submission
//!
//! ## Responsibilities
//!
//! - Event pre-flight registration (`POST /api/events`)
//! - Detection delivery (`POST /api/barcodes`)
//! - Structured validation-failure surfacing, distinct from transport
//!   failure
//!
//! Delivery is fire-and-forget: no retry queue, no at-least-once
//! guarantee. A failed submission is reported and the loop continues.

pub mod client;
pub mod types;

pub use client::SubmissionClient;
pub use types::{RegistrationOutcome, SubmissionOutcome};

use crate::models::{DecodedResult, EventContext};
use async_trait::async_trait;

/// Remote registry boundary
///
/// The orchestrator and registrar only see this trait; the HTTP
/// implementation is [`SubmissionClient`].
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Register the session context ahead of any detection
    async fn register_event(&self, context: &EventContext) -> RegistrationOutcome;

    /// Deliver one normalized detection scoped to the session context
    async fn submit_detection(
        &self,
        result: &DecodedResult,
        context: &EventContext,
    ) -> SubmissionOutcome;
}
