//! Session state
//!
//! One explicit struct for everything a scanning session mutates, owned
//! by the orchestrator and handed to collaborators by reference. No
//! ambient globals.

use crate::capability::CapabilitySnapshot;
use crate::chain::{ActiveBackendKind, ChainState};
use crate::models::EventContext;
use chrono::{DateTime, Utc};

/// Mutable state of one scanning session
#[derive(Debug, Clone, Default)]
pub struct ScanSession {
    /// Set once the chain has resolved a backend
    pub started: bool,
    /// Immutable once set; required before any submission
    pub context: Option<EventContext>,
    /// Which backend the chain resolved
    pub backend: Option<ActiveBackendKind>,
    /// Snapshot taken after the registration gate
    pub capability: Option<CapabilitySnapshot>,
    /// Chain transition history for this session
    pub chain_transitions: Vec<ChainState>,
    pub started_at: Option<DateTime<Utc>>,
}

impl ScanSession {
    /// Reset to the pre-start state
    pub fn clear(&mut self) {
        *self = ScanSession::default();
    }
}
