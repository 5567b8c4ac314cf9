//! Event registrar
//!
//! One-time pre-flight: validate the operator-supplied context, register
//! it with the registry, and gate the rest of the pipeline on success.
//! Nothing downstream (capability probe included) runs until this
//! yields an [`EventContext`].

use crate::error::{Error, Result};
use crate::models::EventContext;
use crate::submission::{RegistrationOutcome, RegistryClient};
use std::sync::Arc;
use tracing::info;

/// Registers the session context with the remote registry
pub struct EventRegistrar {
    registry: Arc<dyn RegistryClient>,
}

impl EventRegistrar {
    pub fn new(registry: Arc<dyn RegistryClient>) -> Self {
        Self { registry }
    }

    /// Validate and register the context
    ///
    /// Local emptiness checks use the same field→message shape the
    /// registry's validation responses use, so the surface renders both
    /// identically.
    pub async fn register(&self, label: &str, date: &str) -> Result<EventContext> {
        let label = label.trim();
        let date = date.trim();

        if label.is_empty() {
            return Err(Error::validation_field("event", "required"));
        }
        if date.is_empty() {
            return Err(Error::validation_field("date", "required"));
        }

        let context = EventContext::new(label, date);

        match self.registry.register_event(&context).await {
            RegistrationOutcome::Registered => {
                info!(event = %label, date = %date, "Event context registered");
                Ok(context)
            }
            RegistrationOutcome::ValidationFailed { field_errors } => {
                Err(Error::Validation { field_errors })
            }
            RegistrationOutcome::TransportFailed { status } => Err(Error::Transport { status }),
            RegistrationOutcome::ConnectionFailed => Err(Error::Connection(
                "could not reach the registry to register the event".to_string(),
            )),
        }
    }
}
