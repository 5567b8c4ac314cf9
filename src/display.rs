//! Display surface boundary
//!
//! The core posts structured status messages and never assumes a prior
//! message is still visible. Rendering (and the audio cue) belong to
//! the host.

use std::collections::BTreeMap;

/// Structured status message for the operator surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusMessage {
    /// Free-text progress or guidance
    Info(String),
    /// A symbol was decoded
    Detection {
        display_value: String,
        symbology_label: String,
    },
    /// Registry stored a detection
    Saved { id: String, code: String },
    /// Per-field validation messages, verbatim from the registry
    ValidationErrors(BTreeMap<String, String>),
    /// Generic connectivity trouble; submission was not retried
    Connectivity(String),
    /// Camera is visible but automatic decode is unavailable
    ManualMode,
}

/// Operator-facing display surface
pub trait StatusSurface: Send + Sync {
    fn show(&self, message: StatusMessage);
}

/// Surface that renders status through the log stream
#[derive(Debug, Default)]
pub struct LogSurface;

impl StatusSurface for LogSurface {
    fn show(&self, message: StatusMessage) {
        match message {
            StatusMessage::Info(text) => tracing::info!(status = %text, "Status"),
            StatusMessage::Detection {
                display_value,
                symbology_label,
            } => {
                tracing::info!(value = %display_value, symbology = %symbology_label, "Detected");
            }
            StatusMessage::Saved { id, code } => {
                tracing::info!(id = %id, code = %code, "Saved");
            }
            StatusMessage::ValidationErrors(errors) => {
                for (field, message) in &errors {
                    tracing::warn!(field = %field, message = %message, "Validation error");
                }
            }
            StatusMessage::Connectivity(text) => tracing::warn!(detail = %text, "Connectivity"),
            StatusMessage::ManualMode => {
                tracing::info!("Manual mode: camera visible, no automatic decode");
            }
        }
    }
}
