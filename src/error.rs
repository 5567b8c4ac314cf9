//! Error handling for the acquisition pipeline

use std::collections::BTreeMap;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
///
/// The fallback tiers in `chain` and `device::controller` are the only
/// retry-like behavior in the crate; nothing here is retried
/// automatically.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Camera acquisition failed (no device, no permission). Fatal to
    /// the session.
    #[error("Device acquisition failed: {0}")]
    DeviceAcquisition(String),

    /// A backend did not come up within its init budget. Triggers the
    /// next fallback tier.
    #[error("{backend} backend init timed out")]
    BackendInitTimeout { backend: &'static str },

    /// A backend reported an explicit init failure. Triggers the next
    /// fallback tier.
    #[error("Backend init failed: {0}")]
    BackendInit(String),

    /// Illumination or zoom apply failure after all tiers. Recoverable;
    /// the previous feature state stays in effect.
    #[error("Feature negotiation failed: {0}")]
    FeatureNegotiation(String),

    /// A single decode attempt failed. Transient; the loop continues.
    #[error("Decode frame error: {0}")]
    DecodeFrame(String),

    /// Registry rejected the payload with per-field messages
    #[error("Validation failed: {field_errors:?}")]
    Validation {
        field_errors: BTreeMap<String, String>,
    },

    /// Registry answered with a non-success, non-validation status
    #[error("Transport failure: HTTP {status}")]
    Transport { status: u16 },

    /// Request never produced a response
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Config error
    #[error("Config error: {0}")]
    Config(String),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Single-field validation error, same shape the registry returns
    pub fn validation_field(field: &str, message: &str) -> Self {
        let mut field_errors = BTreeMap::new();
        field_errors.insert(field.to_string(), message.to_string());
        Error::Validation { field_errors }
    }
}
