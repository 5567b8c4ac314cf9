//! Shared domain types
//!
//! Symbologies, raw and normalized detections, and the event context
//! that scopes a scanning session.

use serde::{Deserialize, Serialize};

/// Symbology of a scannable symbol
///
/// Full superset across deployments; the active subset is configured
/// per session (see [`crate::normalize::SymbologySet`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Symbology {
    Ean13,
    Ean8,
    UpcA,
    UpcE,
    Code128,
    Code39,
    Codabar,
    Itf,
    QrCode,
    DataMatrix,
    Pdf417,
    Aztec,
}

impl Symbology {
    /// Human-facing label, also used as the wire `format` field
    pub fn label(&self) -> &'static str {
        match self {
            Symbology::Ean13 => "EAN-13",
            Symbology::Ean8 => "EAN-8",
            Symbology::UpcA => "UPC-A",
            Symbology::UpcE => "UPC-E",
            Symbology::Code128 => "Code 128",
            Symbology::Code39 => "Code 39",
            Symbology::Codabar => "Codabar",
            Symbology::Itf => "ITF",
            Symbology::QrCode => "QR",
            Symbology::DataMatrix => "Data Matrix",
            Symbology::Pdf417 => "PDF417",
            Symbology::Aztec => "Aztec",
        }
    }

    /// True for 2-D matrix symbologies with long payloads
    pub fn is_two_dimensional(&self) -> bool {
        matches!(
            self,
            Symbology::QrCode | Symbology::DataMatrix | Symbology::Pdf417 | Symbology::Aztec
        )
    }
}

/// Raw decode event as emitted by a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDetection {
    pub payload: String,
    pub symbology: Symbology,
}

impl RawDetection {
    pub fn new(payload: impl Into<String>, symbology: Symbology) -> Self {
        Self {
            payload: payload.into(),
            symbology,
        }
    }
}

/// Normalized decode result ready for display and submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedResult {
    pub display_value: String,
    pub symbology_label: String,
}

/// Operator-supplied session context
///
/// Created by the registrar after a successful pre-flight registration
/// and immutable thereafter. Every submitted detection carries it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventContext {
    label: String,
    date: String,
}

impl EventContext {
    /// Both fields must be non-empty; the registrar enforces this
    /// before construction.
    pub fn new(label: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            date: date.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn date(&self) -> &str {
        &self.date
    }
}
