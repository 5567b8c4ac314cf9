//! Result normalizer
//!
//! Maps a raw (payload, symbology) pair to the canonical display string
//! and submission fields. The per-symbology display policy is data, not
//! control flow: new symbologies get a table row, not a branch.

use crate::models::{DecodedResult, RawDetection, Symbology};

/// Display policy for one symbology
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayRule {
    /// Keep only the first `n` characters when the payload is at least
    /// that long
    KeepPrefix(usize),
    /// Truncate payloads longer than `n` characters and append an
    /// ellipsis marker
    ClipEllipsis(usize),
    /// Pass the payload through unchanged
    PassThrough,
}

/// Ordered (symbology, rule) table; first match wins
#[derive(Debug, Clone)]
pub struct DisplayRules {
    rules: Vec<(Symbology, DisplayRule)>,
}

impl Default for DisplayRules {
    fn default() -> Self {
        let mut rules = vec![(Symbology::Ean13, DisplayRule::KeepPrefix(9))];
        for symbology in SymbologySet::full().readers() {
            if symbology.is_two_dimensional() {
                rules.push((*symbology, DisplayRule::ClipEllipsis(50)));
            }
        }
        Self { rules }
    }
}

impl DisplayRules {
    pub fn new(rules: Vec<(Symbology, DisplayRule)>) -> Self {
        Self { rules }
    }

    /// Rule for a symbology; absent means pass-through
    pub fn rule_for(&self, symbology: Symbology) -> DisplayRule {
        self.rules
            .iter()
            .find(|(s, _)| *s == symbology)
            .map(|(_, rule)| *rule)
            .unwrap_or(DisplayRule::PassThrough)
    }
}

/// Active symbology subset for a deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbologySet {
    enabled: Vec<Symbology>,
}

impl SymbologySet {
    /// The narrowed single-symbology deployment mode
    pub fn ean13_only() -> Self {
        Self {
            enabled: vec![Symbology::Ean13],
        }
    }

    /// Full superset
    pub fn full() -> Self {
        Self {
            enabled: vec![
                Symbology::Ean13,
                Symbology::Ean8,
                Symbology::UpcA,
                Symbology::UpcE,
                Symbology::Code128,
                Symbology::Code39,
                Symbology::Codabar,
                Symbology::Itf,
                Symbology::QrCode,
                Symbology::DataMatrix,
                Symbology::Pdf417,
                Symbology::Aztec,
            ],
        }
    }

    pub fn custom(enabled: Vec<Symbology>) -> Self {
        Self { enabled }
    }

    pub fn contains(&self, symbology: Symbology) -> bool {
        self.enabled.contains(&symbology)
    }

    pub fn readers(&self) -> &[Symbology] {
        &self.enabled
    }
}

/// Normalize a raw decode event per the display-rule table
pub fn normalize(raw: &RawDetection, rules: &DisplayRules) -> DecodedResult {
    let display_value = match rules.rule_for(raw.symbology) {
        DisplayRule::KeepPrefix(n) => {
            if raw.payload.chars().count() >= n {
                raw.payload.chars().take(n).collect()
            } else {
                raw.payload.clone()
            }
        }
        DisplayRule::ClipEllipsis(n) => {
            if raw.payload.chars().count() > n {
                let clipped: String = raw.payload.chars().take(n).collect();
                format!("{clipped}…")
            } else {
                raw.payload.clone()
            }
        }
        DisplayRule::PassThrough => raw.payload.clone(),
    };

    DecodedResult {
        display_value,
        symbology_label: raw.symbology.label().to_string(),
    }
}
