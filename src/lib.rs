//! Scanpost Acquisition Library
//!
//! Camera-based symbol acquisition with registry submission
//!
//! ## Architecture (10 Components)
//!
//! 1. Capability - Platform probe (native detector, iOS-like hint)
//! 2. Device - Capture host seam, video sink, feature controller
//! 3. Backend - Native detector and fallback library adapters
//! 4. Chain - One-shot native -> library -> manual resolution
//! 5. Detection - Shared decode pipeline (normalize, debounce, submit)
//! 6. Normalize - Symbology-keyed display rules
//! 7. Submission - Registry HTTP client and outcome taxonomy
//! 8. Registrar - Event pre-flight registration gate
//! 9. Orchestrator - Session lifecycle (start/stop)
//! 10. Sim - Deterministic stand-ins for every hardware/network seam
//!
//! ## Design Principles
//!
//! - Backend variance stays behind the chain; callers never branch on
//!   platform
//! - Every seam is a trait so the whole flow runs without a camera

pub mod backend;
pub mod capability;
pub mod chain;
pub mod config;
pub mod detection;
pub mod device;
pub mod display;
pub mod error;
pub mod models;
pub mod normalize;
pub mod orchestrator;
pub mod registrar;
pub mod session;
pub mod sim;
pub mod submission;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use orchestrator::Orchestrator;
