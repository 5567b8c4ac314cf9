//! Capture device abstraction
//!
//! ## Responsibilities
//!
//! - Host-platform seam for acquiring capture streams
//! - Track capability descriptors (illumination, zoom range)
//! - Video sink ownership with atomic stream replacement
//!
//! The controller that negotiates illumination and zoom lives in
//! [`controller`].

pub mod controller;

pub use controller::{DeviceController, DeviceFeatureSet, ZoomDirection, ZoomState};

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Capture acquisition request sent to the host platform
#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionRequest {
    pub facing: Facing,
    pub width_hint: u32,
    pub height_hint: u32,
    /// Tier-3 illumination fallback bakes the flag into acquisition
    pub illumination: Option<bool>,
}

impl AcquisitionRequest {
    pub fn environment(width_hint: u32, height_hint: u32) -> Self {
        Self {
            facing: Facing::Environment,
            width_hint,
            height_hint,
            illumination: None,
        }
    }

    pub fn with_illumination(mut self, on: bool) -> Self {
        self.illumination = Some(on);
        self
    }
}

/// Camera facing direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    Environment,
    User,
}

/// Optical zoom range reported by a track
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomRange {
    pub min: f64,
    pub max: f64,
}

/// Capability descriptor of the active track
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrackCapabilities {
    pub illumination_supported: bool,
    pub zoom: Option<ZoomRange>,
}

/// Constraint applied to the active track
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackConstraint {
    /// Direct illumination constraint (tier 1)
    Illumination { on: bool },
    /// Same constraint wrapped as an "advanced" entry (tier 2)
    AdvancedIllumination { on: bool },
    /// Zoom is only ever applied as an advanced constraint
    AdvancedZoom { level: f64 },
}

/// A live capture stream owned by the device controller
#[async_trait]
pub trait CaptureStream: Send + Sync {
    /// Capability descriptor of the stream's video track
    fn capabilities(&self) -> TrackCapabilities;

    /// Apply a track constraint; heterogeneous devices reject shapes
    /// they do not understand
    async fn apply(&self, constraint: TrackConstraint) -> Result<()>;

    /// Whether the sink has enough data for a decode attempt
    fn ready(&self) -> bool;

    /// Release the underlying tracks
    async fn release(&self);
}

/// Host platform capable of acquiring capture streams
#[async_trait]
pub trait CaptureHost: Send + Sync {
    async fn acquire(&self, request: &AcquisitionRequest) -> Result<Arc<dyn CaptureStream>>;
}

/// Holds the stream currently feeding the video surface
///
/// At most one stream is attached at a time. Replacement swaps the
/// reference before the old stream's tracks are released, so a decode
/// tick never observes a sink with no source.
#[derive(Default)]
pub struct VideoSink {
    stream: RwLock<Option<Arc<dyn CaptureStream>>>,
}

impl VideoSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently attached stream, if any
    pub async fn current(&self) -> Option<Arc<dyn CaptureStream>> {
        self.stream.read().await.clone()
    }

    /// Swap in a new stream and return the previous one unreleased;
    /// the caller releases it after the swap
    pub async fn replace(&self, stream: Arc<dyn CaptureStream>) -> Option<Arc<dyn CaptureStream>> {
        let mut guard = self.stream.write().await;
        guard.replace(stream)
    }

    /// Detach and return the current stream without a replacement
    pub async fn take(&self) -> Option<Arc<dyn CaptureStream>> {
        self.stream.write().await.take()
    }
}
