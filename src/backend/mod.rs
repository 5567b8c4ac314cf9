//! Decoding backends
//!
//! ## Responsibilities
//!
//! - Seams for the platform-native detector and the pluggable fallback
//!   decoding library
//! - The two-variant `BackendAdapter` the fallback chain starts and
//!   stops
//!
//! The orchestrator never branches on platform beyond the chain order;
//! backend variance stays behind this module.

pub mod library;
pub mod native;

pub use library::LibraryBackend;
pub use native::NativeBackend;

use crate::detection::DetectionPipeline;
use crate::device::{CaptureStream, Facing, VideoSink};
use crate::error::Result;
use crate::models::{RawDetection, Symbology};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

/// Platform-native symbol detection facility
#[async_trait]
pub trait NativeDetector: Send + Sync {
    /// Verify the facility is usable before the loop starts
    async fn warm_up(&self) -> Result<()> {
        Ok(())
    }

    /// One decode attempt against the current sink frame
    async fn detect(&self, stream: &dyn CaptureStream) -> Result<Vec<RawDetection>>;
}

/// Locator patch size tuning for the fallback library
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchSize {
    Small,
    Medium,
    Large,
}

/// Input-stream constraints handed to the fallback library
#[derive(Debug, Clone, PartialEq)]
pub struct StreamConstraints {
    pub width: u32,
    pub height: u32,
    pub facing: Facing,
}

/// Fallback library configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Enabled symbology readers
    pub readers: Vec<Symbology>,
    /// Whether the library should locate symbols before decoding
    pub locate: bool,
    pub patch_size: PatchSize,
    pub half_sample: bool,
    /// None lets the library pick its own stream settings
    pub constraints: Option<StreamConstraints>,
}

impl EngineConfig {
    /// Ultra-simple shape for iOS-like platforms: no locator, library
    /// defaults for the stream
    pub fn ios_simple(readers: Vec<Symbology>) -> Self {
        Self {
            readers,
            locate: false,
            patch_size: PatchSize::Medium,
            half_sample: false,
            constraints: None,
        }
    }

    /// Standard shape with explicit stream constraints and locator
    /// tuning
    pub fn standard(readers: Vec<Symbology>, width: u32, height: u32) -> Self {
        Self {
            readers,
            locate: true,
            patch_size: PatchSize::Medium,
            half_sample: true,
            constraints: Some(StreamConstraints {
                width,
                height,
                facing: Facing::Environment,
            }),
        }
    }
}

/// Pluggable fallback decoding library
///
/// Push-based: once started, the library's internal loop decodes and
/// publishes detections to subscribers.
#[async_trait]
pub trait FallbackEngine: Send + Sync {
    async fn init(&self, config: EngineConfig, sink: Arc<VideoSink>) -> Result<()>;
    fn start(&self) -> Result<()>;
    fn stop(&self);
    fn subscribe(&self) -> broadcast::Receiver<RawDetection>;
}

/// Which backend variant a handle belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Native,
    Library,
}

/// Handle to a running backend's detection task
#[derive(Debug)]
pub struct BackendHandle {
    kind: BackendKind,
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl BackendHandle {
    pub(crate) fn new(kind: BackendKind, stop_tx: watch::Sender<bool>, task: JoinHandle<()>) -> Self {
        Self {
            kind,
            stop_tx,
            task,
        }
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    /// Signal the detection task and wait for it to drain
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        let _ = self.task.await;
    }
}

/// Two-variant decoding backend behind one start/stop contract
pub enum BackendAdapter {
    Native(NativeBackend),
    Library(LibraryBackend),
}

impl BackendAdapter {
    /// Start the backend's detection flow into the pipeline
    pub async fn start(
        &self,
        sink: Arc<VideoSink>,
        pipeline: Arc<DetectionPipeline>,
    ) -> Result<BackendHandle> {
        match self {
            BackendAdapter::Native(backend) => backend.start(sink, pipeline).await,
            BackendAdapter::Library(backend) => backend.start(sink, pipeline).await,
        }
    }
}
