//! Library fallback backend
//!
//! Adapts the pluggable decoding library's init/start/stop contract.
//! Detections arrive push-based through the library's subscription and
//! flow down the same pipeline as native results.

use super::{BackendHandle, BackendKind, EngineConfig, FallbackEngine};
use crate::detection::{run_push_loop, DetectionPipeline};
use crate::device::VideoSink;
use crate::error::Result;
use std::sync::Arc;
use tokio::sync::watch;

/// Adapter over a [`FallbackEngine`]
pub struct LibraryBackend {
    engine: Arc<dyn FallbackEngine>,
    config: EngineConfig,
}

impl LibraryBackend {
    pub fn new(engine: Arc<dyn FallbackEngine>, config: EngineConfig) -> Self {
        Self { engine, config }
    }

    /// Initialize and start the library, then spawn the drain loop
    ///
    /// The caller guards this with the chain's init timeout; a slow
    /// `init` is abandoned by dropping the future.
    pub async fn start(
        &self,
        sink: Arc<VideoSink>,
        pipeline: Arc<DetectionPipeline>,
    ) -> Result<BackendHandle> {
        self.engine.init(self.config.clone(), sink).await?;
        self.engine.start()?;

        let detections = self.engine.subscribe();
        let (stop_tx, stop_rx) = watch::channel(false);

        let engine = self.engine.clone();
        let task = tokio::spawn(async move {
            run_push_loop(detections, pipeline, stop_rx).await;
            engine.stop();
        });

        tracing::info!(
            readers = ?self.config.readers,
            locate = self.config.locate,
            "Library backend started"
        );

        Ok(BackendHandle::new(BackendKind::Library, stop_tx, task))
    }
}
