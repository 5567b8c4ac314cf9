//! Native backend
//!
//! Wraps the platform-native detector in a timed polling loop.

use super::{BackendHandle, BackendKind, NativeDetector};
use crate::detection::{run_native_loop, DetectionPipeline};
use crate::device::VideoSink;
use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Polling adapter over a [`NativeDetector`]
pub struct NativeBackend {
    detector: Arc<dyn NativeDetector>,
    poll_interval: Duration,
}

impl NativeBackend {
    pub fn new(detector: Arc<dyn NativeDetector>, poll_interval: Duration) -> Self {
        Self {
            detector,
            poll_interval,
        }
    }

    /// Spawn the polling loop against the sink
    pub async fn start(
        &self,
        sink: Arc<VideoSink>,
        pipeline: Arc<DetectionPipeline>,
    ) -> Result<BackendHandle> {
        self.detector.warm_up().await?;

        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(run_native_loop(
            self.detector.clone(),
            sink,
            pipeline,
            self.poll_interval,
            stop_rx,
        ));

        tracing::info!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Native backend started"
        );

        Ok(BackendHandle::new(BackendKind::Native, stop_tx, task))
    }
}
