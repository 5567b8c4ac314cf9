//! Device controller
//!
//! ## Responsibilities
//!
//! - Exclusive ownership of the capture stream via the video sink
//! - Feature set derivation from the currently attached stream
//! - Illumination negotiation (three-tier fallback)
//! - Zoom clamping and stepping
//!
//! Feature adjustments interleave freely with the detection loop; they
//! never stop or restart it.

use super::{
    AcquisitionRequest, CaptureHost, CaptureStream, TrackConstraint, VideoSink, ZoomRange,
};
use crate::error::{Error, Result};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Zoom state derived from the active track
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomState {
    pub min: f64,
    pub max: f64,
    pub current: f64,
}

/// Feature subset exposed by the active capture stream
///
/// Always derived from the currently attached stream; recomputed on
/// every stream replacement.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DeviceFeatureSet {
    pub illumination_supported: bool,
    pub zoom: Option<ZoomState>,
}

/// Zoom step direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

/// Illumination fallback tiers, tried strictly in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IlluminationTier {
    /// Direct constraint on the active track
    Direct,
    /// Same constraint wrapped as an advanced entry
    Advanced,
    /// Tear down and re-acquire with the flag baked into acquisition
    Reacquire,
}

const ILLUMINATION_TIERS: [IlluminationTier; 3] = [
    IlluminationTier::Direct,
    IlluminationTier::Advanced,
    IlluminationTier::Reacquire,
];

/// Owns the capture stream and the device-feature subset it exposes
pub struct DeviceController {
    host: Arc<dyn CaptureHost>,
    sink: Arc<VideoSink>,
    base_request: AcquisitionRequest,
    zoom_step: f64,
    features: RwLock<DeviceFeatureSet>,
    illumination_on: RwLock<bool>,
}

impl DeviceController {
    pub fn new(
        host: Arc<dyn CaptureHost>,
        sink: Arc<VideoSink>,
        base_request: AcquisitionRequest,
        zoom_step: f64,
    ) -> Self {
        Self {
            host,
            sink,
            base_request,
            zoom_step,
            features: RwLock::new(DeviceFeatureSet::default()),
            illumination_on: RwLock::new(false),
        }
    }

    /// Attach a stream to the sink and derive its feature set
    ///
    /// The sink reference is swapped before the previous stream's
    /// tracks are released.
    pub async fn attach(&self, stream: Arc<dyn CaptureStream>) -> DeviceFeatureSet {
        let capabilities = stream.capabilities();
        let features = DeviceFeatureSet {
            illumination_supported: capabilities.illumination_supported,
            zoom: capabilities.zoom.map(|ZoomRange { min, max }| ZoomState {
                min,
                max,
                current: min,
            }),
        };

        let previous = self.sink.replace(stream).await;
        if let Some(old) = previous {
            old.release().await;
        }

        *self.features.write().await = features;

        tracing::info!(
            illumination_supported = features.illumination_supported,
            zoom = ?features.zoom,
            "Capture stream attached"
        );

        features
    }

    /// Detach and release the current stream
    pub async fn detach(&self) {
        if let Some(stream) = self.sink.take().await {
            stream.release().await;
        }
        *self.features.write().await = DeviceFeatureSet::default();
        *self.illumination_on.write().await = false;
    }

    /// Current feature set
    pub async fn features(&self) -> DeviceFeatureSet {
        *self.features.read().await
    }

    /// Current illumination state
    pub async fn illumination_on(&self) -> bool {
        *self.illumination_on.read().await
    }

    /// Toggle the device light source
    ///
    /// Tries the tiers strictly in order and stops at the first
    /// success. All-tier failure is recoverable: the previous
    /// illumination state stays recorded and the caller reverts its
    /// toggle.
    pub async fn set_illumination(&self, on: bool) -> Result<()> {
        let mut last_error: Option<Error> = None;

        for tier in ILLUMINATION_TIERS {
            match self.apply_illumination_tier(tier, on).await {
                Ok(()) => {
                    *self.illumination_on.write().await = on;
                    tracing::info!(on = on, tier = ?tier, "Illumination applied");
                    return Ok(());
                }
                Err(e) => {
                    tracing::debug!(tier = ?tier, error = %e, "Illumination tier rejected");
                    last_error = Some(e);
                }
            }
        }

        Err(Error::FeatureNegotiation(format!(
            "all illumination tiers rejected: {}",
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    async fn apply_illumination_tier(&self, tier: IlluminationTier, on: bool) -> Result<()> {
        match tier {
            IlluminationTier::Direct => {
                let stream = self.active_stream().await?;
                stream.apply(TrackConstraint::Illumination { on }).await
            }
            IlluminationTier::Advanced => {
                let stream = self.active_stream().await?;
                stream
                    .apply(TrackConstraint::AdvancedIllumination { on })
                    .await
            }
            IlluminationTier::Reacquire => {
                let request = self.base_request.clone().with_illumination(on);
                let stream = self.host.acquire(&request).await?;
                self.attach(stream).await;
                Ok(())
            }
        }
    }

    /// Apply an absolute zoom level, clamped to the track's range
    ///
    /// Returns the applied value. On failure the previous zoom stays in
    /// effect; there is no partial state.
    pub async fn set_zoom(&self, level: f64) -> Result<f64> {
        let zoom = self
            .features
            .read()
            .await
            .zoom
            .ok_or_else(|| Error::FeatureNegotiation("zoom not supported".to_string()))?;

        let clamped = level.clamp(zoom.min, zoom.max);
        let stream = self.active_stream().await?;

        stream
            .apply(TrackConstraint::AdvancedZoom { level: clamped })
            .await
            .map_err(|e| Error::FeatureNegotiation(format!("zoom apply rejected: {e}")))?;

        if let Some(state) = self.features.write().await.zoom.as_mut() {
            state.current = clamped;
        }

        tracing::debug!(level = clamped, "Zoom applied");
        Ok(clamped)
    }

    /// Step zoom by the configured increment and delegate to `set_zoom`
    pub async fn step_zoom(&self, direction: ZoomDirection) -> Result<f64> {
        let zoom = self
            .features
            .read()
            .await
            .zoom
            .ok_or_else(|| Error::FeatureNegotiation("zoom not supported".to_string()))?;

        let target = match direction {
            ZoomDirection::In => zoom.current + self.zoom_step,
            ZoomDirection::Out => zoom.current - self.zoom_step,
        };

        self.set_zoom(target).await
    }

    async fn active_stream(&self) -> Result<Arc<dyn CaptureStream>> {
        self.sink
            .current()
            .await
            .ok_or_else(|| Error::FeatureNegotiation("no active capture stream".to_string()))
    }
}
