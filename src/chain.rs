//! Fallback chain
//!
//! ## Responsibilities
//!
//! - Sequence backend attempts: native → library fallback → manual mode
//! - Guard each initialization with a per-platform timeout budget
//! - Decide the terminal state when everything fails
//!
//! The chain is one-shot and monotonic: it never re-enters a probing
//! state, and a terminal state holds until a fresh user-initiated start
//! builds a fresh chain. Manual mode is a legitimate steady state
//! (camera visible, no automatic decode), not a failure.

use crate::backend::{
    BackendAdapter, BackendHandle, EngineConfig, FallbackEngine, LibraryBackend, NativeBackend,
    NativeDetector,
};
use crate::capability::{CapabilitySnapshot, PlatformHint};
use crate::config::AppConfig;
use crate::detection::DetectionPipeline;
use crate::device::{AcquisitionRequest, CaptureHost, DeviceController, VideoSink};
use crate::display::{StatusMessage, StatusSurface};
use crate::error::{Error, Result};
use std::sync::{Arc, Mutex};
use tokio::time::timeout;
use tracing::{info, warn};

/// Chain states; the last four are terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    ProbingNative,
    RunningNative,
    ProbingFallback,
    RunningFallback,
    ManualMode,
    Failed,
}

/// Resolved backend for the session
#[derive(Debug)]
pub enum ActiveBackend {
    Native(BackendHandle),
    Library(BackendHandle),
    /// Camera attached, no automatic decode
    Manual,
}

impl ActiveBackend {
    pub fn kind(&self) -> ActiveBackendKind {
        match self {
            ActiveBackend::Native(_) => ActiveBackendKind::Native,
            ActiveBackend::Library(_) => ActiveBackendKind::Library,
            ActiveBackend::Manual => ActiveBackendKind::Manual,
        }
    }

    /// Stop the running detection task, if any
    pub async fn stop(self) {
        match self {
            ActiveBackend::Native(handle) | ActiveBackend::Library(handle) => handle.stop().await,
            ActiveBackend::Manual => {}
        }
    }
}

/// Backend kind without the handle, for session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveBackendKind {
    Native,
    Library,
    Manual,
}

/// Sequences backend attempts for one session start
pub struct FallbackChain {
    capability: CapabilitySnapshot,
    host: Arc<dyn CaptureHost>,
    controller: Arc<DeviceController>,
    sink: Arc<VideoSink>,
    native: Option<Arc<dyn NativeDetector>>,
    engine: Option<Arc<dyn FallbackEngine>>,
    surface: Arc<dyn StatusSurface>,
    config: AppConfig,
    transitions: Mutex<Vec<ChainState>>,
}

impl FallbackChain {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        capability: CapabilitySnapshot,
        host: Arc<dyn CaptureHost>,
        controller: Arc<DeviceController>,
        sink: Arc<VideoSink>,
        native: Option<Arc<dyn NativeDetector>>,
        engine: Option<Arc<dyn FallbackEngine>>,
        surface: Arc<dyn StatusSurface>,
        config: AppConfig,
    ) -> Self {
        Self {
            capability,
            host,
            controller,
            sink,
            native,
            engine,
            surface,
            config,
            transitions: Mutex::new(Vec::new()),
        }
    }

    /// State sequence observed so far
    pub fn transitions(&self) -> Vec<ChainState> {
        self.transitions.lock().expect("transitions lock").clone()
    }

    fn enter(&self, state: ChainState) {
        info!(state = ?state, "Chain transition");
        self.transitions.lock().expect("transitions lock").push(state);
    }

    /// Resolve a backend for this session
    ///
    /// One-shot: terminal states are final for this chain instance.
    pub async fn run(&self, pipeline: Arc<DetectionPipeline>) -> Result<ActiveBackend> {
        self.enter(ChainState::ProbingNative);

        match &self.native {
            Some(detector) if self.capability.has_native_detector => {
                let budget = self.config.native_init_timeout;
                match timeout(budget, self.start_native(detector.clone(), pipeline.clone())).await
                {
                    Ok(Ok(handle)) => {
                        self.enter(ChainState::RunningNative);
                        return Ok(ActiveBackend::Native(handle));
                    }
                    Ok(Err(e @ Error::DeviceAcquisition(_))) => {
                        // No camera access is fatal; no further tiers
                        self.enter(ChainState::Failed);
                        self.surface.show(StatusMessage::Info(
                            "Could not access the camera. Check permissions.".to_string(),
                        ));
                        return Err(e);
                    }
                    Ok(Err(e)) => {
                        warn!(error = %e, "Native backend init failed, falling back");
                    }
                    Err(_) => {
                        warn!("Native backend init timed out, falling back");
                    }
                }
            }
            _ => {
                // Capability unavailable is not an error, just the
                // trigger for the fallback tier
                info!("No native detector, proceeding to fallback");
            }
        }

        self.enter(ChainState::ProbingFallback);
        self.surface.show(StatusMessage::Info(
            "Native detection unavailable, loading fallback...".to_string(),
        ));

        let ios_like = self.capability.platform_hint == PlatformHint::IosLike;
        let fallback_error = match &self.engine {
            Some(engine) => {
                let budget = self.config.fallback_init_timeout(ios_like);
                match timeout(budget, self.start_library(engine.clone(), pipeline)).await {
                    Ok(Ok(handle)) => {
                        self.enter(ChainState::RunningFallback);
                        return Ok(ActiveBackend::Library(handle));
                    }
                    Ok(Err(e @ Error::DeviceAcquisition(_))) => {
                        self.enter(ChainState::Failed);
                        self.surface.show(StatusMessage::Info(
                            "Could not access the camera. Check permissions.".to_string(),
                        ));
                        return Err(e);
                    }
                    Ok(Err(e)) => e,
                    Err(_) => Error::BackendInitTimeout {
                        backend: "fallback library",
                    },
                }
            }
            None => Error::BackendInit("no fallback library configured".to_string()),
        };

        warn!(error = %fallback_error, ios_like = ios_like, "Fallback backend unavailable");

        if ios_like {
            // Keep the camera visible; torch stays negotiable, zoom is
            // not offered
            match self.start_manual().await {
                Ok(()) => {
                    self.enter(ChainState::ManualMode);
                    self.surface.show(StatusMessage::ManualMode);
                    Ok(ActiveBackend::Manual)
                }
                Err(e) => {
                    self.enter(ChainState::Failed);
                    self.surface.show(StatusMessage::Info(
                        "Could not access the camera. Check permissions.".to_string(),
                    ));
                    Err(e)
                }
            }
        } else {
            self.enter(ChainState::Failed);
            self.surface.show(StatusMessage::Info(
                "Scanner initialization failed. Try starting again.".to_string(),
            ));
            Err(fallback_error)
        }
    }

    fn base_request(&self) -> AcquisitionRequest {
        AcquisitionRequest::environment(self.config.width_hint, self.config.height_hint)
    }

    async fn start_native(
        &self,
        detector: Arc<dyn NativeDetector>,
        pipeline: Arc<DetectionPipeline>,
    ) -> Result<BackendHandle> {
        let stream = self.host.acquire(&self.base_request()).await?;
        self.controller.attach(stream).await;

        let adapter = BackendAdapter::Native(NativeBackend::new(
            detector,
            self.config.effective_poll_interval(),
        ));
        adapter.start(self.sink.clone(), pipeline).await
    }

    async fn start_library(
        &self,
        engine: Arc<dyn FallbackEngine>,
        pipeline: Arc<DetectionPipeline>,
    ) -> Result<BackendHandle> {
        let stream = self.host.acquire(&self.base_request()).await?;
        self.controller.attach(stream).await;

        let readers = self.config.symbologies.readers().to_vec();
        let engine_config = if self.capability.platform_hint == PlatformHint::IosLike {
            EngineConfig::ios_simple(readers)
        } else {
            EngineConfig::standard(readers, self.config.width_hint, self.config.height_hint)
        };

        let adapter = BackendAdapter::Library(LibraryBackend::new(engine, engine_config));
        adapter.start(self.sink.clone(), pipeline).await
    }

    async fn start_manual(&self) -> Result<()> {
        // The failed fallback tier may have left its stream attached;
        // keep it instead of re-prompting for camera access
        if self.sink.current().await.is_some() {
            return Ok(());
        }
        let stream = self.host.acquire(&self.base_request()).await?;
        self.controller.attach(stream).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{DebouncePolicy, DetectionPipeline};
    use crate::device::{TrackCapabilities, ZoomRange};
    use crate::models::EventContext;
    use crate::normalize::{DisplayRules, SymbologySet};
    use crate::sim::{CollectingSurface, InMemoryRegistry, ScriptedDetector, SimEngine, SimHost};
    use std::time::Duration;

    struct Rig {
        host: Arc<SimHost>,
        surface: Arc<CollectingSurface>,
        sink: Arc<VideoSink>,
        controller: Arc<DeviceController>,
        pipeline: Arc<DetectionPipeline>,
        config: AppConfig,
    }

    fn rig() -> Rig {
        let host = Arc::new(SimHost::new(TrackCapabilities {
            illumination_supported: true,
            zoom: Some(ZoomRange { min: 1.0, max: 3.0 }),
        }));
        let surface = Arc::new(CollectingSurface::new());
        let sink = Arc::new(VideoSink::new());
        let config = AppConfig {
            registry_url: "http://localhost:8080".to_string(),
            ..AppConfig::default()
        };
        let controller = Arc::new(DeviceController::new(
            host.clone(),
            sink.clone(),
            AcquisitionRequest::environment(config.width_hint, config.height_hint),
            config.zoom_step,
        ));
        let pipeline = Arc::new(DetectionPipeline::new(
            DisplayRules::default(),
            SymbologySet::ean13_only(),
            DebouncePolicy::EmitEveryTick,
            Arc::new(InMemoryRegistry::new()),
            surface.clone(),
            EventContext::new("Conf2024", "2024-05-01"),
        ));
        Rig {
            host,
            surface,
            sink,
            controller,
            pipeline,
            config,
        }
    }

    fn snapshot(has_native: bool, hint: PlatformHint) -> CapabilitySnapshot {
        CapabilitySnapshot {
            has_native_detector: has_native,
            platform_hint: hint,
        }
    }

    fn chain_with(
        rig: &Rig,
        capability: CapabilitySnapshot,
        native: Option<Arc<dyn NativeDetector>>,
        engine: Option<Arc<dyn FallbackEngine>>,
    ) -> FallbackChain {
        FallbackChain::new(
            capability,
            rig.host.clone(),
            rig.controller.clone(),
            rig.sink.clone(),
            native,
            engine,
            rig.surface.clone(),
            rig.config.clone(),
        )
    }

    #[tokio::test]
    async fn test_native_success_runs_native() {
        let rig = rig();
        let detector: Arc<dyn NativeDetector> = Arc::new(ScriptedDetector::new(vec![]));
        let chain = chain_with(
            &rig,
            snapshot(true, PlatformHint::Other),
            Some(detector),
            None,
        );

        let backend = chain.run(rig.pipeline.clone()).await.unwrap();
        assert_eq!(backend.kind(), ActiveBackendKind::Native);
        assert_eq!(
            chain.transitions(),
            vec![ChainState::ProbingNative, ChainState::RunningNative]
        );
        backend.stop().await;
    }

    #[tokio::test]
    async fn test_missing_native_falls_back_to_library() {
        let rig = rig();
        let engine: Arc<dyn FallbackEngine> = Arc::new(SimEngine::new());
        let chain = chain_with(&rig, snapshot(false, PlatformHint::Other), None, Some(engine));

        let backend = chain.run(rig.pipeline.clone()).await.unwrap();
        assert_eq!(backend.kind(), ActiveBackendKind::Library);
        assert_eq!(
            chain.transitions(),
            vec![
                ChainState::ProbingNative,
                ChainState::ProbingFallback,
                ChainState::RunningFallback
            ]
        );
        backend.stop().await;
    }

    #[tokio::test]
    async fn test_fallback_failure_on_other_platform_is_error() {
        let rig = rig();
        let engine: Arc<dyn FallbackEngine> = Arc::new(SimEngine::new().fail_init());
        let chain = chain_with(&rig, snapshot(false, PlatformHint::Other), None, Some(engine));

        let err = chain.run(rig.pipeline.clone()).await.unwrap_err();
        assert!(matches!(err, Error::BackendInit(_)));
        assert_eq!(
            chain.transitions(),
            vec![
                ChainState::ProbingNative,
                ChainState::ProbingFallback,
                ChainState::Failed
            ]
        );
    }

    #[tokio::test]
    async fn test_fallback_failure_on_ios_degrades_to_manual_mode() {
        let rig = rig();
        let engine: Arc<dyn FallbackEngine> = Arc::new(SimEngine::new().fail_init());
        let chain = chain_with(
            &rig,
            snapshot(false, PlatformHint::IosLike),
            None,
            Some(engine),
        );

        let backend = chain.run(rig.pipeline.clone()).await.unwrap();
        assert_eq!(backend.kind(), ActiveBackendKind::Manual);
        assert_eq!(
            chain.transitions(),
            vec![
                ChainState::ProbingNative,
                ChainState::ProbingFallback,
                ChainState::ManualMode
            ]
        );
        // Camera stays attached in manual mode, reusing the fallback
        // tier's stream rather than acquiring a second one
        assert!(rig.sink.current().await.is_some());
        assert_eq!(rig.host.acquisition_count(), 1);
        assert!(rig
            .surface
            .messages()
            .contains(&StatusMessage::ManualMode));
    }

    #[tokio::test]
    async fn test_manual_mode_acquisition_failure_is_fatal() {
        let rig = rig();
        let host = Arc::new(SimHost::new(TrackCapabilities::default()).fail_acquire());
        let chain = FallbackChain::new(
            snapshot(false, PlatformHint::IosLike),
            host,
            rig.controller.clone(),
            rig.sink.clone(),
            None,
            None,
            rig.surface.clone(),
            rig.config.clone(),
        );

        let err = chain.run(rig.pipeline.clone()).await.unwrap_err();
        assert!(matches!(err, Error::DeviceAcquisition(_)));
        assert_eq!(chain.transitions().last(), Some(&ChainState::Failed));
        assert!(rig
            .surface
            .messages()
            .iter()
            .any(|m| matches!(m, StatusMessage::Info(text) if text.contains("camera"))));
    }

    #[test]
    fn test_active_backend_is_debug_renderable() {
        assert_eq!(format!("{:?}", ActiveBackend::Manual), "Manual");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_init_timeout_triggers_manual_on_ios() {
        let rig = rig();
        let engine: Arc<dyn FallbackEngine> =
            Arc::new(SimEngine::new().init_delay(Duration::from_secs(60)));
        let chain = chain_with(
            &rig,
            snapshot(false, PlatformHint::IosLike),
            None,
            Some(engine),
        );

        let backend = chain.run(rig.pipeline.clone()).await.unwrap();
        assert_eq!(backend.kind(), ActiveBackendKind::Manual);
    }

    #[tokio::test]
    async fn test_chain_never_reenters_probing_native() {
        let rig = rig();
        let detector: Arc<dyn NativeDetector> =
            Arc::new(ScriptedDetector::new(vec![]).fail_start());
        let engine: Arc<dyn FallbackEngine> = Arc::new(SimEngine::new().fail_init());
        let chain = chain_with(
            &rig,
            snapshot(true, PlatformHint::Other),
            Some(detector),
            Some(engine),
        );

        let _ = chain.run(rig.pipeline.clone()).await;
        let transitions = chain.transitions();
        let probes = transitions
            .iter()
            .filter(|s| **s == ChainState::ProbingNative)
            .count();
        assert_eq!(probes, 1);
    }

    #[tokio::test]
    async fn test_acquisition_failure_is_fatal_without_fallback() {
        let rig = rig();
        let host = Arc::new(
            SimHost::new(TrackCapabilities::default()).fail_acquire(),
        );
        let engine = Arc::new(SimEngine::new());
        let detector: Arc<dyn NativeDetector> = Arc::new(ScriptedDetector::new(vec![]));
        let chain = FallbackChain::new(
            snapshot(true, PlatformHint::Other),
            host,
            rig.controller.clone(),
            rig.sink.clone(),
            Some(detector),
            Some(engine.clone() as Arc<dyn FallbackEngine>),
            rig.surface.clone(),
            rig.config.clone(),
        );

        let err = chain.run(rig.pipeline.clone()).await.unwrap_err();
        assert!(matches!(err, Error::DeviceAcquisition(_)));
        assert!(chain.transitions().contains(&ChainState::Failed));
        // The fallback tier never ran
        assert_eq!(engine.init_calls(), 0);
    }
}
