//! Acquisition orchestrator
//!
//! ## Responsibilities
//!
//! - Drive the control flow: registration gate → capability probe →
//!   fallback chain → detection loop
//! - Own the session state and the active backend handle
//!
//! `start` is the single user-initiated entry point; a second call
//! while a session is live is a no-op, and a call after `stop` builds a
//! fresh chain from the top.

use crate::backend::{FallbackEngine, NativeDetector};
use crate::capability::CapabilitySnapshot;
use crate::chain::{ActiveBackend, FallbackChain};
use crate::config::AppConfig;
use crate::detection::DetectionPipeline;
use crate::device::{AcquisitionRequest, CaptureHost, DeviceController, VideoSink};
use crate::display::{StatusMessage, StatusSurface};
use crate::error::Result;
use crate::normalize::DisplayRules;
use crate::registrar::EventRegistrar;
use crate::session::ScanSession;
use crate::submission::RegistryClient;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

/// Owns the session and wires the pipeline together
pub struct Orchestrator {
    config: AppConfig,
    rules: DisplayRules,
    host: Arc<dyn CaptureHost>,
    native: Option<Arc<dyn NativeDetector>>,
    engine: Option<Arc<dyn FallbackEngine>>,
    registry: Arc<dyn RegistryClient>,
    surface: Arc<dyn StatusSurface>,
    user_agent: String,
    sink: Arc<VideoSink>,
    controller: Arc<DeviceController>,
    session: RwLock<ScanSession>,
    active: Mutex<Option<ActiveBackend>>,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: AppConfig,
        host: Arc<dyn CaptureHost>,
        native: Option<Arc<dyn NativeDetector>>,
        engine: Option<Arc<dyn FallbackEngine>>,
        registry: Arc<dyn RegistryClient>,
        surface: Arc<dyn StatusSurface>,
        user_agent: impl Into<String>,
    ) -> Self {
        let sink = Arc::new(VideoSink::new());
        let controller = Arc::new(DeviceController::new(
            host.clone(),
            sink.clone(),
            AcquisitionRequest::environment(config.width_hint, config.height_hint),
            config.zoom_step,
        ));

        Self {
            config,
            rules: DisplayRules::default(),
            host,
            native,
            engine,
            registry,
            surface,
            user_agent: user_agent.into(),
            sink,
            controller,
            session: RwLock::new(ScanSession::default()),
            active: Mutex::new(None),
        }
    }

    /// Override the default display-rule table
    pub fn with_display_rules(mut self, rules: DisplayRules) -> Self {
        self.rules = rules;
        self
    }

    /// Device feature negotiation entry point (torch, zoom)
    pub fn controller(&self) -> Arc<DeviceController> {
        self.controller.clone()
    }

    /// Current session snapshot
    pub async fn session(&self) -> ScanSession {
        self.session.read().await.clone()
    }

    /// Start a scanning session
    ///
    /// Registration failure means the pipeline never starts: no
    /// capability probe, no camera acquisition.
    pub async fn start(&self, label: &str, date: &str) -> Result<()> {
        if self.session.read().await.started {
            info!("Session already started, ignoring");
            return Ok(());
        }

        let registrar = EventRegistrar::new(self.registry.clone());
        let context = registrar.register(label, date).await.map_err(|e| {
            warn!(error = %e, "Event registration gate rejected");
            e
        })?;

        let capability = CapabilitySnapshot::probe(self.native.is_some(), &self.user_agent);

        self.surface.show(StatusMessage::Info(format!(
            "Event: {} • Date: {} — starting camera...",
            context.label(),
            context.date()
        )));

        let pipeline = Arc::new(DetectionPipeline::new(
            self.rules.clone(),
            self.config.symbologies.clone(),
            self.config.debounce,
            self.registry.clone(),
            self.surface.clone(),
            context.clone(),
        ));

        let chain = FallbackChain::new(
            capability,
            self.host.clone(),
            self.controller.clone(),
            self.sink.clone(),
            self.native.clone(),
            self.engine.clone(),
            self.surface.clone(),
            self.config.clone(),
        );

        let outcome = chain.run(pipeline).await;
        let transitions = chain.transitions();

        match outcome {
            Ok(backend) => {
                let kind = backend.kind();
                *self.active.lock().await = Some(backend);

                let mut session = self.session.write().await;
                session.started = true;
                session.context = Some(context);
                session.backend = Some(kind);
                session.capability = Some(capability);
                session.chain_transitions = transitions;
                session.started_at = Some(Utc::now());

                info!(backend = ?kind, "Session started");
                Ok(())
            }
            Err(e) => {
                let mut session = self.session.write().await;
                session.chain_transitions = transitions;
                Err(e)
            }
        }
    }

    /// Stop the session: drain the loop, release the stream, clear
    /// state
    pub async fn stop(&self) {
        if let Some(backend) = self.active.lock().await.take() {
            backend.stop().await;
        }
        self.controller.detach().await;
        self.session.write().await.clear();
        self.surface
            .show(StatusMessage::Info("Scanning stopped".to_string()));
        info!("Session stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ActiveBackendKind;
    use crate::device::{TrackCapabilities, ZoomRange};
    use crate::error::Error;
    use crate::sim::{CollectingSurface, InMemoryRegistry, ScriptedDetector, SimHost};

    fn orchestrator_with(
        host: Arc<SimHost>,
        registry: Arc<InMemoryRegistry>,
    ) -> Orchestrator {
        let detector: Arc<dyn crate::backend::NativeDetector> =
            Arc::new(ScriptedDetector::new(vec![]));
        Orchestrator::new(
            AppConfig::default(),
            host,
            Some(detector),
            None,
            registry,
            Arc::new(CollectingSurface::new()),
            "Mozilla/5.0 (X11; Linux x86_64)",
        )
    }

    fn sim_host() -> Arc<SimHost> {
        Arc::new(SimHost::new(TrackCapabilities {
            illumination_supported: true,
            zoom: Some(ZoomRange { min: 1.0, max: 3.0 }),
        }))
    }

    #[tokio::test]
    async fn test_start_resolves_native_and_is_idempotent() {
        let host = sim_host();
        let registry = Arc::new(InMemoryRegistry::new());
        let orchestrator = orchestrator_with(host.clone(), registry);

        orchestrator.start("Conf2024", "2024-05-01").await.unwrap();
        let session = orchestrator.session().await;
        assert!(session.started);
        assert_eq!(session.backend, Some(ActiveBackendKind::Native));
        assert_eq!(session.context.unwrap().label(), "Conf2024");

        // Second start is a no-op: no new acquisition
        let acquisitions = host.acquisition_count();
        orchestrator.start("Conf2024", "2024-05-01").await.unwrap();
        assert_eq!(host.acquisition_count(), acquisitions);

        orchestrator.stop().await;
    }

    #[tokio::test]
    async fn test_gate_failure_skips_probe_and_camera() {
        let host = sim_host();
        let registry = Arc::new(InMemoryRegistry::new());
        registry.fail_next_registration_with_validation("date", "required");
        let orchestrator = orchestrator_with(host.clone(), registry);

        let err = orchestrator.start("Conf2024", "bad").await.unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));

        let session = orchestrator.session().await;
        assert!(!session.started);
        assert!(session.capability.is_none());
        assert_eq!(host.acquisition_count(), 0);
    }

    #[tokio::test]
    async fn test_stop_releases_stream_and_allows_restart() {
        let host = sim_host();
        let registry = Arc::new(InMemoryRegistry::new());
        let orchestrator = orchestrator_with(host.clone(), registry);

        orchestrator.start("Conf2024", "2024-05-01").await.unwrap();
        orchestrator.stop().await;

        let session = orchestrator.session().await;
        assert!(!session.started);
        assert!(session.context.is_none());

        // A fresh start runs the whole chain again
        orchestrator.start("Conf2024", "2024-05-02").await.unwrap();
        assert!(orchestrator.session().await.started);
        orchestrator.stop().await;
    }
}
