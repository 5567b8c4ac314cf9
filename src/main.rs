//! Scanpost acquisition orchestrator
//!
//! Runs the full acquisition flow against the simulated capture rig:
//! registration gate, fallback chain, detection loop, submission. With
//! REGISTRY_URL set, submissions go to a real registry over HTTP;
//! otherwise an in-memory registry accepts everything.

use scanpost::backend::{FallbackEngine, NativeDetector};
use scanpost::config::AppConfig;
use scanpost::display::LogSurface;
use scanpost::device::{TrackCapabilities, ZoomRange};
use scanpost::models::{RawDetection, Symbology};
use scanpost::orchestrator::Orchestrator;
use scanpost::sim::{InMemoryRegistry, ScriptedDetector, SimHost};
use scanpost::submission::{RegistryClient, SubmissionClient};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SMOKE_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) scanpost-smoke";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scanpost=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting scanpost v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::default();
    tracing::info!(
        registry_url = %config.registry_url,
        client_info = %config.client_info,
        poll_interval_ms = config.poll_interval_ms,
        "Configuration loaded"
    );

    let event_label = std::env::var("EVENT_NAME").unwrap_or_else(|_| "smoke-event".to_string());
    let event_date = std::env::var("EVENT_DATE")
        .unwrap_or_else(|_| chrono::Utc::now().format("%Y-%m-%d").to_string());

    let registry: Arc<dyn RegistryClient> = if std::env::var("REGISTRY_URL").is_ok() {
        tracing::info!("Using HTTP registry");
        Arc::new(SubmissionClient::new(
            &config.registry_url,
            &config.client_info,
        ))
    } else {
        tracing::info!("REGISTRY_URL not set, using in-memory registry");
        Arc::new(InMemoryRegistry::new())
    };

    // Simulated torch-capable, zoomable camera with one EAN-13 in view
    let host = Arc::new(SimHost::new(TrackCapabilities {
        illumination_supported: true,
        zoom: Some(ZoomRange { min: 1.0, max: 4.0 }),
    }));
    let detector: Arc<dyn NativeDetector> = Arc::new(ScriptedDetector::new(vec![Ok(vec![
        RawDetection::new("4901234567894", Symbology::Ean13),
    ])]));
    let engine: Option<Arc<dyn FallbackEngine>> = None;

    let orchestrator = Orchestrator::new(
        config,
        host,
        Some(detector),
        engine,
        registry,
        Arc::new(LogSurface),
        SMOKE_USER_AGENT,
    );

    orchestrator.start(&event_label, &event_date).await?;

    let session = orchestrator.session().await;
    tracing::info!(backend = ?session.backend, "Chain resolved");

    // Let the loop run a few ticks, then shut down cleanly
    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(3)) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted");
        }
    }

    orchestrator.stop().await;
    tracing::info!("Shutdown complete");
    Ok(())
}
