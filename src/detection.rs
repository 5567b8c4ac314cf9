//! Detection loop and result pipeline
//!
//! Both backends feed the same path: normalize, display, submit. The
//! native variant polls on a fixed interval; the fallback variant
//! drains a push subscription. Loops carry an explicit stop signal so
//! they can be driven deterministically.

use crate::backend::NativeDetector;
use crate::display::{StatusMessage, StatusSurface};
use crate::models::{EventContext, RawDetection};
use crate::normalize::{normalize, DisplayRules, SymbologySet};
use crate::submission::{RegistryClient, SubmissionOutcome};
use crate::device::VideoSink;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, Mutex};
use tracing::{debug, warn};

/// Repeat-emission policy
///
/// The dominant historical behavior re-emits on every tick that sees a
/// symbol; the operator is expected to move the camera away after a
/// read. Suppression is opt-in configuration, not an assumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebouncePolicy {
    /// Every tick that sees a symbol re-emits it
    EmitEveryTick,
    /// Skip emissions while the payload equals the previous emission
    SuppressConsecutive,
}

/// Normalize → display → submit path shared by both backends
pub struct DetectionPipeline {
    rules: DisplayRules,
    symbologies: SymbologySet,
    debounce: DebouncePolicy,
    registry: Arc<dyn RegistryClient>,
    surface: Arc<dyn StatusSurface>,
    context: EventContext,
    last_emitted: Mutex<Option<String>>,
}

impl DetectionPipeline {
    pub fn new(
        rules: DisplayRules,
        symbologies: SymbologySet,
        debounce: DebouncePolicy,
        registry: Arc<dyn RegistryClient>,
        surface: Arc<dyn StatusSurface>,
        context: EventContext,
    ) -> Self {
        Self {
            rules,
            symbologies,
            debounce,
            registry,
            surface,
            context,
            last_emitted: Mutex::new(None),
        }
    }

    /// Run one raw detection through the pipeline
    pub async fn handle(&self, raw: RawDetection) {
        if !self.symbologies.contains(raw.symbology) {
            debug!(symbology = ?raw.symbology, "Symbology not enabled, dropping detection");
            return;
        }

        let result = normalize(&raw, &self.rules);

        if self.debounce == DebouncePolicy::SuppressConsecutive {
            let last = self.last_emitted.lock().await;
            if last.as_deref() == Some(result.display_value.as_str()) {
                return;
            }
        }

        self.surface.show(StatusMessage::Detection {
            display_value: result.display_value.clone(),
            symbology_label: result.symbology_label.clone(),
        });

        // Fire-and-forget: the outcome is surfaced, never retried
        match self.registry.submit_detection(&result, &self.context).await {
            SubmissionOutcome::Accepted { id } => {
                self.surface.show(StatusMessage::Saved {
                    id,
                    code: result.display_value.clone(),
                });
            }
            SubmissionOutcome::ValidationFailed { field_errors } => {
                self.surface
                    .show(StatusMessage::ValidationErrors(field_errors));
            }
            SubmissionOutcome::TransportFailed { status } => {
                self.surface
                    .show(StatusMessage::Connectivity(format!("HTTP {status}")));
            }
            SubmissionOutcome::ConnectionFailed => {
                self.surface.show(StatusMessage::Connectivity(
                    "could not reach the registry".to_string(),
                ));
            }
        }

        *self.last_emitted.lock().await = Some(result.display_value);
    }

    /// Display surface the loops report per-frame errors to
    pub fn surface(&self) -> &dyn StatusSurface {
        self.surface.as_ref()
    }
}

/// Fixed-interval poll loop for the native backend
///
/// While the sink is not ready the tick does no work. Per-tick decode
/// failures are reported and the loop continues; a slow decode simply
/// delays the next tick.
pub async fn run_native_loop(
    detector: Arc<dyn NativeDetector>,
    sink: Arc<VideoSink>,
    pipeline: Arc<DetectionPipeline>,
    poll_interval: Duration,
    mut stop: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                let Some(stream) = sink.current().await else {
                    continue;
                };
                if !stream.ready() {
                    continue;
                }

                match detector.detect(stream.as_ref()).await {
                    Ok(detections) => {
                        // Only the first result of a batch is taken
                        if let Some(first) = detections.into_iter().next() {
                            pipeline.handle(first).await;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Decode attempt failed");
                        pipeline
                            .surface()
                            .show(StatusMessage::Info(format!("Detection error: {e}")));
                    }
                }
            }
        }
    }

    debug!("Native detection loop stopped");
}

/// Push loop draining the fallback library's subscription
pub async fn run_push_loop(
    mut detections: broadcast::Receiver<RawDetection>,
    pipeline: Arc<DetectionPipeline>,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    break;
                }
            }
            received = detections.recv() => {
                match received {
                    Ok(raw) => pipeline.handle(raw).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped = skipped, "Detection subscription lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    debug!("Push detection loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Symbology;
    use crate::sim::{CollectingSurface, InMemoryRegistry, ScriptedDetector, SimStream};
    use crate::device::TrackCapabilities;
    use crate::error::Error;

    fn pipeline(
        registry: Arc<InMemoryRegistry>,
        surface: Arc<CollectingSurface>,
        debounce: DebouncePolicy,
    ) -> Arc<DetectionPipeline> {
        Arc::new(DetectionPipeline::new(
            DisplayRules::default(),
            SymbologySet::ean13_only(),
            debounce,
            registry,
            surface,
            EventContext::new("Conf2024", "2024-05-01"),
        ))
    }

    #[tokio::test]
    async fn test_pipeline_normalizes_and_submits() {
        let registry = Arc::new(InMemoryRegistry::new());
        let surface = Arc::new(CollectingSurface::new());
        let pipeline = pipeline(registry.clone(), surface.clone(), DebouncePolicy::EmitEveryTick);

        pipeline
            .handle(RawDetection::new("0123456789012", Symbology::Ean13))
            .await;

        let submissions = registry.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].0.display_value, "012345678");
        assert_eq!(submissions[0].1.label(), "Conf2024");
    }

    #[tokio::test]
    async fn test_pipeline_drops_disabled_symbology() {
        let registry = Arc::new(InMemoryRegistry::new());
        let surface = Arc::new(CollectingSurface::new());
        let pipeline = pipeline(registry.clone(), surface, DebouncePolicy::EmitEveryTick);

        pipeline
            .handle(RawDetection::new("hello", Symbology::QrCode))
            .await;

        assert!(registry.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_emit_every_tick_re_submits_repeats() {
        let registry = Arc::new(InMemoryRegistry::new());
        let surface = Arc::new(CollectingSurface::new());
        let pipeline = pipeline(registry.clone(), surface, DebouncePolicy::EmitEveryTick);

        for _ in 0..3 {
            pipeline
                .handle(RawDetection::new("0123456789012", Symbology::Ean13))
                .await;
        }

        assert_eq!(registry.submissions().len(), 3);
    }

    #[tokio::test]
    async fn test_suppress_consecutive_skips_repeats() {
        let registry = Arc::new(InMemoryRegistry::new());
        let surface = Arc::new(CollectingSurface::new());
        let pipeline = pipeline(
            registry.clone(),
            surface,
            DebouncePolicy::SuppressConsecutive,
        );

        pipeline
            .handle(RawDetection::new("0123456789012", Symbology::Ean13))
            .await;
        pipeline
            .handle(RawDetection::new("0123456789012", Symbology::Ean13))
            .await;
        pipeline
            .handle(RawDetection::new("9999999990123", Symbology::Ean13))
            .await;

        let codes: Vec<String> = registry
            .submissions()
            .iter()
            .map(|(result, _)| result.display_value.clone())
            .collect();
        assert_eq!(codes, vec!["012345678", "999999999"]);
    }

    #[tokio::test]
    async fn test_validation_failure_is_surfaced_not_retried() {
        let registry = Arc::new(InMemoryRegistry::new());
        registry.fail_next_submission_with_validation("code", "invalid");
        let surface = Arc::new(CollectingSurface::new());
        let pipeline = pipeline(registry.clone(), surface.clone(), DebouncePolicy::EmitEveryTick);

        pipeline
            .handle(RawDetection::new("0123456789012", Symbology::Ean13))
            .await;

        assert_eq!(registry.submission_attempts(), 1);
        assert!(surface
            .messages()
            .iter()
            .any(|m| matches!(m, StatusMessage::ValidationErrors(errors) if errors.get("code").map(String::as_str) == Some("invalid"))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_native_loop_takes_first_result_and_survives_frame_errors() {
        let registry = Arc::new(InMemoryRegistry::new());
        let surface = Arc::new(CollectingSurface::new());
        let pipeline = pipeline(registry.clone(), surface.clone(), DebouncePolicy::EmitEveryTick);

        let detector = Arc::new(ScriptedDetector::new(vec![
            Ok(vec![
                RawDetection::new("0123456789012", Symbology::Ean13),
                RawDetection::new("ignored-second", Symbology::Ean13),
            ]),
            Err(Error::DecodeFrame("blurred frame".to_string())),
            Ok(vec![RawDetection::new("9999999990123", Symbology::Ean13)]),
        ]));

        let sink = Arc::new(VideoSink::new());
        sink.replace(Arc::new(SimStream::new(TrackCapabilities::default())))
            .await;

        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(run_native_loop(
            detector,
            sink,
            pipeline,
            Duration::from_millis(100),
            stop_rx,
        ));

        tokio::time::sleep(Duration::from_millis(450)).await;
        stop_tx.send(true).unwrap();
        task.await.unwrap();

        // First batch contributed only its first result; the frame
        // error did not stop the loop
        let codes: Vec<String> = registry
            .submissions()
            .iter()
            .map(|(result, _)| result.display_value.clone())
            .collect();
        assert_eq!(codes, vec!["012345678", "999999999"]);
        assert!(surface
            .messages()
            .iter()
            .any(|m| matches!(m, StatusMessage::Info(text) if text.contains("blurred frame"))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_native_loop_idles_while_sink_not_ready() {
        let registry = Arc::new(InMemoryRegistry::new());
        let surface = Arc::new(CollectingSurface::new());
        let pipeline = pipeline(registry.clone(), surface, DebouncePolicy::EmitEveryTick);

        let detector = Arc::new(ScriptedDetector::new(vec![Ok(vec![RawDetection::new(
            "0123456789012",
            Symbology::Ean13,
        )])]));

        let sink = Arc::new(VideoSink::new());
        let stream = Arc::new(SimStream::new(TrackCapabilities::default()).not_ready());
        sink.replace(stream).await;

        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(run_native_loop(
            detector.clone(),
            sink,
            pipeline,
            Duration::from_millis(100),
            stop_rx,
        ));

        tokio::time::sleep(Duration::from_millis(350)).await;
        stop_tx.send(true).unwrap();
        task.await.unwrap();

        assert_eq!(detector.calls(), 0);
        assert!(registry.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_push_loop_feeds_pipeline() {
        let registry = Arc::new(InMemoryRegistry::new());
        let surface = Arc::new(CollectingSurface::new());
        let pipeline = pipeline(registry.clone(), surface, DebouncePolicy::EmitEveryTick);

        let (tx, rx) = broadcast::channel(16);
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(run_push_loop(rx, pipeline, stop_rx));

        tx.send(RawDetection::new("0123456789012", Symbology::Ean13))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        stop_tx.send(true).unwrap();
        task.await.unwrap();

        assert_eq!(registry.submissions().len(), 1);
    }
}
