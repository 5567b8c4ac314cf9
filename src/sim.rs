//! Simulated capture rig
//!
//! Deterministic in-process implementations of the hardware and network
//! seams: capture host/stream, native detector, fallback engine,
//! registry, and a collecting status surface. The binary smoke rig and
//! the integration tests drive the full pipeline through these.

use crate::backend::{EngineConfig, FallbackEngine, NativeDetector};
use crate::device::{
    AcquisitionRequest, CaptureHost, CaptureStream, TrackCapabilities, TrackConstraint, VideoSink,
};
use crate::display::{StatusMessage, StatusSurface};
use crate::error::{Error, Result};
use crate::models::{DecodedResult, EventContext, RawDetection};
use crate::submission::{RegistrationOutcome, RegistryClient, SubmissionOutcome};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

/// Scripted capture stream
///
/// Records every applied constraint; per-shape rejection flags model
/// heterogeneous device behavior.
pub struct SimStream {
    caps: TrackCapabilities,
    reject_direct_illumination: bool,
    reject_advanced_illumination: bool,
    reject_zoom: bool,
    ready: AtomicBool,
    released: AtomicBool,
    applied: Mutex<Vec<TrackConstraint>>,
}

impl SimStream {
    pub fn new(caps: TrackCapabilities) -> Self {
        Self {
            caps,
            reject_direct_illumination: false,
            reject_advanced_illumination: false,
            reject_zoom: false,
            ready: AtomicBool::new(true),
            released: AtomicBool::new(false),
            applied: Mutex::new(Vec::new()),
        }
    }

    pub fn reject_direct_illumination(mut self) -> Self {
        self.reject_direct_illumination = true;
        self
    }

    pub fn reject_advanced_illumination(mut self) -> Self {
        self.reject_advanced_illumination = true;
        self
    }

    pub fn reject_zoom(mut self) -> Self {
        self.reject_zoom = true;
        self
    }

    pub fn not_ready(self) -> Self {
        self.ready.store(false, Ordering::SeqCst);
        self
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Constraints applied so far, in order
    pub fn applied(&self) -> Vec<TrackConstraint> {
        self.applied.lock().expect("applied lock").clone()
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaptureStream for SimStream {
    fn capabilities(&self) -> TrackCapabilities {
        self.caps
    }

    async fn apply(&self, constraint: TrackConstraint) -> Result<()> {
        self.applied.lock().expect("applied lock").push(constraint);

        let rejected = match constraint {
            TrackConstraint::Illumination { .. } => self.reject_direct_illumination,
            TrackConstraint::AdvancedIllumination { .. } => self.reject_advanced_illumination,
            TrackConstraint::AdvancedZoom { .. } => self.reject_zoom,
        };

        if rejected {
            Err(Error::FeatureNegotiation(format!(
                "constraint rejected by device: {constraint:?}"
            )))
        } else {
            Ok(())
        }
    }

    fn ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

/// Scripted capture host
///
/// Streams it creates accept every constraint and report the configured
/// capabilities.
pub struct SimHost {
    caps: TrackCapabilities,
    fail: bool,
    requests: Mutex<Vec<AcquisitionRequest>>,
}

impl SimHost {
    pub fn new(caps: TrackCapabilities) -> Self {
        Self {
            caps,
            fail: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_acquire(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn acquisition_count(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }

    pub fn last_request(&self) -> Option<AcquisitionRequest> {
        self.requests.lock().expect("requests lock").last().cloned()
    }
}

#[async_trait]
impl CaptureHost for SimHost {
    async fn acquire(&self, request: &AcquisitionRequest) -> Result<Arc<dyn CaptureStream>> {
        if self.fail {
            return Err(Error::DeviceAcquisition(
                "camera permission denied".to_string(),
            ));
        }
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());
        Ok(Arc::new(SimStream::new(self.caps)))
    }
}

/// Scripted native detector
///
/// Pops one scripted result per decode call; once the script is
/// exhausted every call sees an empty frame.
pub struct ScriptedDetector {
    script: Mutex<VecDeque<Result<Vec<RawDetection>>>>,
    fail_warm_up: bool,
    calls: AtomicUsize,
}

impl ScriptedDetector {
    pub fn new(script: Vec<Result<Vec<RawDetection>>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fail_warm_up: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Make `warm_up` report an explicit init failure
    pub fn fail_start(mut self) -> Self {
        self.fail_warm_up = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NativeDetector for ScriptedDetector {
    async fn warm_up(&self) -> Result<()> {
        if self.fail_warm_up {
            Err(Error::BackendInit("native detector unusable".to_string()))
        } else {
            Ok(())
        }
    }

    async fn detect(&self, _stream: &dyn CaptureStream) -> Result<Vec<RawDetection>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Scripted fallback engine
pub struct SimEngine {
    fail_init: bool,
    init_delay: Duration,
    init_calls: AtomicUsize,
    started: AtomicBool,
    last_config: Mutex<Option<EngineConfig>>,
    tx: broadcast::Sender<RawDetection>,
}

impl SimEngine {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(32);
        Self {
            fail_init: false,
            init_delay: Duration::ZERO,
            init_calls: AtomicUsize::new(0),
            started: AtomicBool::new(false),
            last_config: Mutex::new(None),
            tx,
        }
    }

    pub fn fail_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    pub fn init_delay(mut self, delay: Duration) -> Self {
        self.init_delay = delay;
        self
    }

    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn last_config(&self) -> Option<EngineConfig> {
        self.last_config.lock().expect("config lock").clone()
    }

    /// Simulate the library's internal loop decoding a symbol
    pub fn push(&self, detection: RawDetection) {
        let _ = self.tx.send(detection);
    }
}

impl Default for SimEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FallbackEngine for SimEngine {
    async fn init(&self, config: EngineConfig, _sink: Arc<VideoSink>) -> Result<()> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_config.lock().expect("config lock") = Some(config);

        if !self.init_delay.is_zero() {
            tokio::time::sleep(self.init_delay).await;
        }
        if self.fail_init {
            Err(Error::BackendInit("library init failed".to_string()))
        } else {
            Ok(())
        }
    }

    fn start(&self) -> Result<()> {
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) {
        self.started.store(false, Ordering::SeqCst);
    }

    fn subscribe(&self) -> broadcast::Receiver<RawDetection> {
        self.tx.subscribe()
    }
}

/// Status surface that collects messages for assertions
#[derive(Default)]
pub struct CollectingSurface {
    messages: Mutex<Vec<StatusMessage>>,
}

impl CollectingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<StatusMessage> {
        self.messages.lock().expect("messages lock").clone()
    }
}

impl StatusSurface for CollectingSurface {
    fn show(&self, message: StatusMessage) {
        self.messages.lock().expect("messages lock").push(message);
    }
}

/// In-memory registry
///
/// Accepts everything by default; scripted outcomes are consumed first,
/// in order.
pub struct InMemoryRegistry {
    accept_id: Mutex<Option<String>>,
    scripted_registrations: Mutex<VecDeque<RegistrationOutcome>>,
    scripted_submissions: Mutex<VecDeque<SubmissionOutcome>>,
    registered: Mutex<Vec<EventContext>>,
    submissions: Mutex<Vec<(DecodedResult, EventContext)>>,
    submission_attempts: AtomicUsize,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self {
            accept_id: Mutex::new(None),
            scripted_registrations: Mutex::new(VecDeque::new()),
            scripted_submissions: Mutex::new(VecDeque::new()),
            registered: Mutex::new(Vec::new()),
            submissions: Mutex::new(Vec::new()),
            submission_attempts: AtomicUsize::new(0),
        }
    }

    /// Fixed id for every accepted submission (default: sequence
    /// number)
    pub fn set_accept_id(&self, id: &str) {
        *self.accept_id.lock().expect("accept_id lock") = Some(id.to_string());
    }

    pub fn queue_registration_outcome(&self, outcome: RegistrationOutcome) {
        self.scripted_registrations
            .lock()
            .expect("registrations lock")
            .push_back(outcome);
    }

    pub fn queue_submission_outcome(&self, outcome: SubmissionOutcome) {
        self.scripted_submissions
            .lock()
            .expect("submissions lock")
            .push_back(outcome);
    }

    pub fn fail_next_registration_with_validation(&self, field: &str, message: &str) {
        let mut field_errors = std::collections::BTreeMap::new();
        field_errors.insert(field.to_string(), message.to_string());
        self.queue_registration_outcome(RegistrationOutcome::ValidationFailed { field_errors });
    }

    pub fn fail_next_submission_with_validation(&self, field: &str, message: &str) {
        let mut field_errors = std::collections::BTreeMap::new();
        field_errors.insert(field.to_string(), message.to_string());
        self.queue_submission_outcome(SubmissionOutcome::ValidationFailed { field_errors });
    }

    /// Contexts registered so far
    pub fn registered(&self) -> Vec<EventContext> {
        self.registered.lock().expect("registered lock").clone()
    }

    /// Accepted submissions so far
    pub fn submissions(&self) -> Vec<(DecodedResult, EventContext)> {
        self.submissions.lock().expect("submissions lock").clone()
    }

    /// Every submission attempt, accepted or not
    pub fn submission_attempts(&self) -> usize {
        self.submission_attempts.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RegistryClient for InMemoryRegistry {
    async fn register_event(&self, context: &EventContext) -> RegistrationOutcome {
        if let Some(outcome) = self
            .scripted_registrations
            .lock()
            .expect("registrations lock")
            .pop_front()
        {
            return outcome;
        }

        self.registered
            .lock()
            .expect("registered lock")
            .push(context.clone());
        RegistrationOutcome::Registered
    }

    async fn submit_detection(
        &self,
        result: &DecodedResult,
        context: &EventContext,
    ) -> SubmissionOutcome {
        self.submission_attempts.fetch_add(1, Ordering::SeqCst);

        if let Some(outcome) = self
            .scripted_submissions
            .lock()
            .expect("submissions lock")
            .pop_front()
        {
            return outcome;
        }

        let mut submissions = self.submissions.lock().expect("submissions lock");
        submissions.push((result.clone(), context.clone()));

        let id = self
            .accept_id
            .lock()
            .expect("accept_id lock")
            .clone()
            .unwrap_or_else(|| submissions.len().to_string());
        SubmissionOutcome::Accepted { id }
    }
}
