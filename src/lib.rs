//! # fallsense
//!
//! Multi-backend perception normalization and fall-risk fusion engine.
//!
//! Heterogeneous pose-detection backends are normalized into a canonical
//! 33-point landmark observation, scored for fall risk from the body lean
//! angle, and fused with audio and gesture triggers into debounced alerts.
//!
//! ## Architecture
//!
//! - [`backend`] — backend adapters, payload normalization, registry with
//!   reliability-driven failover
//! - [`scoring`] — pure kinematic risk scorer
//! - [`fusion`] — multi-modal alert state machine, bounded history, sinks
//! - [`triggers`] — audio and gesture trigger detectors
//! - [`session`] — bounded frame queue and worker tasks
//!
//! ## Example
//!
//! ```no_run
//! use fallsense::backend::SimulatedBackend;
//! use fallsense::domain::Frame;
//! use fallsense::{EngineConfig, MonitorEngine};
//!
//! # fn main() -> Result<(), fallsense::EngineError> {
//! let engine = MonitorEngine::builder(EngineConfig::default())
//!     .register_backend(Box::new(SimulatedBackend::with_lean("sim", 35.0)))
//!     .build()?;
//!
//! let frame = Frame::new(vec![0u8; 640 * 480 * 3], 640, 480, 3);
//! let (assessment, alert) = engine.process_frame(&frame)?;
//! println!("risk: {} ({:.1}°)", assessment.risk_level, assessment.body_angle_degrees);
//! if let Some(alert) = alert {
//!     println!("alert: {}", alert.message());
//! }
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod clock;
pub mod domain;
pub mod fusion;
pub mod scoring;
pub mod session;
pub mod triggers;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use backend::{
    BackendRegistry, BackendState, BackendStats, PoseBackend, RegistryConfig, SelectionPolicy,
};
use clock::{Clock, SystemClock};
use domain::{
    AlertEvent, BackendId, Frame, FrameError, RiskAssessment, RiskThresholds, ThresholdError,
};
use fusion::{AlertSink, FusionConfig, FusionMachine};
use scoring::RiskScorer;
use triggers::{
    EnergySpikeDetector, GestureDetector, GestureSample, HandsRaisedDetector,
    HelpKeywordDetector,
};

/// Crate-level result alias.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced by the engine boundary.
///
/// Only configuration errors are fatal to setup; everything else is
/// recovered locally and the engine keeps producing assessments.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A submitted frame buffer failed validation
    #[error("invalid frame: {0}")]
    InvalidFrame(#[from] FrameError),

    /// Risk thresholds failed validation
    #[error("invalid thresholds: {0}")]
    Thresholds(#[from] ThresholdError),

    /// Some other configuration value is unusable
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The engine was built with no backends registered
    #[error("no pose backends registered")]
    NoBackends,

    /// A named backend does not exist
    #[error("unknown backend: {0}")]
    UnknownBackend(String),
}

/// Engine configuration.
///
/// Validated synchronously when the engine is built; not reconfigurable
/// while a session is running.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Body-angle risk thresholds
    pub thresholds: RiskThresholds,
    /// Alert suppression window
    pub cooldown: Duration,
    /// Backend selection policy
    pub selection_policy: SelectionPolicy,
    /// Rolling reliability window per backend
    pub stats_window: usize,
    /// Windowed success rate below which a backend degrades
    pub degrade_threshold: f64,
    /// Minimum recorded attempts before reliability transitions apply
    pub min_attempts: usize,
    /// Maximum retained alert events
    pub history_capacity: usize,
    /// Bounded frame queue capacity for sessions
    pub queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            thresholds: RiskThresholds::default(),
            cooldown: Duration::from_secs(3),
            selection_policy: SelectionPolicy::default(),
            stats_window: 50,
            degrade_threshold: 0.5,
            min_attempts: 10,
            history_capacity: 200,
            queue_capacity: 8,
        }
    }
}

impl EngineConfig {
    /// Validate every field.
    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;
        if self.stats_window == 0 {
            return Err(EngineError::Config("stats_window must be at least 1".into()));
        }
        if self.history_capacity == 0 {
            return Err(EngineError::Config(
                "history_capacity must be at least 1".into(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(EngineError::Config(
                "queue_capacity must be at least 1".into(),
            ));
        }
        if !self.degrade_threshold.is_finite()
            || !(0.0..=1.0).contains(&self.degrade_threshold)
        {
            return Err(EngineError::Config(format!(
                "degrade_threshold must be in [0, 1], got {}",
                self.degrade_threshold
            )));
        }
        Ok(())
    }
}

/// Builder wiring backends, detectors, and sinks into a [`MonitorEngine`].
pub struct MonitorEngineBuilder {
    config: EngineConfig,
    backends: Vec<Box<dyn PoseBackend>>,
    sinks: Vec<Box<dyn AlertSink>>,
    audio_detector: Box<dyn HelpKeywordDetector>,
    gesture_detector: Box<dyn GestureDetector>,
    clock: Arc<dyn Clock>,
}

impl MonitorEngineBuilder {
    fn new(config: EngineConfig) -> Self {
        Self {
            config,
            backends: Vec::new(),
            sinks: Vec::new(),
            audio_detector: Box::new(EnergySpikeDetector::default()),
            gesture_detector: Box::new(HandsRaisedDetector::default()),
            clock: Arc::new(SystemClock),
        }
    }

    /// Register a pose backend. Registration order defines priority.
    pub fn register_backend(mut self, backend: Box<dyn PoseBackend>) -> Self {
        self.backends.push(backend);
        self
    }

    /// Add an alert sink. Every sink receives every alert.
    pub fn add_sink(mut self, sink: Box<dyn AlertSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Replace the default audio help detector.
    pub fn with_audio_detector(mut self, detector: Box<dyn HelpKeywordDetector>) -> Self {
        self.audio_detector = detector;
        self
    }

    /// Replace the default gesture detector.
    pub fn with_gesture_detector(mut self, detector: Box<dyn GestureDetector>) -> Self {
        self.gesture_detector = detector;
        self
    }

    /// Replace the system clock (tests use a manually advanced clock).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Validate the configuration and assemble the engine.
    pub fn build(self) -> Result<MonitorEngine> {
        self.config.validate()?;
        if self.backends.is_empty() {
            return Err(EngineError::NoBackends);
        }

        let registry_config = RegistryConfig {
            policy: self.config.selection_policy,
            stats_window: self.config.stats_window,
            degrade_threshold: self.config.degrade_threshold,
            min_attempts: self.config.min_attempts,
        };
        let mut registry = BackendRegistry::new(registry_config, self.clock.clone());
        for backend in self.backends {
            registry.register(backend);
        }

        let fusion_config = FusionConfig {
            cooldown: self.config.cooldown,
            history_capacity: self.config.history_capacity,
        };

        Ok(MonitorEngine {
            scorer: RiskScorer::new(self.config.thresholds),
            fusion: FusionMachine::new(fusion_config, self.clock.clone()),
            registry,
            sinks: self.sinks,
            audio_detector: self.audio_detector,
            gesture_detector: self.gesture_detector,
            last_assessment: Mutex::new(None),
            counters: EngineCounters::default(),
            config: self.config,
        })
    }
}

#[derive(Debug, Default)]
struct EngineCounters {
    frames_processed: AtomicU64,
    frames_dropped: AtomicU64,
    falls_detected: AtomicU64,
    alerts_emitted: AtomicU64,
}

/// Reliability snapshot of one registered backend.
#[derive(Debug, Clone)]
pub struct BackendStatus {
    /// Backend identifier
    pub backend: BackendId,
    /// Current reliability state
    pub state: BackendState,
    /// Lifetime success rate
    pub success_rate: f64,
    /// Success rate over the rolling window
    pub windowed_success_rate: f64,
    /// Average probe latency over the rolling window
    pub average_latency: Option<Duration>,
}

/// Point-in-time snapshot of the whole engine.
#[derive(Debug, Clone)]
pub struct EngineStatus {
    /// Per-backend reliability, in priority order
    pub backends: Vec<BackendStatus>,
    /// Frames run through the pipeline
    pub frames_processed: u64,
    /// Frames dropped by queue overflow
    pub frames_dropped: u64,
    /// Frames scored as fall-consistent
    pub falls_detected: u64,
    /// Alerts emitted by the fusion machine
    pub alerts_emitted: u64,
    /// Alerts currently retained in history
    pub alerts_retained: usize,
    /// Whether the fusion machine is inside a cooldown window
    pub suppressed: bool,
}

/// Coordinator tying the registry, scorer, fusion machine, and sinks
/// together behind the boundary operations.
///
/// All methods take `&self`; the engine is shared across session workers
/// behind an `Arc`.
pub struct MonitorEngine {
    config: EngineConfig,
    registry: BackendRegistry,
    scorer: RiskScorer,
    fusion: FusionMachine,
    sinks: Vec<Box<dyn AlertSink>>,
    audio_detector: Box<dyn HelpKeywordDetector>,
    gesture_detector: Box<dyn GestureDetector>,
    last_assessment: Mutex<Option<RiskAssessment>>,
    counters: EngineCounters,
}

impl MonitorEngine {
    /// Start building an engine with the given configuration.
    pub fn builder(config: EngineConfig) -> MonitorEngineBuilder {
        MonitorEngineBuilder::new(config)
    }

    /// The validated configuration this engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one frame through the full pipeline.
    ///
    /// Returns the risk assessment and, when the fusion machine fired, the
    /// emitted alert. The alert is already appended to history; delivering
    /// it to the sinks is the caller's job via
    /// [`dispatch_alert`](Self::dispatch_alert) (session workers do this
    /// automatically). Backend exhaustion is not an error: the assessment
    /// comes back as `Unknown`. Only a malformed frame buffer is rejected,
    /// and that rejection is charged to the backend the frame was bound for
    /// as a failed attempt.
    pub fn process_frame(&self, frame: &Frame) -> Result<(RiskAssessment, Option<AlertEvent>)> {
        if let Err(err) = frame.validate() {
            self.registry.record_rejected_frame();
            return Err(EngineError::InvalidFrame(err));
        }

        let observation = self.registry.observe(frame);
        let assessment = self.scorer.score(&observation);
        debug!(
            risk_level = %assessment.risk_level,
            body_angle = assessment.body_angle_degrees,
            backend = assessment.source_backend.as_ref().map(BackendId::as_str),
            "frame scored"
        );

        self.counters.frames_processed.fetch_add(1, Ordering::Relaxed);
        if assessment.is_critical() {
            self.counters.falls_detected.fetch_add(1, Ordering::Relaxed);
        }
        *self.last_assessment.lock() = Some(assessment.clone());

        let alert = self.fusion.tick(Some(&assessment), false, false);
        if alert.is_some() {
            self.counters.alerts_emitted.fetch_add(1, Ordering::Relaxed);
        }
        Ok((assessment, alert))
    }

    /// Feed one PCM audio buffer through the help detector.
    ///
    /// Returns whether the audio trigger fired. Malformed buffers are
    /// logged and reported as no trigger, never as a failure. An emitted
    /// alert is delivered to the sinks before returning.
    pub async fn process_audio(&self, pcm: &[i16], sample_rate: u32) -> bool {
        let fired = match self.audio_detector.detect(pcm, sample_rate) {
            Ok(fired) => fired,
            Err(err) => {
                warn!(detector = self.audio_detector.name(), error = %err, "audio buffer rejected");
                return false;
            }
        };
        if fired {
            self.trigger(true, false).await;
        }
        fired
    }

    /// Feed one gesture sample through the gesture detector.
    ///
    /// `None` means the gesture channel produced nothing this cycle.
    /// Same contract as [`process_audio`](Self::process_audio).
    pub async fn process_gesture(&self, input: Option<&GestureSample>) -> bool {
        let Some(sample) = input else { return false };
        let fired = match self.gesture_detector.detect(sample) {
            Ok(fired) => fired,
            Err(err) => {
                warn!(detector = self.gesture_detector.name(), error = %err, "gesture sample rejected");
                return false;
            }
        };
        if fired {
            self.trigger(false, true).await;
        }
        fired
    }

    /// Tick the fusion machine for a non-visual trigger, reusing the last
    /// computed assessment for the event record.
    async fn trigger(&self, audio: bool, gesture: bool) {
        let last = self.last_assessment.lock().clone();
        let alert = self.fusion.tick(last.as_ref(), audio, gesture);
        if let Some(alert) = alert {
            self.counters.alerts_emitted.fetch_add(1, Ordering::Relaxed);
            self.dispatch_alert(&alert).await;
        }
    }

    /// Deliver an alert to every registered sink.
    ///
    /// Sink failures are logged and swallowed; delivery never feeds back
    /// into the detection path.
    pub async fn dispatch_alert(&self, alert: &AlertEvent) {
        for sink in &self.sinks {
            if let Err(err) = sink.deliver(alert).await {
                warn!(sink = sink.name(), alert_id = %alert.id(), error = %err, "alert delivery failed");
            }
        }
    }

    /// Non-blocking snapshot of per-backend stats, in priority order.
    pub fn backend_stats(&self) -> Vec<BackendStats> {
        self.registry.stats_snapshot()
    }

    /// Up to `limit` most recent alerts, oldest first.
    pub fn alert_history(&self, limit: usize) -> Vec<AlertEvent> {
        let mut events = self.fusion.history();
        let skip = events.len().saturating_sub(limit);
        events.drain(..skip);
        events
    }

    /// Point-in-time snapshot of the whole engine.
    pub fn status(&self) -> EngineStatus {
        let stats = self.registry.stats_snapshot();
        let states = self.registry.states();
        let backends = stats
            .into_iter()
            .zip(states)
            .map(|(stats, (backend, state))| BackendStatus {
                backend,
                state,
                success_rate: stats.success_rate(),
                windowed_success_rate: stats.windowed_success_rate(),
                average_latency: stats.average_latency(),
            })
            .collect();

        EngineStatus {
            backends,
            frames_processed: self.counters.frames_processed.load(Ordering::Relaxed),
            frames_dropped: self.counters.frames_dropped.load(Ordering::Relaxed),
            falls_detected: self.counters.falls_detected.load(Ordering::Relaxed),
            alerts_emitted: self.counters.alerts_emitted.load(Ordering::Relaxed),
            alerts_retained: self.fusion.history_len(),
            suppressed: self.fusion.is_suppressed(),
        }
    }

    /// The most recent risk assessment, if any frame has been scored.
    pub fn last_assessment(&self) -> Option<RiskAssessment> {
        self.last_assessment.lock().clone()
    }

    /// Manually re-enable a disabled backend.
    pub fn enable_backend(&self, name: &str) -> Result<()> {
        if self.registry.enable(name) {
            Ok(())
        } else {
            Err(EngineError::UnknownBackend(name.to_string()))
        }
    }

    /// Reset backend stats, fusion state, history, and counters.
    pub fn reset(&self) {
        self.registry.reset();
        self.fusion.reset();
        *self.last_assessment.lock() = None;
        self.counters.frames_processed.store(0, Ordering::Relaxed);
        self.counters.frames_dropped.store(0, Ordering::Relaxed);
        self.counters.falls_detected.store(0, Ordering::Relaxed);
        self.counters.alerts_emitted.store(0, Ordering::Relaxed);
    }

    pub(crate) fn note_dropped_frame(&self) {
        self.counters.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }
}

/// Commonly used types.
pub mod prelude {
    pub use crate::backend::{PoseBackend, SelectionPolicy, SimulatedBackend};
    pub use crate::domain::{
        AlertEvent, BackendId, Frame, Landmark, PoseObservation, RiskAssessment, RiskLevel,
        RiskThresholds, TriggerModality,
    };
    pub use crate::fusion::{AlertSink, ConsoleAlertSink, TracingAlertSink};
    pub use crate::session::MonitoringSession;
    pub use crate::triggers::{GestureDetector, GestureSample, HelpKeywordDetector};
    pub use crate::{EngineConfig, EngineError, EngineStatus, MonitorEngine};
}
