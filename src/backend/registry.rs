//! Backend registry and failover controller.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::domain::landmark::{Landmark, LANDMARK_COUNT, VISIBLE_THRESHOLD};
use crate::domain::{BackendId, Frame, PoseObservation};

use super::{normalize, BackendStats, PoseBackend};

/// Per-frame backend selection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionPolicy {
    /// Keep reusing the last successful backend until it degrades, then
    /// re-probe all non-disabled backends and pick the richest observation.
    #[default]
    Sticky,
    /// Probe strictly in priority order every frame, stopping at the first
    /// backend that produces an observation.
    Priority,
}

/// Reliability state of a registered backend.
///
/// `Disabled` is exited only by manual re-enable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendState {
    /// Healthy, eligible for selection
    Active,
    /// Windowed success rate fell below the degrade threshold
    Degraded,
    /// Taken out of rotation until manually re-enabled
    Disabled,
}

impl std::fmt::Display for BackendState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendState::Active => write!(f, "active"),
            BackendState::Degraded => write!(f, "degraded"),
            BackendState::Disabled => write!(f, "disabled"),
        }
    }
}

/// Configuration for the registry and its failover behavior.
#[derive(Debug, Clone, Copy)]
pub struct RegistryConfig {
    /// Selection policy
    pub policy: SelectionPolicy,
    /// Rolling window size W for reliability accounting
    pub stats_window: usize,
    /// Windowed success rate below which a backend degrades (τ)
    pub degrade_threshold: f64,
    /// Minimum recorded attempts before reliability transitions apply
    pub min_attempts: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            policy: SelectionPolicy::Sticky,
            stats_window: 50,
            degrade_threshold: 0.5,
            min_attempts: 10,
        }
    }
}

struct Slot {
    backend: Box<dyn PoseBackend>,
    id: BackendId,
    stats: Mutex<BackendStats>,
    state: Mutex<BackendState>,
}

/// Ordered table of backends with reliability-driven failover.
///
/// Registration order defines priority (index 0 is highest). The registry
/// may be probed from multiple frame-worker threads; each backend's stats
/// are guarded by their own lock.
pub struct BackendRegistry {
    slots: Vec<Slot>,
    config: RegistryConfig,
    sticky: Mutex<Option<usize>>,
    clock: Arc<dyn Clock>,
}

impl BackendRegistry {
    /// Create an empty registry.
    pub fn new(config: RegistryConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            slots: Vec::new(),
            config,
            sticky: Mutex::new(None),
            clock,
        }
    }

    /// Register a backend at the next priority index.
    pub fn register(&mut self, backend: Box<dyn PoseBackend>) {
        let id = BackendId::new(backend.name());
        info!(backend = %id, priority = self.slots.len(), "registering pose backend");
        self.slots.push(Slot {
            stats: Mutex::new(BackendStats::new(id.clone(), self.config.stats_window)),
            state: Mutex::new(BackendState::Active),
            id,
            backend,
        });
    }

    /// Number of registered backends.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no backends are registered.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Produce one canonical observation for the frame.
    ///
    /// Never fails: if every backend is disabled or fails, returns an
    /// unattributed "no detection" observation.
    pub fn observe(&self, frame: &Frame) -> PoseObservation {
        let captured_at = self.clock.now();
        match self.config.policy {
            SelectionPolicy::Priority => self.observe_priority(frame, captured_at),
            SelectionPolicy::Sticky => self.observe_sticky(frame, captured_at),
        }
    }

    fn observe_priority(&self, frame: &Frame, captured_at: Instant) -> PoseObservation {
        for (idx, slot) in self.slots.iter().enumerate() {
            if *slot.state.lock() == BackendState::Disabled {
                continue;
            }
            let (landmarks, latency) = self.probe(idx, frame);
            if let Some(landmarks) = landmarks {
                return PoseObservation::detected(landmarks, slot.id.clone(), captured_at, latency);
            }
        }
        PoseObservation::unattributed(captured_at)
    }

    fn observe_sticky(&self, frame: &Frame, captured_at: Instant) -> PoseObservation {
        let current = *self.sticky.lock();
        if let Some(idx) = current {
            if *self.slots[idx].state.lock() == BackendState::Active {
                let (landmarks, latency) = self.probe(idx, frame);
                let id = self.slots[idx].id.clone();
                if let Some(landmarks) = landmarks {
                    return PoseObservation::detected(landmarks, id, captured_at, latency);
                }
                // Single miss on a still-active backend: stay sticky,
                // report no detection for this frame.
                if *self.slots[idx].state.lock() == BackendState::Active {
                    return PoseObservation::none(id, captured_at, latency);
                }
                debug!(backend = %id, "sticky backend degraded, re-probing all candidates");
            }
        }

        // Probe every non-disabled backend for this frame and keep the
        // richest observation.
        let mut best: Option<(usize, Box<[Landmark; LANDMARK_COUNT]>, Duration)> = None;
        for (idx, slot) in self.slots.iter().enumerate() {
            if *slot.state.lock() == BackendState::Disabled {
                continue;
            }
            let (landmarks, latency) = self.probe(idx, frame);
            let Some(landmarks) = landmarks else { continue };

            let better = match &best {
                None => true,
                Some((best_idx, best_landmarks, _)) => {
                    let candidate = visible_count(&landmarks);
                    let incumbent = visible_count(best_landmarks);
                    if candidate != incumbent {
                        candidate > incumbent
                    } else {
                        let candidate_latency = self.average_latency(idx);
                        let incumbent_latency = self.average_latency(*best_idx);
                        if candidate_latency != incumbent_latency {
                            candidate_latency < incumbent_latency
                        } else {
                            // Lowest priority index wins; earlier slots were
                            // probed first, so the incumbent stands.
                            false
                        }
                    }
                }
            };
            if better {
                best = Some((idx, landmarks, latency));
            }
        }

        match best {
            Some((idx, landmarks, latency)) => {
                let id = self.slots[idx].id.clone();
                *self.sticky.lock() = Some(idx);
                info!(backend = %id, "sticky selection switched");
                PoseObservation::detected(landmarks, id, captured_at, latency)
            }
            None => {
                *self.sticky.lock() = None;
                PoseObservation::unattributed(captured_at)
            }
        }
    }

    /// Invoke one backend, normalize its payload, and record the attempt.
    fn probe(&self, idx: usize, frame: &Frame) -> (Option<Box<[Landmark; LANDMARK_COUNT]>>, Duration) {
        let slot = &self.slots[idx];
        let started = self.clock.now();
        let landmarks = match slot.backend.detect(frame) {
            Ok(payload) => normalize(&payload, frame.width(), frame.height()),
            Err(err) => {
                warn!(backend = %slot.id, error = %err, "backend inference failed");
                None
            }
        };
        let latency = self.clock.now() - started;

        let (windowed_rate, window_len, window_full) = {
            let mut stats = slot.stats.lock();
            stats.record(landmarks.is_some(), latency);
            (
                stats.windowed_success_rate(),
                stats.window_len(),
                stats.window_full(),
            )
        };
        self.apply_reliability_transition(slot, windowed_rate, window_len, window_full);

        (landmarks, latency)
    }

    fn apply_reliability_transition(
        &self,
        slot: &Slot,
        rate: f64,
        window_len: usize,
        window_full: bool,
    ) {
        if window_len < self.config.min_attempts {
            return;
        }
        let mut state = slot.state.lock();
        let tau = self.config.degrade_threshold;
        match *state {
            BackendState::Active if rate < tau => {
                *state = BackendState::Degraded;
                warn!(
                    backend = %slot.id,
                    success_rate = rate,
                    threshold = tau,
                    "backend degraded"
                );
            }
            BackendState::Degraded if window_full && rate < tau / 2.0 => {
                *state = BackendState::Disabled;
                warn!(
                    backend = %slot.id,
                    success_rate = rate,
                    "backend disabled until manual re-enable"
                );
            }
            BackendState::Degraded if rate >= tau => {
                *state = BackendState::Active;
                info!(backend = %slot.id, success_rate = rate, "backend recovered");
            }
            _ => {}
        }
    }

    /// Record an attempt that failed before any backend could be probed,
    /// such as a frame rejected at validation.
    ///
    /// Charged to the backend the frame would have gone to: the sticky
    /// incumbent when one exists, otherwise the highest-priority enabled
    /// backend. No-op when every backend is disabled. Reliability
    /// transitions still apply only on real probes.
    pub fn record_rejected_frame(&self) {
        let idx = match self.config.policy {
            SelectionPolicy::Sticky => (*self.sticky.lock()).or_else(|| self.first_enabled()),
            SelectionPolicy::Priority => self.first_enabled(),
        };
        let Some(idx) = idx else { return };
        self.slots[idx]
            .stats
            .lock()
            .record(false, Duration::ZERO);
    }

    fn first_enabled(&self) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| *slot.state.lock() != BackendState::Disabled)
    }

    fn average_latency(&self, idx: usize) -> Duration {
        self.slots[idx]
            .stats
            .lock()
            .average_latency()
            .unwrap_or(Duration::MAX)
    }

    /// Snapshot of every backend's stats, in priority order.
    pub fn stats_snapshot(&self) -> Vec<BackendStats> {
        self.slots.iter().map(|s| s.stats.lock().clone()).collect()
    }

    /// Current state of every backend, in priority order.
    pub fn states(&self) -> Vec<(BackendId, BackendState)> {
        self.slots
            .iter()
            .map(|s| (s.id.clone(), *s.state.lock()))
            .collect()
    }

    /// Manually re-enable a backend by name.
    ///
    /// Clears its rolling window so it is not judged on the samples that
    /// disabled it. Returns `false` if no backend has that name.
    pub fn enable(&self, name: &str) -> bool {
        for slot in &self.slots {
            if slot.id.as_str() == name {
                *slot.state.lock() = BackendState::Active;
                slot.stats.lock().clear_window();
                info!(backend = %slot.id, "backend manually re-enabled");
                return true;
            }
        }
        false
    }

    /// Reset all stats, states, and sticky selection.
    pub fn reset(&self) {
        for slot in &self.slots {
            slot.stats.lock().reset();
            *slot.state.lock() = BackendState::Active;
        }
        *self.sticky.lock() = None;
        info!("backend registry reset");
    }
}

fn visible_count(landmarks: &[Landmark; LANDMARK_COUNT]) -> usize {
    landmarks
        .iter()
        .filter(|lm| lm.is_visible(VISIBLE_THRESHOLD))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, RawLandmark, RawPosePayload};
    use crate::clock::ManualClock;

    /// Backend that always produces a landmark list with the given number of
    /// well-visible points (the rest dim), or nothing at all.
    struct FakeBackend {
        name: String,
        visible: usize,
        responding: std::sync::atomic::AtomicBool,
    }

    impl FakeBackend {
        fn new(name: &str, visible: usize) -> Self {
            Self {
                name: name.to_string(),
                visible,
                responding: std::sync::atomic::AtomicBool::new(true),
            }
        }

        fn set_responding(&self, responding: bool) {
            self.responding
                .store(responding, std::sync::atomic::Ordering::SeqCst);
        }
    }

    impl PoseBackend for FakeBackend {
        fn name(&self) -> &str {
            &self.name
        }

        fn detect(&self, _frame: &Frame) -> Result<RawPosePayload, BackendError> {
            if !self.responding.load(std::sync::atomic::Ordering::SeqCst) {
                return Ok(RawPosePayload::Empty);
            }
            let raw = (0..LANDMARK_COUNT)
                .map(|i| RawLandmark {
                    x: 0.5,
                    y: 0.3 + 0.01 * i as f64,
                    visibility: if i < self.visible { 0.9 } else { 0.2 },
                })
                .collect();
            Ok(RawPosePayload::LandmarkList(raw))
        }
    }

    fn frame() -> Frame {
        Frame::new(vec![0u8; 64 * 48 * 3], 64, 48, 3)
    }

    fn registry_with(
        policy: SelectionPolicy,
        backends: Vec<Box<dyn PoseBackend>>,
    ) -> BackendRegistry {
        let config = RegistryConfig {
            policy,
            stats_window: 50,
            degrade_threshold: 0.5,
            min_attempts: 10,
        };
        let mut registry = BackendRegistry::new(config, Arc::new(ManualClock::new()));
        for backend in backends {
            registry.register(backend);
        }
        registry
    }

    #[test]
    fn test_priority_policy_stops_at_first_detection() {
        let registry = registry_with(
            SelectionPolicy::Priority,
            vec![
                Box::new(FakeBackend::new("primary", 33)),
                Box::new(FakeBackend::new("fallback", 33)),
            ],
        );

        let obs = registry.observe(&frame());
        assert_eq!(obs.backend().map(BackendId::as_str), Some("primary"));

        let stats = registry.stats_snapshot();
        assert_eq!(stats[0].attempts(), 1);
        assert_eq!(stats[1].attempts(), 0);
    }

    #[test]
    fn test_priority_policy_falls_through_on_miss() {
        let primary = FakeBackend::new("primary", 33);
        primary.set_responding(false);
        let registry = registry_with(
            SelectionPolicy::Priority,
            vec![
                Box::new(primary),
                Box::new(FakeBackend::new("fallback", 33)),
            ],
        );

        let obs = registry.observe(&frame());
        assert_eq!(obs.backend().map(BackendId::as_str), Some("fallback"));
    }

    #[test]
    fn test_sticky_reprobe_prefers_more_visible_landmarks() {
        let registry = registry_with(
            SelectionPolicy::Sticky,
            vec![
                Box::new(FakeBackend::new("sparse", 10)),
                Box::new(FakeBackend::new("rich", 33)),
            ],
        );

        // No sticky selection yet, so the first frame probes everyone.
        let obs = registry.observe(&frame());
        assert_eq!(obs.backend().map(BackendId::as_str), Some("rich"));
        assert_eq!(obs.visible_count(), 33);

        // And stays sticky: only "rich" is probed afterwards.
        let before: Vec<u64> = registry.stats_snapshot().iter().map(|s| s.attempts()).collect();
        registry.observe(&frame());
        let after: Vec<u64> = registry.stats_snapshot().iter().map(|s| s.attempts()).collect();
        assert_eq!(after[0], before[0]);
        assert_eq!(after[1], before[1] + 1);
    }

    #[test]
    fn test_sticky_failover_on_degradation() {
        let flaky = std::sync::Arc::new(FakeBackend::new("flaky", 33));

        struct Shared(std::sync::Arc<FakeBackend>);
        impl PoseBackend for Shared {
            fn name(&self) -> &str {
                self.0.name()
            }
            fn detect(&self, frame: &Frame) -> Result<RawPosePayload, BackendError> {
                self.0.detect(frame)
            }
        }

        let registry = registry_with(
            SelectionPolicy::Sticky,
            vec![
                Box::new(Shared(flaky.clone())),
                Box::new(FakeBackend::new("backup", 33)),
            ],
        );

        // Establish flaky as the sticky backend (probes both on frame one,
        // flaky wins the index tie-break via equal visibility and latency).
        let obs = registry.observe(&frame());
        assert_eq!(obs.backend().map(BackendId::as_str), Some("flaky"));

        // Now it stops responding; enough misses drive its windowed rate
        // below 0.5 and the registry stops selecting it by itself.
        flaky.set_responding(false);
        let mut switched = None;
        for i in 0..30 {
            let obs = registry.observe(&frame());
            if obs.backend().map(BackendId::as_str) == Some("backup") {
                switched = Some(i);
                break;
            }
        }
        assert!(switched.is_some(), "registry never failed over");

        let states = registry.states();
        assert_eq!(states[0].1, BackendState::Degraded);
        assert_eq!(states[1].1, BackendState::Active);
    }

    #[test]
    fn test_disabled_requires_manual_enable() {
        let dead = FakeBackend::new("dead", 33);
        dead.set_responding(false);
        let registry = registry_with(SelectionPolicy::Sticky, vec![Box::new(dead)]);

        // A full window of misses walks Active -> Degraded -> Disabled.
        for _ in 0..60 {
            registry.observe(&frame());
        }
        assert_eq!(registry.states()[0].1, BackendState::Disabled);

        // Disabled backends are not probed at all.
        let before = registry.stats_snapshot()[0].attempts();
        registry.observe(&frame());
        assert_eq!(registry.stats_snapshot()[0].attempts(), before);

        assert!(registry.enable("dead"));
        assert_eq!(registry.states()[0].1, BackendState::Active);
        assert!(!registry.enable("no-such-backend"));
    }

    #[test]
    fn test_rejected_frame_counts_as_failed_attempt() {
        let registry = registry_with(
            SelectionPolicy::Sticky,
            vec![
                Box::new(FakeBackend::new("primary", 33)),
                Box::new(FakeBackend::new("fallback", 33)),
            ],
        );

        // No sticky incumbent yet: the highest-priority backend is charged.
        registry.record_rejected_frame();
        let stats = registry.stats_snapshot();
        assert_eq!(stats[0].attempts(), 1);
        assert_eq!(stats[0].successes(), 0);
        assert_eq!(stats[1].attempts(), 0);

        // Once a sticky incumbent exists, the charge follows it.
        registry.observe(&frame());
        registry.record_rejected_frame();
        let stats = registry.stats_snapshot();
        assert_eq!(stats[0].attempts(), 3);
        assert_eq!(stats[0].successes(), 1);
    }

    #[test]
    fn test_all_backends_failing_returns_unattributed() {
        let dead = FakeBackend::new("dead", 33);
        dead.set_responding(false);
        let registry = registry_with(SelectionPolicy::Sticky, vec![Box::new(dead)]);

        let obs = registry.observe(&frame());
        assert!(!obs.is_detection());
        assert!(obs.backend().is_none());
    }

    #[test]
    fn test_reset_restores_states() {
        let dead = FakeBackend::new("dead", 33);
        dead.set_responding(false);
        let registry = registry_with(SelectionPolicy::Sticky, vec![Box::new(dead)]);
        for _ in 0..60 {
            registry.observe(&frame());
        }
        assert_eq!(registry.states()[0].1, BackendState::Disabled);

        registry.reset();
        assert_eq!(registry.states()[0].1, BackendState::Active);
        assert_eq!(registry.stats_snapshot()[0].attempts(), 0);
    }
}
