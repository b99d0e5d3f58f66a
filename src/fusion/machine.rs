//! Multi-modal fusion and alert debouncing.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::domain::{AlertEvent, ModalitySet, RiskAssessment, RiskLevel};

use super::history::AlertHistory;

/// Confidence assigned when two or more modalities fire together.
const MULTI_MODAL_CONFIDENCE: f64 = 0.95;

/// Confidence assigned to a single non-visual trigger.
const SINGLE_TRIGGER_CONFIDENCE: f64 = 0.75;

/// Fusion machine configuration.
#[derive(Debug, Clone, Copy)]
pub struct FusionConfig {
    /// Suppression window after an emitted alert
    pub cooldown: Duration,
    /// Maximum retained alert events
    pub history_capacity: usize,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_secs(3),
            history_capacity: 200,
        }
    }
}

#[derive(Debug)]
struct FusionState {
    suppressed_until: Option<Instant>,
    history: AlertHistory,
}

/// Debouncing alert state machine over the three trigger modalities.
///
/// Armed by default. Emitting an alert suppresses further emission for the
/// cooldown window; triggers arriving while suppressed widen the modality
/// set of the alert that opened the window instead of producing a new event.
/// Re-arming happens lazily at the start of the next tick once the window
/// has expired.
pub struct FusionMachine {
    config: FusionConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<FusionState>,
}

impl FusionMachine {
    /// Create a fusion machine reading time from the given clock.
    pub fn new(config: FusionConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            state: Mutex::new(FusionState {
                suppressed_until: None,
                history: AlertHistory::new(config.history_capacity),
            }),
        }
    }

    /// Whether the machine is currently inside a cooldown window.
    pub fn is_suppressed(&self) -> bool {
        let state = self.state.lock();
        match state.suppressed_until {
            Some(until) => self.clock.now() < until,
            None => false,
        }
    }

    /// Evaluate one fused observation of the three modalities.
    ///
    /// The visual modality fires when `risk` is a fall-consistent
    /// assessment. Returns the emitted alert, or `None` when nothing fired
    /// or the machine is suppressed.
    pub fn tick(
        &self,
        risk: Option<&RiskAssessment>,
        audio: bool,
        gesture: bool,
    ) -> Option<AlertEvent> {
        let visual = risk.is_some_and(RiskAssessment::is_critical);
        let modalities = ModalitySet::new(visual, audio, gesture);

        let now = self.clock.now();
        let mut state = self.state.lock();

        // Lazy re-arm
        if let Some(until) = state.suppressed_until {
            if now >= until {
                state.suppressed_until = None;
            }
        }

        if !modalities.any() {
            return None;
        }

        if state.suppressed_until.is_some() {
            debug!(modalities = %modalities, "trigger during cooldown, merging into last alert");
            state.history.merge_into_last(modalities);
            return None;
        }

        let risk_level = risk.map_or(RiskLevel::Unknown, |r| r.risk_level);
        let confidence = if modalities.count() >= 2 {
            MULTI_MODAL_CONFIDENCE
        } else if visual {
            risk.map_or(SINGLE_TRIGGER_CONFIDENCE, |r| r.confidence)
        } else {
            SINGLE_TRIGGER_CONFIDENCE
        };

        let event = AlertEvent::new(
            modalities,
            risk_level,
            confidence,
            compose_message(modalities, risk_level),
        );
        info!(
            alert_id = %event.id(),
            modalities = %modalities,
            risk_level = %risk_level,
            confidence = event.confidence(),
            "alert emitted"
        );

        state.history.push(event.clone());
        state.suppressed_until = Some(now + self.config.cooldown);
        Some(event)
    }

    /// Snapshot of retained alerts, oldest first.
    pub fn history(&self) -> Vec<AlertEvent> {
        self.state.lock().history.snapshot()
    }

    /// Number of retained alerts.
    pub fn history_len(&self) -> usize {
        self.state.lock().history.len()
    }

    /// Clear history and cooldown, returning to the armed state.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.suppressed_until = None;
        state.history = AlertHistory::new(self.config.history_capacity);
    }
}

fn compose_message(modalities: ModalitySet, risk_level: RiskLevel) -> String {
    use crate::domain::TriggerModality::{Audio, Gesture, Visual};

    let headline = if modalities.count() >= 2 {
        "EMERGENCY: multiple distress signals detected"
    } else if modalities.contains(Visual) {
        "FALL DETECTED: fall-consistent posture observed"
    } else if modalities.contains(Audio) {
        "HELP REQUESTED: help keyword heard"
    } else if modalities.contains(Gesture) {
        "EMERGENCY GESTURE: distress gesture observed"
    } else {
        "ALERT"
    };

    format!("{headline} [{modalities}]. {}", risk_level.recommendation())
}
