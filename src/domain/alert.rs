//! Alert events emitted by the fusion state machine.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::risk::RiskLevel;

/// Unique identifier for an alert event
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AlertId(Uuid);

impl AlertId {
    /// Create a new random alert ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AlertId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AlertId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One of the independent trigger sources that can cause an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TriggerModality {
    /// Fall-consistent posture from the pose pipeline
    Visual,
    /// Help-keyword detection from the audio stream
    Audio,
    /// Emergency gesture detection
    Gesture,
}

impl std::fmt::Display for TriggerModality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerModality::Visual => write!(f, "visual"),
            TriggerModality::Audio => write!(f, "audio"),
            TriggerModality::Gesture => write!(f, "gesture"),
        }
    }
}

/// Subset of trigger modalities that were active when an alert fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModalitySet {
    visual: bool,
    audio: bool,
    gesture: bool,
}

impl ModalitySet {
    /// Build a set from the three trigger booleans.
    pub fn new(visual: bool, audio: bool, gesture: bool) -> Self {
        Self {
            visual,
            audio,
            gesture,
        }
    }

    /// Whether a modality is in the set.
    pub fn contains(&self, modality: TriggerModality) -> bool {
        match modality {
            TriggerModality::Visual => self.visual,
            TriggerModality::Audio => self.audio,
            TriggerModality::Gesture => self.gesture,
        }
    }

    /// Whether any modality is set.
    pub fn any(&self) -> bool {
        self.visual || self.audio || self.gesture
    }

    /// Number of active modalities.
    pub fn count(&self) -> usize {
        usize::from(self.visual) + usize::from(self.audio) + usize::from(self.gesture)
    }

    /// Union with another set.
    pub fn merge(&mut self, other: ModalitySet) {
        self.visual |= other.visual;
        self.audio |= other.audio;
        self.gesture |= other.gesture;
    }

    /// Iterate over the active modalities in fixed order.
    pub fn iter(&self) -> impl Iterator<Item = TriggerModality> + '_ {
        [
            (self.visual, TriggerModality::Visual),
            (self.audio, TriggerModality::Audio),
            (self.gesture, TriggerModality::Gesture),
        ]
        .into_iter()
        .filter_map(|(active, modality)| active.then_some(modality))
    }
}

impl std::fmt::Display for ModalitySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for modality in self.iter() {
            if !first {
                write!(f, "+")?;
            }
            write!(f, "{}", modality)?;
            first = false;
        }
        if first {
            write!(f, "none")?;
        }
        Ok(())
    }
}

/// An emitted alert.
///
/// Created only by the fusion state machine and appended to the bounded
/// alert history. Immutable after creation, except that the fusion machine
/// may widen the modality set of the most recent event while suppressed
/// (diagnostics only; the event is never duplicated).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AlertEvent {
    id: AlertId,
    timestamp: DateTime<Utc>,
    modalities: ModalitySet,
    risk_level: RiskLevel,
    confidence: f64,
    message: String,
}

impl AlertEvent {
    /// Create a new alert event timestamped now.
    pub fn new(
        modalities: ModalitySet,
        risk_level: RiskLevel,
        confidence: f64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: AlertId::new(),
            timestamp: Utc::now(),
            modalities,
            risk_level,
            confidence: confidence.clamp(0.0, 1.0),
            message: message.into(),
        }
    }

    /// Alert identifier
    pub fn id(&self) -> &AlertId {
        &self.id
    }

    /// Wall-clock emission time
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Modalities active at emission (possibly widened during cooldown)
    pub fn modalities(&self) -> ModalitySet {
        self.modalities
    }

    /// Risk level recorded with the alert
    pub fn risk_level(&self) -> RiskLevel {
        self.risk_level
    }

    /// Alert confidence in [0,1]
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Human-readable alert message
    pub fn message(&self) -> &str {
        &self.message
    }

    pub(crate) fn merge_modalities(&mut self, other: ModalitySet) {
        self.modalities.merge(other);
    }
}
