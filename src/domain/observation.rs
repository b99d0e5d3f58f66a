//! Canonical pose observations produced by backend normalization.

use std::time::{Duration, Instant};

use super::landmark::{Landmark, LANDMARK_COUNT, VISIBLE_THRESHOLD};

/// Identifier for a registered detection backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BackendId(String);

impl BackendId {
    /// Create a backend identifier
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the backend name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BackendId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BackendId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// One frame's worth of normalized pose data.
///
/// Invariant: when landmarks are present there are exactly
/// [`LANDMARK_COUNT`] of them. A `None` landmark set is the canonical
/// "no detection" signal; a zero-filled array is never produced.
///
/// Observations are produced once per frame by the selected backend and
/// consumed immediately by the risk scorer; they are not retained.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseObservation {
    landmarks: Option<Box<[Landmark; LANDMARK_COUNT]>>,
    backend: Option<BackendId>,
    captured_at: Instant,
    latency: Duration,
}

impl PoseObservation {
    /// Create an observation carrying a full landmark set.
    pub fn detected(
        landmarks: Box<[Landmark; LANDMARK_COUNT]>,
        backend: BackendId,
        captured_at: Instant,
        latency: Duration,
    ) -> Self {
        Self {
            landmarks: Some(landmarks),
            backend: Some(backend),
            captured_at,
            latency,
        }
    }

    /// Create a "no detection" observation attributed to a backend.
    pub fn none(backend: BackendId, captured_at: Instant, latency: Duration) -> Self {
        Self {
            landmarks: None,
            backend: Some(backend),
            captured_at,
            latency,
        }
    }

    /// Create a "no detection" observation with no attributable backend
    /// (every backend disabled or failing).
    pub fn unattributed(captured_at: Instant) -> Self {
        Self {
            landmarks: None,
            backend: None,
            captured_at,
            latency: Duration::ZERO,
        }
    }

    /// Whether this observation carries landmarks.
    pub fn is_detection(&self) -> bool {
        self.landmarks.is_some()
    }

    /// The landmark set, if detected.
    pub fn landmarks(&self) -> Option<&[Landmark; LANDMARK_COUNT]> {
        self.landmarks.as_deref()
    }

    /// Landmark at a canonical index, if detected.
    pub fn landmark(&self, index: usize) -> Option<&Landmark> {
        self.landmarks.as_deref().and_then(|l| l.get(index))
    }

    /// The backend that produced this observation, if any.
    pub fn backend(&self) -> Option<&BackendId> {
        self.backend.as_ref()
    }

    /// Monotonic capture timestamp.
    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    /// Backend inference latency for this observation.
    pub fn latency(&self) -> Duration {
        self.latency
    }

    /// Count of landmarks at or above [`VISIBLE_THRESHOLD`].
    ///
    /// Used by sticky re-probing to pick the richest observation.
    pub fn visible_count(&self) -> usize {
        self.landmarks
            .as_deref()
            .map(|l| l.iter().filter(|lm| lm.is_visible(VISIBLE_THRESHOLD)).count())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_set(visibility: f64) -> Box<[Landmark; LANDMARK_COUNT]> {
        let mut landmarks = [Landmark::clamped(0, 0.5, 0.5, visibility); LANDMARK_COUNT];
        for (i, lm) in landmarks.iter_mut().enumerate() {
            lm.index = i as u8;
        }
        Box::new(landmarks)
    }

    #[test]
    fn test_none_observation_has_no_landmarks() {
        let obs = PoseObservation::none(
            BackendId::new("test"),
            Instant::now(),
            Duration::from_millis(4),
        );
        assert!(!obs.is_detection());
        assert_eq!(obs.visible_count(), 0);
        assert_eq!(obs.backend().map(BackendId::as_str), Some("test"));
    }

    #[test]
    fn test_visible_count_respects_threshold() {
        let obs = PoseObservation::detected(
            full_set(0.9),
            BackendId::new("test"),
            Instant::now(),
            Duration::from_millis(4),
        );
        assert_eq!(obs.visible_count(), LANDMARK_COUNT);

        let dim = PoseObservation::detected(
            full_set(0.2),
            BackendId::new("test"),
            Instant::now(),
            Duration::from_millis(4),
        );
        assert_eq!(dim.visible_count(), 0);
    }

    #[test]
    fn test_unattributed_observation() {
        let obs = PoseObservation::unattributed(Instant::now());
        assert!(obs.backend().is_none());
        assert!(!obs.is_detection());
    }
}
