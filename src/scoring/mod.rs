//! Kinematic fall-risk scoring.
//!
//! A pure mapping from one canonical pose observation to a risk assessment:
//! the torso vector between the shoulder midpoint and hip midpoint is
//! measured against the vertical, and the resulting lean angle is classified
//! by the configured thresholds. Identical landmarks and thresholds always
//! produce identical output.

use crate::domain::landmark::index;
use crate::domain::{PoseObservation, RiskAssessment, RiskThresholds};

/// Minimum visibility required on each of the four torso landmarks
/// (shoulders and hips) for the angle to be trusted.
pub const TORSO_VISIBILITY: f64 = 0.3;

/// Stateless scorer holding the configured thresholds.
#[derive(Debug, Clone)]
pub struct RiskScorer {
    thresholds: RiskThresholds,
}

impl RiskScorer {
    /// Create a scorer. Thresholds are assumed validated by the engine
    /// configuration.
    pub fn new(thresholds: RiskThresholds) -> Self {
        Self { thresholds }
    }

    /// The thresholds in use.
    pub fn thresholds(&self) -> &RiskThresholds {
        &self.thresholds
    }

    /// Score one observation.
    ///
    /// Returns an `Unknown` assessment when the observation carries no
    /// landmarks or any torso landmark is below [`TORSO_VISIBILITY`].
    pub fn score(&self, observation: &PoseObservation) -> RiskAssessment {
        let source = observation.backend().cloned();
        let Some(landmarks) = observation.landmarks() else {
            return RiskAssessment::unknown(source);
        };

        let left_shoulder = &landmarks[index::LEFT_SHOULDER];
        let right_shoulder = &landmarks[index::RIGHT_SHOULDER];
        let left_hip = &landmarks[index::LEFT_HIP];
        let right_hip = &landmarks[index::RIGHT_HIP];

        let torso_visible = [left_shoulder, right_shoulder, left_hip, right_hip]
            .iter()
            .all(|lm| lm.is_visible(TORSO_VISIBILITY));
        if !torso_visible {
            return RiskAssessment::unknown(source);
        }

        let shoulder_mid_x = (left_shoulder.x + right_shoulder.x) / 2.0;
        let shoulder_mid_y = (left_shoulder.y + right_shoulder.y) / 2.0;
        let hip_mid_x = (left_hip.x + right_hip.x) / 2.0;
        let hip_mid_y = (left_hip.y + right_hip.y) / 2.0;

        let dx = (hip_mid_x - shoulder_mid_x).abs();
        let dy = (hip_mid_y - shoulder_mid_y).abs();
        let angle = dx.atan2(dy).to_degrees().clamp(0.0, 90.0);

        let risk_level = self.thresholds.classify(angle);
        let confidence = (angle / self.thresholds.critical).min(1.0);

        RiskAssessment {
            body_angle_degrees: angle,
            risk_level,
            confidence,
            source_backend: source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::landmark::{Landmark, LANDMARK_COUNT};
    use crate::domain::{BackendId, RiskLevel};
    use std::time::{Duration, Instant};

    /// Build an observation whose torso leans by the given angle.
    fn leaning_observation(lean_degrees: f64, torso_visibility: f64) -> PoseObservation {
        let mut landmarks = [Landmark::clamped(0, 0.5, 0.5, 0.9); LANDMARK_COUNT];
        for (i, lm) in landmarks.iter_mut().enumerate() {
            lm.index = i as u8;
        }

        let theta = lean_degrees.to_radians();
        let torso = 0.2;
        let (hip_cx, hip_cy) = (0.5, 0.65);
        let shoulder_cx = hip_cx + torso * theta.sin();
        let shoulder_cy = hip_cy - torso * theta.cos();

        for (idx, x, y) in [
            (index::LEFT_SHOULDER, shoulder_cx - 0.1, shoulder_cy),
            (index::RIGHT_SHOULDER, shoulder_cx + 0.1, shoulder_cy),
            (index::LEFT_HIP, hip_cx - 0.08, hip_cy),
            (index::RIGHT_HIP, hip_cx + 0.08, hip_cy),
        ] {
            landmarks[idx] = Landmark::clamped(idx as u8, x, y, torso_visibility);
        }

        PoseObservation::detected(
            Box::new(landmarks),
            BackendId::new("test"),
            Instant::now(),
            Duration::from_millis(5),
        )
    }

    #[test]
    fn test_upright_is_normal() {
        let scorer = RiskScorer::new(RiskThresholds::default());
        let assessment = scorer.score(&leaning_observation(0.0, 0.9));
        assert_eq!(assessment.risk_level, RiskLevel::Normal);
        assert!(assessment.body_angle_degrees < 1.0);
    }

    #[test]
    fn test_35_degree_lean_is_critical_with_full_confidence() {
        let scorer = RiskScorer::new(RiskThresholds::default());
        let assessment = scorer.score(&leaning_observation(35.0, 0.9));
        assert_eq!(assessment.risk_level, RiskLevel::Critical);
        assert!((assessment.body_angle_degrees - 35.0).abs() < 0.5);
        assert_eq!(assessment.confidence, 1.0);
    }

    #[test]
    fn test_confidence_scales_with_angle() {
        let scorer = RiskScorer::new(RiskThresholds::default());
        let assessment = scorer.score(&leaning_observation(15.0, 0.9));
        assert_eq!(assessment.risk_level, RiskLevel::Caution);
        assert!((assessment.confidence - 15.0 / 30.0).abs() < 0.02);
    }

    #[test]
    fn test_no_observation_is_unknown() {
        let scorer = RiskScorer::new(RiskThresholds::default());
        let obs = PoseObservation::none(
            BackendId::new("test"),
            Instant::now(),
            Duration::ZERO,
        );
        let assessment = scorer.score(&obs);
        assert_eq!(assessment.risk_level, RiskLevel::Unknown);
        assert_eq!(assessment.confidence, 0.0);
        assert_eq!(assessment.body_angle_degrees, 0.0);
    }

    #[test]
    fn test_dim_torso_is_unknown() {
        let scorer = RiskScorer::new(RiskThresholds::default());
        let assessment = scorer.score(&leaning_observation(35.0, 0.2));
        assert_eq!(assessment.risk_level, RiskLevel::Unknown);
    }

    #[test]
    fn test_angle_within_bounds_and_monotonic() {
        let scorer = RiskScorer::new(RiskThresholds::default());
        let mut previous_level = RiskLevel::Unknown;
        for lean in [0.0, 5.0, 12.0, 22.0, 45.0, 80.0, 90.0] {
            let assessment = scorer.score(&leaning_observation(lean, 0.9));
            assert!((0.0..=90.0).contains(&assessment.body_angle_degrees));
            assert!(assessment.risk_level >= previous_level);
            previous_level = assessment.risk_level;
        }
    }

    #[test]
    fn test_deterministic() {
        let scorer = RiskScorer::new(RiskThresholds::default());
        let obs = leaning_observation(27.0, 0.9);
        assert_eq!(scorer.score(&obs), scorer.score(&obs));
    }
}
