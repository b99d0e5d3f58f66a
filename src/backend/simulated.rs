//! Deterministic synthetic backend for demos and tests.

use crate::domain::landmark::{index, LANDMARK_COUNT};
use crate::domain::Frame;

use super::{BackendError, PoseBackend, RawLandmark, RawPosePayload};

/// Backend that synthesizes a plausible standing pose with a configurable
/// body lean, without any model inference.
///
/// Output is fully deterministic: the same configuration always yields the
/// same landmark list, which makes it suitable for exercising the scoring
/// and fusion paths end to end.
#[derive(Debug, Clone)]
pub struct SimulatedBackend {
    name: String,
    lean_degrees: f64,
    visibility: f64,
}

impl SimulatedBackend {
    /// Create a simulated backend producing an upright pose.
    pub fn upright(name: impl Into<String>) -> Self {
        Self::with_lean(name, 0.0)
    }

    /// Create a simulated backend whose torso leans by `lean_degrees`.
    pub fn with_lean(name: impl Into<String>, lean_degrees: f64) -> Self {
        Self {
            name: name.into(),
            lean_degrees: lean_degrees.clamp(0.0, 90.0),
            visibility: 0.9,
        }
    }

    /// Override the uniform landmark visibility (default 0.9).
    pub fn with_visibility(mut self, visibility: f64) -> Self {
        self.visibility = visibility.clamp(0.0, 1.0);
        self
    }

    fn standing_pose(&self) -> Vec<RawLandmark> {
        let vis = self.visibility;
        let lm = |x: f64, y: f64| RawLandmark {
            x,
            y,
            visibility: vis,
        };

        // Hip-centered skeleton; the torso is tilted so that the
        // shoulder-mid -> hip-mid vector forms the configured lean angle
        // with the vertical.
        let (hip_cx, hip_cy) = (0.5, 0.65);
        let torso = 0.20;
        let theta = self.lean_degrees.to_radians();
        let (shoulder_cx, shoulder_cy) = (hip_cx + torso * theta.sin(), hip_cy - torso * theta.cos());
        let (head_cx, head_cy) = (shoulder_cx, shoulder_cy - 0.12);

        let mut pose = vec![lm(hip_cx, hip_cy); LANDMARK_COUNT];
        pose[index::NOSE] = lm(head_cx, head_cy);
        pose[index::LEFT_EYE_INNER] = lm(head_cx - 0.02, head_cy - 0.01);
        pose[index::LEFT_EYE] = lm(head_cx - 0.04, head_cy - 0.01);
        pose[index::LEFT_EYE_OUTER] = lm(head_cx - 0.06, head_cy - 0.01);
        pose[index::RIGHT_EYE_INNER] = lm(head_cx + 0.02, head_cy - 0.01);
        pose[index::RIGHT_EYE] = lm(head_cx + 0.04, head_cy - 0.01);
        pose[index::RIGHT_EYE_OUTER] = lm(head_cx + 0.06, head_cy - 0.01);
        pose[index::LEFT_EAR] = lm(head_cx - 0.08, head_cy + 0.01);
        pose[index::RIGHT_EAR] = lm(head_cx + 0.08, head_cy + 0.01);
        pose[index::MOUTH_LEFT] = lm(head_cx - 0.03, head_cy + 0.03);
        pose[index::MOUTH_RIGHT] = lm(head_cx + 0.03, head_cy + 0.03);
        pose[index::LEFT_SHOULDER] = lm(shoulder_cx - 0.15, shoulder_cy);
        pose[index::RIGHT_SHOULDER] = lm(shoulder_cx + 0.15, shoulder_cy);
        pose[index::LEFT_ELBOW] = lm(shoulder_cx - 0.18, shoulder_cy + 0.10);
        pose[index::RIGHT_ELBOW] = lm(shoulder_cx + 0.18, shoulder_cy + 0.10);
        pose[index::LEFT_WRIST] = lm(shoulder_cx - 0.20, shoulder_cy + 0.20);
        pose[index::RIGHT_WRIST] = lm(shoulder_cx + 0.20, shoulder_cy + 0.20);
        pose[index::LEFT_PINKY] = lm(shoulder_cx - 0.22, shoulder_cy + 0.23);
        pose[index::RIGHT_PINKY] = lm(shoulder_cx + 0.22, shoulder_cy + 0.23);
        pose[index::LEFT_INDEX] = lm(shoulder_cx - 0.21, shoulder_cy + 0.22);
        pose[index::RIGHT_INDEX] = lm(shoulder_cx + 0.21, shoulder_cy + 0.22);
        pose[index::LEFT_THUMB] = lm(shoulder_cx - 0.20, shoulder_cy + 0.21);
        pose[index::RIGHT_THUMB] = lm(shoulder_cx + 0.20, shoulder_cy + 0.21);
        pose[index::LEFT_HIP] = lm(hip_cx - 0.10, hip_cy);
        pose[index::RIGHT_HIP] = lm(hip_cx + 0.10, hip_cy);
        pose[index::LEFT_KNEE] = lm(hip_cx - 0.12, hip_cy + 0.18);
        pose[index::RIGHT_KNEE] = lm(hip_cx + 0.12, hip_cy + 0.18);
        pose[index::LEFT_ANKLE] = lm(hip_cx - 0.10, hip_cy + 0.32);
        pose[index::RIGHT_ANKLE] = lm(hip_cx + 0.10, hip_cy + 0.32);
        pose[index::LEFT_HEEL] = lm(hip_cx - 0.11, hip_cy + 0.34);
        pose[index::RIGHT_HEEL] = lm(hip_cx + 0.11, hip_cy + 0.34);
        pose[index::LEFT_FOOT_INDEX] = lm(hip_cx - 0.09, hip_cy + 0.35);
        pose[index::RIGHT_FOOT_INDEX] = lm(hip_cx + 0.09, hip_cy + 0.35);
        pose
    }
}

impl PoseBackend for SimulatedBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn detect(&self, _frame: &Frame) -> Result<RawPosePayload, BackendError> {
        Ok(RawPosePayload::LandmarkList(self.standing_pose()))
    }
}
