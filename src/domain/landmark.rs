//! Canonical 33-point body landmark schema.
//!
//! Every backend, regardless of its native output shape, is normalized into
//! this fixed-index schema in [0,1] image space before any downstream
//! processing sees it.

/// Number of landmarks in the canonical schema.
pub const LANDMARK_COUNT: usize = 33;

/// Named indices into the canonical landmark schema.
pub mod index {
    /// Nose tip
    pub const NOSE: usize = 0;
    /// Left eye, inner corner
    pub const LEFT_EYE_INNER: usize = 1;
    /// Left eye, center
    pub const LEFT_EYE: usize = 2;
    /// Left eye, outer corner
    pub const LEFT_EYE_OUTER: usize = 3;
    /// Right eye, inner corner
    pub const RIGHT_EYE_INNER: usize = 4;
    /// Right eye, center
    pub const RIGHT_EYE: usize = 5;
    /// Right eye, outer corner
    pub const RIGHT_EYE_OUTER: usize = 6;
    /// Left ear
    pub const LEFT_EAR: usize = 7;
    /// Right ear
    pub const RIGHT_EAR: usize = 8;
    /// Left mouth corner
    pub const MOUTH_LEFT: usize = 9;
    /// Right mouth corner
    pub const MOUTH_RIGHT: usize = 10;
    /// Left shoulder
    pub const LEFT_SHOULDER: usize = 11;
    /// Right shoulder
    pub const RIGHT_SHOULDER: usize = 12;
    /// Left elbow
    pub const LEFT_ELBOW: usize = 13;
    /// Right elbow
    pub const RIGHT_ELBOW: usize = 14;
    /// Left wrist
    pub const LEFT_WRIST: usize = 15;
    /// Right wrist
    pub const RIGHT_WRIST: usize = 16;
    /// Left pinky knuckle
    pub const LEFT_PINKY: usize = 17;
    /// Right pinky knuckle
    pub const RIGHT_PINKY: usize = 18;
    /// Left index knuckle
    pub const LEFT_INDEX: usize = 19;
    /// Right index knuckle
    pub const RIGHT_INDEX: usize = 20;
    /// Left thumb knuckle
    pub const LEFT_THUMB: usize = 21;
    /// Right thumb knuckle
    pub const RIGHT_THUMB: usize = 22;
    /// Left hip
    pub const LEFT_HIP: usize = 23;
    /// Right hip
    pub const RIGHT_HIP: usize = 24;
    /// Left knee
    pub const LEFT_KNEE: usize = 25;
    /// Right knee
    pub const RIGHT_KNEE: usize = 26;
    /// Left ankle
    pub const LEFT_ANKLE: usize = 27;
    /// Right ankle
    pub const RIGHT_ANKLE: usize = 28;
    /// Left heel
    pub const LEFT_HEEL: usize = 29;
    /// Right heel
    pub const RIGHT_HEEL: usize = 30;
    /// Left foot index (toe)
    pub const LEFT_FOOT_INDEX: usize = 31;
    /// Right foot index (toe)
    pub const RIGHT_FOOT_INDEX: usize = 32;
}

/// Indices that must be present with minimum visibility for an observation
/// to pass the structural-validity gate.
pub const CORE_INDICES: [usize; 9] = [
    index::NOSE,
    index::LEFT_SHOULDER,
    index::RIGHT_SHOULDER,
    index::LEFT_HIP,
    index::RIGHT_HIP,
    index::LEFT_KNEE,
    index::RIGHT_KNEE,
    index::LEFT_ANKLE,
    index::RIGHT_ANKLE,
];

/// Minimum visibility for a core landmark to count as structurally present.
pub const CORE_VISIBILITY: f64 = 0.1;

/// Visibility above which a landmark counts as "visible" for selection
/// tie-breaking and diagnostics.
pub const VISIBLE_THRESHOLD: f64 = 0.5;

/// A single body keypoint in canonical normalized image space.
///
/// Created exclusively by payload normalization and immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Landmark {
    /// Index into the canonical schema (0..33)
    pub index: u8,
    /// Horizontal position in [0,1]
    pub x: f64,
    /// Vertical position in [0,1]
    pub y: f64,
    /// Detection visibility in [0,1]
    pub visibility: f64,
}

impl Landmark {
    /// Create a landmark, clamping coordinates and visibility into range.
    ///
    /// Coordinates outside the image are clamped to the nearest edge rather
    /// than discarded.
    pub fn clamped(index: u8, x: f64, y: f64, visibility: f64) -> Self {
        Self {
            index,
            x: x.clamp(0.0, 1.0),
            y: y.clamp(0.0, 1.0),
            visibility: visibility.clamp(0.0, 1.0),
        }
    }

    /// Whether this landmark meets the given visibility threshold.
    pub fn is_visible(&self, threshold: f64) -> bool {
        self.visibility >= threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamped_keeps_in_range() {
        let lm = Landmark::clamped(0, -0.2, 1.7, 2.0);
        assert_eq!(lm.x, 0.0);
        assert_eq!(lm.y, 1.0);
        assert_eq!(lm.visibility, 1.0);
    }

    #[test]
    fn test_core_indices_within_schema() {
        for idx in CORE_INDICES {
            assert!(idx < LANDMARK_COUNT);
        }
    }

    #[test]
    fn test_visibility_gate() {
        let lm = Landmark::clamped(11, 0.5, 0.5, 0.25);
        assert!(lm.is_visible(0.1));
        assert!(!lm.is_visible(0.3));
    }
}
