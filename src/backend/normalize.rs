//! Payload normalization into canonical landmark space.

use crate::domain::landmark::{Landmark, CORE_INDICES, CORE_VISIBILITY, LANDMARK_COUNT};

use super::RawPosePayload;

/// Coordinate convention of a [`RawPosePayload::CoordinateArrays`] payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateSpace {
    /// Already normalized to [0,1] image space
    Normalized,
    /// Absolute pixel coordinates
    Pixel,
}

/// Detection bounding box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Left edge (pixels)
    pub x: f64,
    /// Top edge (pixels)
    pub y: f64,
    /// Box width (pixels)
    pub width: f64,
    /// Box height (pixels)
    pub height: f64,
}

/// A keypoint expressed relative to its detection box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawKeypoint {
    /// Horizontal position in [0,1] box space
    pub x: f64,
    /// Vertical position in [0,1] box space
    pub y: f64,
    /// Detection score in [0,1]
    pub score: f64,
}

/// A landmark as emitted by a structured-list backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawLandmark {
    /// Horizontal position, nominally [0,1]
    pub x: f64,
    /// Vertical position, nominally [0,1]
    pub y: f64,
    /// Per-point visibility in [0,1]
    pub visibility: f64,
}

/// Normalize a backend-native payload into the canonical landmark array.
///
/// Pixel coordinates are divided by the frame dimensions; coordinates
/// outside the image are clamped to the nearest edge rather than discarded.
/// Returns `None` — never panics — for any malformed input: wrong arity,
/// empty payload, non-finite values, zero frame dimensions, or an
/// observation that fails the structural-validity gate (all of
/// [`CORE_INDICES`] present with visibility ≥ [`CORE_VISIBILITY`]).
pub fn normalize(
    payload: &RawPosePayload,
    frame_width: u32,
    frame_height: u32,
) -> Option<Box<[Landmark; LANDMARK_COUNT]>> {
    if frame_width == 0 || frame_height == 0 {
        return None;
    }
    let fw = frame_width as f64;
    let fh = frame_height as f64;

    let landmarks: Vec<Landmark> = match payload {
        RawPosePayload::Empty => return None,

        RawPosePayload::CoordinateArrays {
            points,
            scores,
            space,
        } => {
            if points.len() != LANDMARK_COUNT || scores.len() != LANDMARK_COUNT {
                return None;
            }
            points
                .iter()
                .zip(scores)
                .enumerate()
                .map(|(i, (&(x, y), &score))| {
                    let (x, y) = match space {
                        CoordinateSpace::Normalized => (x, y),
                        CoordinateSpace::Pixel => (x / fw, y / fh),
                    };
                    finite(x, y, score)
                        .map(|(x, y, score)| Landmark::clamped(i as u8, x, y, score))
                })
                .collect::<Option<_>>()?
        }

        RawPosePayload::BoxKeypoints { bbox, keypoints } => {
            if keypoints.len() != LANDMARK_COUNT
                || !bbox.width.is_finite()
                || !bbox.height.is_finite()
                || bbox.width <= 0.0
                || bbox.height <= 0.0
            {
                return None;
            }
            keypoints
                .iter()
                .enumerate()
                .map(|(i, kp)| {
                    let x = (bbox.x + kp.x * bbox.width) / fw;
                    let y = (bbox.y + kp.y * bbox.height) / fh;
                    finite(x, y, kp.score)
                        .map(|(x, y, score)| Landmark::clamped(i as u8, x, y, score))
                })
                .collect::<Option<_>>()?
        }

        RawPosePayload::LandmarkList(raw) => {
            if raw.len() != LANDMARK_COUNT {
                return None;
            }
            raw.iter()
                .enumerate()
                .map(|(i, lm)| {
                    finite(lm.x, lm.y, lm.visibility)
                        .map(|(x, y, vis)| Landmark::clamped(i as u8, x, y, vis))
                })
                .collect::<Option<_>>()?
        }
    };

    let landmarks: Box<[Landmark; LANDMARK_COUNT]> =
        landmarks.into_boxed_slice().try_into().ok()?;

    // Structural-validity gate
    let structurally_valid = CORE_INDICES
        .iter()
        .all(|&idx| landmarks[idx].is_visible(CORE_VISIBILITY));
    structurally_valid.then_some(landmarks)
}

fn finite(x: f64, y: f64, score: f64) -> Option<(f64, f64, f64)> {
    (x.is_finite() && y.is_finite() && score.is_finite()).then_some((x, y, score))
}
