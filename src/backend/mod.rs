//! Detection backends and the normalization boundary.
//!
//! Backends are opaque "detect pose" functions returning backend-native
//! payloads. This module translates those payloads into canonical
//! observations, tracks per-backend reliability, and drives failover:
//!
//! - [`PoseBackend`] — fixed-capability interface every backend implements
//! - [`RawPosePayload`] — closed set of native output shapes
//! - [`normalize`] — payload → canonical landmarks, never panics
//! - [`BackendRegistry`] — ordered adapter table with sticky/priority
//!   selection and `Active → Degraded → Disabled` reliability states

mod normalize;
mod registry;
mod simulated;
mod stats;

pub use normalize::{normalize, BoundingBox, CoordinateSpace, RawKeypoint, RawLandmark};
pub use registry::{BackendRegistry, BackendState, RegistryConfig, SelectionPolicy};
pub use simulated::SimulatedBackend;
pub use stats::BackendStats;

use crate::domain::Frame;

/// Error surfaced by a backend's inference call.
///
/// These never propagate past the registry: every variant is converted to a
/// "no observation" result and recorded as a failed attempt.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Model inference failed
    #[error("inference failed: {0}")]
    Inference(String),

    /// Backend is not ready (model handle missing, device gone)
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// A pose detection backend.
///
/// Implementations are stateless between calls apart from their internal
/// model handle. `detect` may block on inference; the registry only invokes
/// it from frame-worker threads.
pub trait PoseBackend: Send + Sync {
    /// Stable backend name, used as its identifier and in diagnostics.
    fn name(&self) -> &str;

    /// Run inference on a frame, returning the backend-native payload.
    fn detect(&self, frame: &Frame) -> Result<RawPosePayload, BackendError>;
}

/// Closed set of backend-native output shapes.
///
/// Modeled explicitly rather than shape-sniffed; normalization matches
/// exhaustively on this enum.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPosePayload {
    /// Backend produced no detection
    Empty,
    /// Parallel coordinate/score arrays (pixel or pre-normalized space)
    CoordinateArrays {
        /// (x, y) pairs, one per canonical index
        points: Vec<(f64, f64)>,
        /// Per-point confidence scores
        scores: Vec<f64>,
        /// Coordinate convention of `points`
        space: CoordinateSpace,
    },
    /// Bounding box plus keypoints expressed relative to the box
    BoxKeypoints {
        /// Detection box in pixel coordinates
        bbox: BoundingBox,
        /// Box-relative keypoints in [0,1] box space
        keypoints: Vec<RawKeypoint>,
    },
    /// Structured landmark list with per-point visibility, in [0,1] space
    LandmarkList(Vec<RawLandmark>),
}
