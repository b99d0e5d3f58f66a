//! Domain types for the perception and fusion engine.
//!
//! Value objects shared by every layer: canonical landmarks, pose
//! observations, risk assessments, alert events, and captured frames.
//! All mutable state lives in the owning components, not here.

pub mod alert;
pub mod frame;
pub mod landmark;
pub mod observation;
pub mod risk;

pub use alert::{AlertEvent, AlertId, ModalitySet, TriggerModality};
pub use frame::{Frame, FrameError};
pub use landmark::{
    Landmark, CORE_INDICES, CORE_VISIBILITY, LANDMARK_COUNT, VISIBLE_THRESHOLD,
};
pub use observation::{BackendId, PoseObservation};
pub use risk::{RiskAssessment, RiskLevel, RiskThresholds, ThresholdError};
