//! Risk levels, thresholds, and assessments derived from pose observations.

use super::observation::BackendId;

/// Ordered fall-risk classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RiskLevel {
    /// No usable pose signal
    Unknown,
    /// Posture within normal range
    Normal,
    /// Mild body lean
    Caution,
    /// Pronounced body lean
    Elevated,
    /// Fall-consistent posture
    Critical,
}

impl RiskLevel {
    /// Safety recommendation associated with this level.
    pub fn recommendation(&self) -> &'static str {
        match self {
            RiskLevel::Unknown => {
                "Monitoring degraded. Check camera placement and lighting."
            }
            RiskLevel::Normal => "Posture normal. No action needed.",
            RiskLevel::Caution => "Slight lean detected. Keep support within reach.",
            RiskLevel::Elevated => {
                "Pronounced lean detected. Slow down and check surroundings."
            }
            RiskLevel::Critical => {
                "Fall-consistent posture detected. Immediate check-in recommended."
            }
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Unknown => write!(f, "UNKNOWN"),
            RiskLevel::Normal => write!(f, "NORMAL"),
            RiskLevel::Caution => write!(f, "CAUTION"),
            RiskLevel::Elevated => write!(f, "ELEVATED"),
            RiskLevel::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Error raised when risk thresholds fail validation.
#[derive(Debug, thiserror::Error)]
pub enum ThresholdError {
    /// A threshold is outside the valid [0,90] degree range
    #[error("threshold `{name}` is {value}°, outside the valid range [0, 90]")]
    OutOfRange {
        /// Threshold name
        name: &'static str,
        /// Offending value
        value: f64,
    },

    /// Thresholds are not strictly increasing
    #[error(
        "thresholds must be strictly increasing: caution {caution}° < elevated {elevated}° < critical {critical}°"
    )]
    NotIncreasing {
        /// Caution threshold
        caution: f64,
        /// Elevated threshold
        elevated: f64,
        /// Critical threshold
        critical: f64,
    },
}

/// Body-angle thresholds (degrees) separating the risk levels.
///
/// Defaults are demo-tuned, not clinically validated; they are kept
/// configurable for that reason.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RiskThresholds {
    /// Angle at or above which risk is at least Caution
    pub caution: f64,
    /// Angle at or above which risk is at least Elevated
    pub elevated: f64,
    /// Angle at or above which risk is Critical
    pub critical: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            caution: 10.0,
            elevated: 20.0,
            critical: 30.0,
        }
    }
}

impl RiskThresholds {
    /// Validate range and monotonicity.
    ///
    /// Invalid thresholds are the one configuration error class that is
    /// fatal to setup, so this is checked synchronously at build time.
    pub fn validate(&self) -> Result<(), ThresholdError> {
        for (name, value) in [
            ("caution", self.caution),
            ("elevated", self.elevated),
            ("critical", self.critical),
        ] {
            if !value.is_finite() || !(0.0..=90.0).contains(&value) {
                return Err(ThresholdError::OutOfRange { name, value });
            }
        }
        if !(self.caution < self.elevated && self.elevated < self.critical) {
            return Err(ThresholdError::NotIncreasing {
                caution: self.caution,
                elevated: self.elevated,
                critical: self.critical,
            });
        }
        Ok(())
    }

    /// Map a body angle to its risk level.
    pub fn classify(&self, angle_degrees: f64) -> RiskLevel {
        if angle_degrees >= self.critical {
            RiskLevel::Critical
        } else if angle_degrees >= self.elevated {
            RiskLevel::Elevated
        } else if angle_degrees >= self.caution {
            RiskLevel::Caution
        } else {
            RiskLevel::Normal
        }
    }
}

/// Result of scoring one pose observation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RiskAssessment {
    /// Body lean angle in [0,90] degrees
    pub body_angle_degrees: f64,
    /// Classified risk level
    pub risk_level: RiskLevel,
    /// Confidence in [0,1]
    pub confidence: f64,
    /// Backend that produced the underlying observation
    pub source_backend: Option<BackendId>,
}

impl RiskAssessment {
    /// Assessment for a frame with no usable pose signal.
    pub fn unknown(source_backend: Option<BackendId>) -> Self {
        Self {
            body_angle_degrees: 0.0,
            risk_level: RiskLevel::Unknown,
            confidence: 0.0,
            source_backend,
        }
    }

    /// Whether this assessment indicates a fall-consistent posture.
    pub fn is_critical(&self) -> bool {
        self.risk_level == RiskLevel::Critical
    }
}
