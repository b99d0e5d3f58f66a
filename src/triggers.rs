//! Audio and gesture trigger detectors.
//!
//! These are the non-visual inputs to the fusion machine. Both traits take
//! raw input and answer a single question: did a distress signal occur?
//! Malformed input is an error the engine converts to "no trigger".

use crate::domain::landmark::{index, Landmark, LANDMARK_COUNT};

/// Error raised by a trigger detector on malformed input.
#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    /// The audio buffer was empty
    #[error("empty audio buffer")]
    EmptyBuffer,

    /// The sample rate is not usable
    #[error("invalid sample rate: {0} Hz")]
    InvalidSampleRate(u32),
}

/// Detector for spoken calls for help in a PCM audio buffer.
pub trait HelpKeywordDetector: Send + Sync {
    /// Detector name for diagnostics.
    fn name(&self) -> &str;

    /// Whether the buffer contains a call for help.
    fn detect(&self, pcm: &[i16], sample_rate: u32) -> Result<bool, TriggerError>;
}

/// Help detector based on sustained loudness.
///
/// A stand-in for on-device keyword spotting: a shout registers as RMS
/// energy well above conversational level. Deterministic and dependency-free,
/// which also makes it the detector used in tests.
#[derive(Debug, Clone)]
pub struct EnergySpikeDetector {
    threshold_rms: f64,
}

impl EnergySpikeDetector {
    /// Create a detector firing at the given RMS threshold in [0,1]
    /// full-scale units.
    pub fn new(threshold_rms: f64) -> Self {
        Self {
            threshold_rms: threshold_rms.clamp(0.0, 1.0),
        }
    }
}

impl Default for EnergySpikeDetector {
    fn default() -> Self {
        Self::new(0.35)
    }
}

impl HelpKeywordDetector for EnergySpikeDetector {
    fn name(&self) -> &str {
        "energy-spike"
    }

    fn detect(&self, pcm: &[i16], sample_rate: u32) -> Result<bool, TriggerError> {
        if pcm.is_empty() {
            return Err(TriggerError::EmptyBuffer);
        }
        if sample_rate == 0 {
            return Err(TriggerError::InvalidSampleRate(sample_rate));
        }

        let sum_squares: f64 = pcm
            .iter()
            .map(|&s| {
                let normalized = f64::from(s) / f64::from(i16::MAX);
                normalized * normalized
            })
            .sum();
        let rms = (sum_squares / pcm.len() as f64).sqrt();
        Ok(rms >= self.threshold_rms)
    }
}

/// One gesture-channel input: a canonical landmark set to inspect for an
/// emergency gesture.
#[derive(Debug, Clone)]
pub struct GestureSample {
    landmarks: Box<[Landmark; LANDMARK_COUNT]>,
}

impl GestureSample {
    /// Wrap a canonical landmark set.
    pub fn new(landmarks: Box<[Landmark; LANDMARK_COUNT]>) -> Self {
        Self { landmarks }
    }

    /// The wrapped landmarks.
    pub fn landmarks(&self) -> &[Landmark; LANDMARK_COUNT] {
        &self.landmarks
    }
}

/// Detector for emergency gestures in a pose sample.
pub trait GestureDetector: Send + Sync {
    /// Detector name for diagnostics.
    fn name(&self) -> &str;

    /// Whether the sample shows an emergency gesture.
    fn detect(&self, sample: &GestureSample) -> Result<bool, TriggerError>;
}

/// Gesture detector firing when both hands are raised above the head.
#[derive(Debug, Clone)]
pub struct HandsRaisedDetector {
    min_visibility: f64,
}

impl HandsRaisedDetector {
    /// Create a detector requiring the given visibility on wrists and nose.
    pub fn new(min_visibility: f64) -> Self {
        Self {
            min_visibility: min_visibility.clamp(0.0, 1.0),
        }
    }
}

impl Default for HandsRaisedDetector {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl GestureDetector for HandsRaisedDetector {
    fn name(&self) -> &str {
        "hands-raised"
    }

    fn detect(&self, sample: &GestureSample) -> Result<bool, TriggerError> {
        let landmarks = sample.landmarks();
        let nose = &landmarks[index::NOSE];
        let left_wrist = &landmarks[index::LEFT_WRIST];
        let right_wrist = &landmarks[index::RIGHT_WRIST];

        let all_visible = [nose, left_wrist, right_wrist]
            .iter()
            .all(|lm| lm.is_visible(self.min_visibility));
        if !all_visible {
            return Ok(false);
        }

        // Image y grows downward, so "above the head" is a smaller y.
        Ok(left_wrist.y < nose.y && right_wrist.y < nose.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(amplitude: f64, samples: usize) -> Vec<i16> {
        (0..samples)
            .map(|i| {
                let t = i as f64 / 16_000.0;
                (amplitude * f64::from(i16::MAX) * (2.0 * std::f64::consts::PI * 440.0 * t).sin())
                    as i16
            })
            .collect()
    }

    #[test]
    fn test_loud_audio_fires() {
        let detector = EnergySpikeDetector::default();
        let loud = tone(0.9, 1600);
        assert!(detector.detect(&loud, 16_000).unwrap());
    }

    #[test]
    fn test_quiet_audio_does_not_fire() {
        let detector = EnergySpikeDetector::default();
        let quiet = tone(0.05, 1600);
        assert!(!detector.detect(&quiet, 16_000).unwrap());
    }

    #[test]
    fn test_malformed_audio_is_an_error() {
        let detector = EnergySpikeDetector::default();
        assert!(matches!(
            detector.detect(&[], 16_000),
            Err(TriggerError::EmptyBuffer)
        ));
        assert!(matches!(
            detector.detect(&[0, 1, 2], 0),
            Err(TriggerError::InvalidSampleRate(0))
        ));
    }

    fn pose(wrist_y: f64, nose_y: f64, visibility: f64) -> GestureSample {
        let mut landmarks = [Landmark::clamped(0, 0.5, 0.5, 0.9); LANDMARK_COUNT];
        for (i, lm) in landmarks.iter_mut().enumerate() {
            lm.index = i as u8;
        }
        landmarks[index::NOSE] = Landmark::clamped(index::NOSE as u8, 0.5, nose_y, visibility);
        landmarks[index::LEFT_WRIST] =
            Landmark::clamped(index::LEFT_WRIST as u8, 0.4, wrist_y, visibility);
        landmarks[index::RIGHT_WRIST] =
            Landmark::clamped(index::RIGHT_WRIST as u8, 0.6, wrist_y, visibility);
        GestureSample::new(Box::new(landmarks))
    }

    #[test]
    fn test_hands_above_head_fires() {
        let detector = HandsRaisedDetector::default();
        assert!(detector.detect(&pose(0.1, 0.3, 0.9)).unwrap());
    }

    #[test]
    fn test_hands_down_does_not_fire() {
        let detector = HandsRaisedDetector::default();
        assert!(!detector.detect(&pose(0.6, 0.3, 0.9)).unwrap());
    }

    #[test]
    fn test_dim_wrists_do_not_fire() {
        let detector = HandsRaisedDetector::default();
        assert!(!detector.detect(&pose(0.1, 0.3, 0.2)).unwrap());
    }
}
