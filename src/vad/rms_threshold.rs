//! RMS energy threshold detector.
//!
//! Fast and primitive: cannot distinguish speech from background noise.
//! Adequate as the default predicate behind the `VoiceActivityDetection`
//! trait since the session layer only cares about the boolean verdict.

use super::{VadError, VadResult, VoiceActivityDetection};
use async_trait::async_trait;

pub struct RmsThresholdVad {
    threshold: f32,
}

impl RmsThresholdVad {
    pub fn new() -> Self {
        Self { threshold: 500.0 }
    }

    pub fn with_threshold(threshold: f32) -> Self {
        Self { threshold }
    }

    fn calculate_rms(samples: &[i16]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_squares: f64 = samples.iter().map(|&s| (s as f64).powi(2)).sum();
        (sum_squares / samples.len() as f64).sqrt() as f32
    }
}

impl Default for RmsThresholdVad {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VoiceActivityDetection for RmsThresholdVad {
    fn name(&self) -> &'static str {
        "rms_threshold"
    }

    async fn detect(&self, samples: &[i16]) -> Result<VadResult, VadError> {
        if samples.is_empty() {
            return Err(VadError::InvalidAudio("empty samples".into()));
        }

        let rms = Self::calculate_rms(samples);
        let is_speech = rms >= self.threshold;
        let confidence = if is_speech {
            ((rms / self.threshold) - 1.0).min(1.0)
        } else {
            0.0
        };

        Ok(VadResult {
            is_speech,
            confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn silence_is_not_speech() {
        let vad = RmsThresholdVad::new();
        let silence = vec![0i16; 320];
        let result = vad.detect(&silence).await.unwrap();
        assert!(!result.is_speech);
    }

    #[tokio::test]
    async fn loud_audio_is_speech() {
        let vad = RmsThresholdVad::new();
        let loud = vec![5000i16; 320];
        let result = vad.detect(&loud).await.unwrap();
        assert!(result.is_speech);
    }

    #[tokio::test]
    async fn empty_samples_error() {
        let vad = RmsThresholdVad::new();
        assert!(vad.detect(&[]).await.is_err());
    }

    #[test]
    fn custom_threshold() {
        let vad = RmsThresholdVad::with_threshold(100.0);
        assert_eq!(vad.threshold, 100.0);
    }
}
