//! Voice activity detection.
//!
//! The session layer only needs one predicate from a VAD implementation:
//! is this frame speech? Everything else (model choice, thresholds) is an
//! implementation detail behind the trait.

use async_trait::async_trait;

pub mod rms_threshold;

pub use rms_threshold::RmsThresholdVad;

#[derive(Debug, thiserror::Error)]
pub enum VadError {
    #[error("model not loaded: {0}")]
    ModelNotLoaded(String),

    #[error("invalid audio: {0}")]
    InvalidAudio(String),

    #[error("inference failed: {0}")]
    InferenceFailed(String),
}

#[derive(Debug, Clone, Copy)]
pub struct VadResult {
    pub is_speech: bool,
    pub confidence: f32,
}

/// Runtime-swappable voice activity detector.
///
/// Implementations must be `Send + Sync`: a single instance is shared by
/// every session in the process.
#[async_trait]
pub trait VoiceActivityDetection: Send + Sync {
    fn name(&self) -> &'static str;

    /// Detect voice activity in a single frame of 16-bit PCM samples.
    async fn detect(&self, samples: &[i16]) -> Result<VadResult, VadError>;
}

/// Create a VAD instance by name. The only algorithm this crate ships
/// internals for is `rms`; any other name still resolves to it, since real
/// detectors are a pluggable concern the session layer is blind to.
pub fn create(_name: &str) -> Box<dyn VoiceActivityDetection> {
    Box::new(RmsThresholdVad::new())
}
