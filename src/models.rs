//! Shared model container.
//!
//! A process-wide, read-only bundle: one VAD predicate and one ASR backend,
//! built once at startup and handed to every session as an `Arc`. No
//! per-client state lives here.

use crate::asr::{MockAsr, SpeechToText};
use crate::error::ModelsError;
use crate::settings::{AsrEngine, Settings};
use crate::vad::{self, VoiceActivityDetection};
use once_cell::sync::OnceCell;
use std::sync::Arc;

pub struct Models {
    pub vad: Arc<dyn VoiceActivityDetection>,
    pub asr: Arc<dyn SpeechToText>,
}

static MODELS: OnceCell<Arc<Models>> = OnceCell::new();

/// Build the shared model bundle and install it as the process singleton.
/// Must be called exactly once before any session is created.
pub async fn init_models(settings: &Settings) -> Result<Arc<Models>, ModelsError> {
    let vad = vad::create("rms").into();
    let asr: Arc<dyn SpeechToText> = match settings.asr_engine {
        AsrEngine::Mock => Arc::new(MockAsr::new(settings.bytes_per_word, settings.latency_ms)),
        #[cfg(feature = "whisper")]
        AsrEngine::Whisper => {
            let whisper = crate::asr::WhisperAsr::new();
            whisper
                .initialize()
                .await
                .map_err(|e| ModelsError::AsrInitFailed(e.to_string()))?;
            Arc::new(whisper)
        }
        #[cfg(not(feature = "whisper"))]
        AsrEngine::Whisper => {
            return Err(ModelsError::UnsupportedAsrEngine(
                "whisper engine requested but crate built without the `whisper` feature".into(),
            ));
        }
    };

    let models = Arc::new(Models { vad, asr });
    MODELS
        .set(models.clone())
        .map_err(|_| ModelsError::AsrInitFailed("models already initialized".into()))?;
    Ok(models)
}

/// Fetch the process-wide model bundle. Panics-free; callers that invoke
/// this before `init_models` get a structured error instead.
pub fn get_models() -> Result<Arc<Models>, ModelsError> {
    MODELS.get().cloned().ok_or(ModelsError::NotInitialized)
}

/// Test-only hook to reset the singleton between isolated test cases.
#[cfg(test)]
pub fn reset_models() {
    // OnceCell has no public reset; tests that need isolation construct a
    // `Models` bundle directly rather than going through the singleton.
}
