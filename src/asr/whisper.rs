//! Local Whisper inference (whisper.cpp bindings), feature-gated behind
//! `whisper`. Uses the same model-loading and padding conventions as the
//! other backend adapters in this crate.

use super::{AsrError, SpeechToText};
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

static WHISPER_CTX: OnceCell<Arc<Mutex<WhisperContext>>> = OnceCell::new();

/// Whisper requires at least 1000ms of audio; pad to 1050ms for its
/// internal rounding (it reports 990ms for exactly 16000 samples).
const WHISPER_MIN_SAMPLES: usize = 16800;

pub struct WhisperAsr {
    model_path: Option<PathBuf>,
}

impl WhisperAsr {
    pub fn new() -> Self {
        Self { model_path: None }
    }

    pub fn with_model_path(model_path: PathBuf) -> Self {
        Self {
            model_path: Some(model_path),
        }
    }

    fn find_model_path(&self) -> PathBuf {
        if let Some(ref path) = self.model_path {
            return path.clone();
        }

        let model_name = std::env::var("ASR_WHISPER_MODEL").unwrap_or_else(|_| "base".to_string());
        let model_file = match model_name.as_str() {
            "small" => "ggml-small.en.bin",
            "medium" => "ggml-medium.en.bin",
            "large-v3" => "ggml-large-v3.bin",
            _ => "ggml-base.en.bin",
        };

        let candidates = [
            PathBuf::from(format!("models/whisper/{model_file}")),
            PathBuf::from(format!("/usr/local/share/whisper/{model_file}")),
        ];

        for path in &candidates {
            if path.exists() {
                return path.clone();
            }
        }

        PathBuf::from(format!("models/whisper/{model_file}"))
    }

    pub async fn initialize(&self) -> Result<(), AsrError> {
        if WHISPER_CTX.get().is_some() {
            return Ok(());
        }

        let model_path = self.find_model_path();
        info!(?model_path, "loading whisper model");

        if !model_path.exists() {
            warn!(?model_path, "whisper model not found");
            return Err(AsrError::ModelNotLoaded(format!(
                "model not found: {model_path:?}. download a ggml-*.bin from the whisper.cpp huggingface repo"
            )));
        }

        let params = WhisperContextParameters::default();
        let ctx = WhisperContext::new_with_params(
            model_path.to_str().unwrap_or(""),
            params,
        )
        .map_err(|e| AsrError::ModelNotLoaded(e.to_string()))?;

        WHISPER_CTX
            .set(Arc::new(Mutex::new(ctx)))
            .map_err(|_| AsrError::ModelNotLoaded("failed to set global context".into()))?;

        Ok(())
    }

    fn run_inference(ctx: &Arc<Mutex<WhisperContext>>, mut samples: Vec<f32>) -> Result<String, AsrError> {
        if samples.is_empty() {
            return Err(AsrError::InvalidAudio("empty audio samples".into()));
        }

        if samples.len() < WHISPER_MIN_SAMPLES {
            samples.resize(WHISPER_MIN_SAMPLES, 0.0);
        }

        let ctx_guard = ctx.lock();
        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_translate(false);
        params.set_no_context(true);
        params.set_single_segment(false);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        let mut state = ctx_guard
            .create_state()
            .map_err(|e| AsrError::InferenceFailed(format!("failed to create state: {e}")))?;

        state
            .full(params, &samples)
            .map_err(|e| AsrError::InferenceFailed(format!("inference failed: {e}")))?;

        let num_segments = state
            .full_n_segments()
            .map_err(|e| AsrError::InferenceFailed(format!("failed to get segments: {e}")))?;

        let mut text = String::new();
        for i in 0..num_segments {
            let segment = state
                .full_get_segment_text(i)
                .map_err(|e| AsrError::InferenceFailed(format!("failed to get segment {i}: {e}")))?;
            text.push_str(&segment);
        }

        Ok(text.trim().to_string())
    }
}

fn pcm16_to_f32(pcm: &[u8]) -> Vec<f32> {
    pcm.chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / i16::MAX as f32)
        .collect()
}

impl Default for WhisperAsr {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechToText for WhisperAsr {
    fn name(&self) -> &'static str {
        "whisper"
    }

    fn transcribe_sync(&self, pcm: &[u8]) -> Result<String, AsrError> {
        let ctx = WHISPER_CTX
            .get()
            .ok_or_else(|| AsrError::ModelNotLoaded("whisper not initialized".into()))?
            .clone();
        let samples = pcm16_to_f32(pcm);
        Self::run_inference(&ctx, samples)
    }

    async fn transcribe(&self, pcm: &[u8]) -> Result<String, AsrError> {
        let ctx = WHISPER_CTX
            .get()
            .ok_or_else(|| AsrError::ModelNotLoaded("whisper not initialized".into()))?
            .clone();
        let samples = pcm16_to_f32(pcm);

        tokio::task::spawn_blocking(move || Self::run_inference(&ctx, samples))
            .await
            .map_err(|e| AsrError::InferenceFailed(format!("task join error: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_reports_its_name() {
        let adapter = WhisperAsr::new();
        assert_eq!(adapter.name(), "whisper");
    }

    #[test]
    fn pcm_conversion_preserves_sample_count() {
        let pcm = vec![0u8; 640];
        assert_eq!(pcm16_to_f32(&pcm).len(), 320);
    }
}
