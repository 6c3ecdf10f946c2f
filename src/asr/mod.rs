//! Automatic speech recognition backends.
//!
//! `transcribe_sync` is a blocking call that turns raw PCM into text; it
//! backs the REST path (`TranscriptionSession::transcribe_full`), which runs
//! outside the streaming pipeline and doesn't need to get off the calling
//! thread. The streaming path (`TranscriptionSession::process_chunk`) calls
//! the async `transcribe` instead so a slow backend can't stall the
//! executor; real implementations dispatch to `spawn_blocking` internally.

use async_trait::async_trait;

pub mod mock;
#[cfg(feature = "whisper")]
pub mod whisper;

pub use mock::MockAsr;
#[cfg(feature = "whisper")]
pub use whisper::WhisperAsr;

#[derive(Debug, thiserror::Error)]
pub enum AsrError {
    #[error("model not loaded: {0}")]
    ModelNotLoaded(String),

    #[error("invalid audio: {0}")]
    InvalidAudio(String),

    #[error("inference failed: {0}")]
    InferenceFailed(String),
}

#[async_trait]
pub trait SpeechToText: Send + Sync {
    fn name(&self) -> &'static str;

    /// Blocking transcription. Implementations that run non-trivial
    /// inference should be safe to call from a `spawn_blocking` context;
    /// the session calls this directly from its async pipeline.
    fn transcribe_sync(&self, pcm: &[u8]) -> Result<String, AsrError>;

    /// Async transcription. Real backends dispatch to a blocking thread
    /// pool so the executor is never starved by inference.
    async fn transcribe(&self, pcm: &[u8]) -> Result<String, AsrError>;
}
