//! Error taxonomy.
//!
//! One `thiserror` enum per subsystem: a dedicated error type at each seam
//! rather than one catch-all.

use crate::session_id::SessionId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session is closing or closed, cannot accept audio")]
    SessionClosing,

    #[error("transcription failed: {0}")]
    Transcribe(#[from] crate::asr::AsrError),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("session limit exceeded")]
    SessionLimitExceeded,

    #[error("session not found: {0}")]
    SessionNotFound(SessionId),
}

#[derive(Debug, Error)]
pub enum ModelsError {
    #[error("models not initialized, call init_models() first")]
    NotInitialized,

    #[error("unsupported ASR engine: {0}")]
    UnsupportedAsrEngine(String),

    #[error("asr backend failed to initialize: {0}")]
    AsrInitFailed(String),
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("empty audio data")]
    EmptyBody,

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Session(#[from] SessionError),
}
