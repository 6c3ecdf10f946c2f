//! Real-time speech-to-text streaming service.
//!
//! Clients push 16-bit PCM audio over a WebSocket and get back partial
//! transcripts punctuated by finalization markers whenever the speaker
//! pauses. A shared, read-only model bundle (VAD + ASR) is created once
//! and handed to every session; all per-client state — buffers, silence
//! accumulators, the CREATED/ACTIVE/CLOSING/CLOSED state machine — lives
//! in the session itself.
//!
//! # Layout
//!
//! - [`session`] — the per-client state machine and endpointing loop.
//! - [`registry`] — admission control and the idle-session reaper.
//! - [`models`] — the shared VAD/ASR bundle and its process-wide singleton.
//! - [`frame_gate`] — per-session VAD buffering.
//! - [`vad`] / [`asr`] — pluggable detector and transcription backends.
//! - [`stream_adapter`] / [`server`] — the WebSocket protocol and listener.
//! - [`sync_api`] — the non-streaming transcribe + inspection endpoints.

pub mod asr;
pub mod error;
pub mod frame_gate;
pub mod models;
pub mod registry;
pub mod server;
pub mod session;
pub mod session_id;
pub mod settings;
pub mod stream_adapter;
pub mod sync_api;
pub mod vad;

pub use error::{ModelsError, RegistryError, SessionError, SyncError};
pub use models::{init_models, Models};
pub use registry::SessionRegistry;
pub use session::{SessionInfo, SessionMetrics, SessionState, TranscriptResult, TranscriptionSession};
pub use session_id::SessionId;
pub use settings::Settings;
