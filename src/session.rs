//! Transcription session: the per-client state machine.
//!
//! Owns no shared resources directly — it holds a reference to the shared
//! `Models` bundle and its own buffers, counters, and state.

use crate::error::SessionError;
use crate::frame_gate::FrameGate;
use crate::models::Models;
use crate::session_id::SessionId;
use crate::settings::Settings;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Created,
    Active,
    Closing,
    Closed,
}

#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct SessionMetrics {
    pub audio_bytes_received: u64,
    pub audio_chunks_received: u64,
    pub transcripts_sent: u64,
    pub partials_sent: u64,
    pub finals_sent: u64,
    pub errors_sent: u64,
}

impl SessionMetrics {
    pub fn audio_duration_ms(&self) -> f64 {
        self.audio_bytes_received as f64 / 32.0
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionInfo {
    pub session_id: SessionId,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub metrics: SessionMetrics,
}

#[derive(Debug, Clone)]
pub struct TranscriptResult {
    pub text: String,
    pub is_final: bool,
    pub duration_ms: u64,
}

/// Mutable per-session state, behind one lock so `process_chunk` and
/// `close` never observe a torn update from each other.
struct Inner {
    state: SessionState,
    last_activity_at: DateTime<Utc>,
    metrics: SessionMetrics,
    frame_gate: FrameGate,
    silence_ms_accumulated: f64,
}

pub struct TranscriptionSession {
    session_id: SessionId,
    created_at: DateTime<Utc>,
    models: Arc<Models>,
    settings: Arc<Settings>,
    inner: Mutex<Inner>,
}

impl TranscriptionSession {
    pub fn new(models: Arc<Models>, settings: Arc<Settings>) -> Self {
        let now = Utc::now();
        let frame_gate = FrameGate::new(models.vad.clone(), settings.sample_rate, settings.vad_frame_ms);
        Self {
            session_id: SessionId::new(),
            created_at: now,
            models,
            settings,
            inner: Mutex::new(Inner {
                state: SessionState::Created,
                last_activity_at: now,
                metrics: SessionMetrics::default(),
                frame_gate,
                silence_ms_accumulated: 0.0,
            }),
        }
    }

    pub fn id(&self) -> SessionId {
        self.session_id
    }

    fn chunk_duration_ms(&self, audio: &[u8]) -> f64 {
        let bytes_per_ms = self.settings.bytes_per_second as f64 / 1000.0;
        audio.len() as f64 / bytes_per_ms
    }

    /// Process one chunk of raw PCM audio, advancing state, metrics and the
    /// endpointing accumulator, and returning exactly one result.
    pub async fn process_chunk(&self, audio: &[u8]) -> Result<TranscriptResult, SessionError> {
        let mut inner = self.inner.lock().await;

        if matches!(inner.state, SessionState::Closing | SessionState::Closed) {
            return Err(SessionError::SessionClosing);
        }

        inner.last_activity_at = Utc::now();
        inner.metrics.audio_bytes_received += audio.len() as u64;
        inner.metrics.audio_chunks_received += 1;

        if self.settings.latency_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.settings.latency_ms)).await;
        }

        let chunk_duration_ms = self.chunk_duration_ms(audio);
        let is_speech = inner.frame_gate.is_speech(audio).await;

        let result = if is_speech {
            inner.silence_ms_accumulated = 0.0;
            if inner.state == SessionState::Created {
                inner.state = SessionState::Active;
                info!(session_id = %self.session_id.short(), "session became active");
            }

            let text = self.models.asr.transcribe(audio).await?;
            inner.metrics.transcripts_sent += 1;
            inner.metrics.partials_sent += 1;

            TranscriptResult {
                text,
                is_final: false,
                duration_ms: self.settings.latency_ms,
            }
        } else {
            inner.silence_ms_accumulated += chunk_duration_ms;

            if inner.state == SessionState::Active
                && inner.silence_ms_accumulated >= self.settings.endpointing_ms as f64
            {
                inner.silence_ms_accumulated = 0.0;
                inner.frame_gate.reset();
                inner.metrics.transcripts_sent += 1;
                inner.metrics.finals_sent += 1;
                info!(session_id = %self.session_id.short(), "utterance finalized");

                TranscriptResult {
                    text: String::new(),
                    is_final: true,
                    duration_ms: self.settings.latency_ms,
                }
            } else {
                // Either still CREATED (no speech observed yet, so a final
                // is never appropriate) or ACTIVE but under threshold. Both
                // cases emit an empty partial, counted the same as a speech
                // partial: transcripts_sent == partials_sent + finals_sent.
                inner.metrics.transcripts_sent += 1;
                inner.metrics.partials_sent += 1;

                TranscriptResult {
                    text: String::new(),
                    is_final: false,
                    duration_ms: self.settings.latency_ms,
                }
            }
        };

        debug!(
            session_id = %self.session_id.short(),
            bytes = audio.len(),
            is_speech,
            state = ?inner.state,
            "chunk processed"
        );

        Ok(result)
    }

    /// Transcribe a complete, already-buffered clip. Does not touch VAD or
    /// silence state; intended for the synchronous (non-streaming) path.
    pub fn transcribe_full(&self, audio: &[u8]) -> Result<TranscriptResult, SessionError> {
        let text = self.models.asr.transcribe_sync(audio)?;
        Ok(TranscriptResult {
            text,
            is_final: true,
            duration_ms: self.settings.latency_ms,
        })
    }

    /// Idempotent graceful shutdown. Safe to call concurrently with an
    /// in-flight `process_chunk`: that call either finishes normally (its
    /// mutation is already committed) or is still waiting for the lock and
    /// will observe CLOSING/CLOSED once it acquires it.
    pub async fn close(&self) {
        let mut inner = self.inner.lock().await;
        if matches!(inner.state, SessionState::Closing | SessionState::Closed) {
            return;
        }

        inner.state = SessionState::Closing;

        inner.frame_gate.reset();
        inner.silence_ms_accumulated = 0.0;

        inner.state = SessionState::Closed;
        info!(session_id = %self.session_id.short(), "session reached closed state");
    }

    pub async fn get_info(&self) -> SessionInfo {
        let inner = self.inner.lock().await;
        SessionInfo {
            session_id: self.session_id,
            state: inner.state,
            created_at: self.created_at,
            last_activity_at: inner.last_activity_at,
            metrics: inner.metrics.clone(),
        }
    }
}
