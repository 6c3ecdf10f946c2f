//! Synchronous endpoint and inspection surface.
//!
//! Thin, router-agnostic functions. Wiring these onto an HTTP framework is
//! outside this crate's scope; `server.rs` only mounts the streaming path.

use crate::error::SyncError;
use crate::registry::SessionRegistry;
use crate::session::SessionInfo;
use crate::session_id::SessionId;
use serde::Serialize;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Serialize)]
pub struct TranscribeResponse {
    pub text: String,
    pub duration_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub active_sessions: usize,
}

#[derive(Debug, Serialize)]
pub struct SessionsResponse {
    pub sessions: Vec<SessionInfo>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub active_sessions: usize,
    pub total_sessions: usize,
    pub total_audio_bytes: u64,
    pub total_audio_duration_ms: f64,
    pub total_chunks: u64,
    pub total_transcripts: u64,
}

/// Transcribe one complete clip. A session is created and closed around
/// the call so admission limits and aggregate metrics stay consistent
/// with the streaming path.
pub async fn handle_transcribe(
    registry: &SessionRegistry,
    body: &[u8],
) -> Result<TranscribeResponse, SyncError> {
    if body.is_empty() {
        return Err(SyncError::EmptyBody);
    }

    let session = registry.create().await?;
    let result = session.transcribe_full(body);
    registry.close(session.id()).await;

    let result = result?;
    Ok(TranscribeResponse {
        text: result.text,
        duration_ms: result.duration_ms,
    })
}

pub async fn health(registry: &SessionRegistry) -> HealthResponse {
    HealthResponse {
        status: "ok",
        version: VERSION,
        active_sessions: registry.active_count().await,
    }
}

pub async fn list_sessions(registry: &SessionRegistry) -> SessionsResponse {
    let sessions = registry.all_sessions().await;
    SessionsResponse {
        count: sessions.len(),
        sessions,
    }
}

pub async fn aggregate_metrics(registry: &SessionRegistry) -> MetricsResponse {
    let metrics = registry.aggregate_metrics().await;
    MetricsResponse {
        active_sessions: metrics.active_sessions,
        total_sessions: metrics.total_sessions,
        total_audio_bytes: metrics.total_audio_bytes,
        total_audio_duration_ms: metrics.total_audio_duration_ms,
        total_chunks: metrics.total_chunks,
        total_transcripts: metrics.total_transcripts,
    }
}

pub async fn terminate_session(registry: &SessionRegistry, id: SessionId) -> Result<(), SyncError> {
    if registry.close(id).await {
        Ok(())
    } else {
        Err(SyncError::Registry(crate::error::RegistryError::SessionNotFound(id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asr::MockAsr;
    use crate::models::Models;
    use crate::settings::{AsrEngine, Settings};
    use crate::vad::RmsThresholdVad;
    use std::sync::Arc;

    fn test_registry(max_sessions: usize) -> Arc<SessionRegistry> {
        let models = Arc::new(Models {
            vad: Arc::new(RmsThresholdVad::new()),
            asr: Arc::new(MockAsr::new(12800, 0)),
        });
        let settings = Arc::new(Settings {
            sample_rate: 16000,
            sample_width: 2,
            bytes_per_second: 32000,
            vad_aggressiveness: 2,
            vad_frame_ms: 20,
            endpointing_ms: 300,
            latency_ms: 0,
            words_per_second: 2.5,
            bytes_per_word: 12800,
            max_sessions,
            idle_timeout_seconds: 300.0,
            initial_speech_timeout_seconds: 10.0,
            cleanup_interval_seconds: 30.0,
            asr_engine: AsrEngine::Mock,
            host: "0.0.0.0".into(),
            port: 8001,
        });
        SessionRegistry::new(models, settings)
    }

    #[tokio::test]
    async fn empty_body_is_rejected() {
        let registry = test_registry(10);
        let err = handle_transcribe(&registry, &[]).await.unwrap_err();
        assert!(matches!(err, SyncError::EmptyBody));
    }

    #[tokio::test]
    async fn happy_path_returns_non_empty_text() {
        let registry = test_registry(10);
        let response = handle_transcribe(&registry, &[0u8; 16000]).await.unwrap();
        assert!(!response.text.is_empty());
        assert_eq!(registry.active_count().await, 0);
    }

    #[tokio::test]
    async fn health_reports_active_sessions() {
        let registry = test_registry(10);
        let _session = registry.create().await.unwrap();
        let response = health(&registry).await;
        assert_eq!(response.active_sessions, 1);
        assert_eq!(response.status, "ok");
    }

    #[tokio::test]
    async fn terminate_unknown_session_errors() {
        let registry = test_registry(10);
        let err = terminate_session(&registry, SessionId::new()).await.unwrap_err();
        assert!(matches!(err, SyncError::Registry(_)));
    }
}
