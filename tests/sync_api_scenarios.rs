//! End-to-end scenarios for the non-streaming transcribe and inspection
//! surface, exercised directly against a `SessionRegistry` the way a thin
//! HTTP handler would call it.

use std::sync::Arc;
use transcription_service::asr::MockAsr;
use transcription_service::error::SyncError;
use transcription_service::models::Models;
use transcription_service::registry::SessionRegistry;
use transcription_service::settings::{AsrEngine, Settings};
use transcription_service::sync_api;
use transcription_service::vad::RmsThresholdVad;

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
async fn rest_transcribe_happy_path_reports_clean_aggregate_metrics() {
    let registry = test_registry(10);

    let response = sync_api::handle_transcribe(&registry, &[0u8; 32000])
        .await
        .unwrap();
    assert!(!response.text.is_empty());

    // handle_transcribe closes (and so deregisters) the session it creates
    // before returning, and transcribe_full never touches the chunk
    // counter, so the registry is empty by the time we read it here.
    let metrics = sync_api::aggregate_metrics(&registry).await;
    assert_eq!(metrics.active_sessions, 0);
    assert_eq!(metrics.total_sessions, 0);
    assert_eq!(metrics.total_chunks, 0);
}

#[tokio::test]
async fn rest_transcribe_rejects_empty_body_without_creating_a_session() {
    let registry = test_registry(10);

    let err = sync_api::handle_transcribe(&registry, &[]).await.unwrap_err();
    assert!(matches!(err, SyncError::EmptyBody));

    let metrics = sync_api::aggregate_metrics(&registry).await;
    assert_eq!(metrics.total_sessions, 0);
}

#[tokio::test]
async fn rest_transcribe_respects_admission_limit() {
    let registry = test_registry(0);

    let err = sync_api::handle_transcribe(&registry, &[0u8; 32000])
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Registry(_)));
}

#[tokio::test]
async fn listing_and_terminating_sessions_reflects_registry_state() {
    let registry = test_registry(10);
    let session = registry.create().await.unwrap();

    let listed = sync_api::list_sessions(&registry).await;
    assert_eq!(listed.count, 1);
    assert_eq!(listed.sessions[0].session_id, session.id());

    sync_api::terminate_session(&registry, session.id()).await.unwrap();
    let listed = sync_api::list_sessions(&registry).await;
    assert_eq!(listed.count, 0);
}
