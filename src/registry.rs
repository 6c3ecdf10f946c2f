//! Session registry: admission, lookup, and background reaping.

use crate::error::RegistryError;
use crate::models::Models;
use crate::session::{SessionInfo, SessionState, TranscriptionSession};
use crate::session_id::SessionId;
use crate::settings::Settings;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub struct AggregateMetrics {
    pub active_sessions: usize,
    pub total_sessions: usize,
    pub total_audio_bytes: u64,
    pub total_audio_duration_ms: f64,
    pub total_chunks: u64,
    pub total_transcripts: u64,
}

struct State {
    sessions: HashMap<SessionId, Arc<TranscriptionSession>>,
}

pub struct SessionRegistry {
    models: Arc<Models>,
    settings: Arc<Settings>,
    state: RwLock<State>,
    reaper: RwLock<Option<JoinHandle<()>>>,
}

impl SessionRegistry {
    pub fn new(models: Arc<Models>, settings: Arc<Settings>) -> Arc<Self> {
        Arc::new(Self {
            models,
            settings,
            state: RwLock::new(State {
                sessions: HashMap::new(),
            }),
            reaper: RwLock::new(None),
        })
    }

    /// Admission and insertion in one atomic critical section. A session
    /// present in the map is always CREATED or ACTIVE — `close()` removes
    /// it from the map before the session itself ever reaches CLOSING — so
    /// the map's length alone is the active count; no per-session lock is
    /// ever awaited while this write lock is held.
    pub async fn create(self: &Arc<Self>) -> Result<Arc<TranscriptionSession>, RegistryError> {
        let mut state = self.state.write().await;

        if state.sessions.len() >= self.settings.max_sessions {
            return Err(RegistryError::SessionLimitExceeded);
        }

        let session = Arc::new(TranscriptionSession::new(self.models.clone(), self.settings.clone()));
        let id = session.id();
        state.sessions.insert(id, session.clone());
        drop(state);
        info!(session_id = %id.short(), "session created");
        Ok(session)
    }

    pub async fn get(&self, id: SessionId) -> Result<Arc<TranscriptionSession>, RegistryError> {
        let state = self.state.read().await;
        state
            .sessions
            .get(&id)
            .cloned()
            .ok_or(RegistryError::SessionNotFound(id))
    }

    /// Close and remove a session. Returns whether it was present. The
    /// session's own `close()` runs with the registry lock already
    /// released, so a reaper sweep never blocks an in-flight chunk.
    pub async fn close(&self, id: SessionId) -> bool {
        let session = {
            let mut state = self.state.write().await;
            state.sessions.remove(&id)
        };

        match session {
            Some(session) => {
                session.close().await;
                info!(session_id = %id.short(), "session closed");
                true
            }
            None => false,
        }
    }

    /// Sessions present in the map are always CREATED or ACTIVE, so this is
    /// just the map size — no per-session lock involved.
    pub async fn active_count(&self) -> usize {
        self.state.read().await.sessions.len()
    }

    /// Clone the Arcs out from under the registry lock so callers can await
    /// each session's own lock (`get_info`) without holding this one.
    async fn snapshot_sessions(&self) -> Vec<Arc<TranscriptionSession>> {
        let state = self.state.read().await;
        state.sessions.values().cloned().collect()
    }

    pub async fn all_sessions(&self) -> Vec<SessionInfo> {
        let sessions = self.snapshot_sessions().await;
        let mut infos = Vec::with_capacity(sessions.len());
        for session in sessions {
            infos.push(session.get_info().await);
        }
        infos
    }

    pub async fn aggregate_metrics(&self) -> AggregateMetrics {
        let infos = self.all_sessions().await;
        let mut metrics = AggregateMetrics {
            active_sessions: 0,
            total_sessions: infos.len(),
            total_audio_bytes: 0,
            total_audio_duration_ms: 0.0,
            total_chunks: 0,
            total_transcripts: 0,
        };
        for info in &infos {
            if matches!(info.state, SessionState::Created | SessionState::Active) {
                metrics.active_sessions += 1;
            }
            metrics.total_audio_bytes += info.metrics.audio_bytes_received;
            metrics.total_audio_duration_ms += info.metrics.audio_duration_ms();
            metrics.total_chunks += info.metrics.audio_chunks_received;
            metrics.total_transcripts += info.metrics.transcripts_sent;
        }
        metrics
    }

    /// Spawn the background reaper. Idempotent: a second call while one is
    /// already running is a no-op.
    pub async fn start(self: &Arc<Self>) {
        let mut reaper = self.reaper.write().await;
        if reaper.is_some() {
            return;
        }

        let registry = self.clone();
        let interval = self.settings.cleanup_interval();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                registry.sweep().await;
            }
        });
        *reaper = Some(handle);
    }

    /// Cancel the reaper and close every remaining session. Idempotent.
    pub async fn stop(&self) {
        if let Some(handle) = self.reaper.write().await.take() {
            handle.abort();
            let _ = handle.await;
        }

        let ids: Vec<SessionId> = {
            let state = self.state.read().await;
            state.sessions.keys().copied().collect()
        };
        for id in ids {
            self.close(id).await;
        }
    }

    async fn sweep(&self) {
        let now = chrono::Utc::now();
        let initial_speech_timeout = chrono::Duration::from_std(self.settings.initial_speech_timeout())
            .unwrap_or(chrono::Duration::zero());
        let idle_timeout = chrono::Duration::from_std(self.settings.idle_timeout())
            .unwrap_or(chrono::Duration::zero());

        let sessions = self.snapshot_sessions().await;

        let mut to_close = Vec::new();
        for session in sessions {
            let id = session.id();
            let info = session.get_info().await;

            let idle_for = now - info.last_activity_at;
            let expired = match info.state {
                SessionState::Closed => true,
                SessionState::Created => idle_for >= initial_speech_timeout,
                SessionState::Active => idle_for >= idle_timeout,
                SessionState::Closing => false,
            };

            if expired {
                to_close.push(id);
            }
        }

        for id in to_close {
            if self.close(id).await {
                warn!(session_id = %id.short(), "reaper closed idle session");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asr::MockAsr;
    use crate::vad::RmsThresholdVad;

    fn test_settings(max_sessions: usize) -> Arc<Settings> {
        Arc::new(Settings {
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
            asr_engine: crate::settings::AsrEngine::Mock,
            host: "0.0.0.0".into(),
            port: 8001,
        })
    }

    fn test_models() -> Arc<Models> {
        Arc::new(Models {
            vad: Arc::new(RmsThresholdVad::new()),
            asr: Arc::new(MockAsr::new(12800, 0)),
        })
    }

    #[tokio::test]
    async fn admission_respects_max_sessions() {
        let registry = SessionRegistry::new(test_models(), test_settings(3));
        for _ in 0..3 {
            registry.create().await.unwrap();
        }
        assert!(matches!(
            registry.create().await.unwrap_err(),
            RegistryError::SessionLimitExceeded
        ));
        assert_eq!(registry.active_count().await, 3);
    }

    #[tokio::test]
    async fn get_unknown_session_errors() {
        let registry = SessionRegistry::new(test_models(), test_settings(10));
        let err = registry.get(SessionId::new()).await.unwrap_err();
        assert!(matches!(err, RegistryError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn close_removes_and_is_silent_on_unknown_id() {
        let registry = SessionRegistry::new(test_models(), test_settings(10));
        let session = registry.create().await.unwrap();
        let id = session.id();

        assert!(registry.close(id).await);
        assert!(registry.get(id).await.is_err());
        assert!(!registry.close(id).await);
    }

    #[tokio::test]
    async fn stop_closes_every_remaining_session() {
        let registry = SessionRegistry::new(test_models(), test_settings(10));
        let s1 = registry.create().await.unwrap();
        let s2 = registry.create().await.unwrap();
        registry.start().await;

        registry.stop().await;

        assert_eq!(s1.get_info().await.state, SessionState::Closed);
        assert_eq!(s2.get_info().await.state, SessionState::Closed);
    }

    #[tokio::test]
    async fn reaper_reclaims_created_sessions_faster_than_active_ones() {
        let mut settings = (*test_settings(10)).clone();
        settings.initial_speech_timeout_seconds = 0.1;
        settings.idle_timeout_seconds = 2.0;
        settings.cleanup_interval_seconds = 0.05;
        let settings = Arc::new(settings);

        let registry = SessionRegistry::new(test_models(), settings);
        let created = registry.create().await.unwrap();
        registry.start().await;

        tokio::time::sleep(std::time::Duration::from_millis(250)).await;

        assert!(registry.get(created.id()).await.is_err());
        registry.stop().await;
    }

    #[tokio::test]
    async fn reaper_gives_active_sessions_the_longer_timeout() {
        let mut settings = (*test_settings(10)).clone();
        settings.initial_speech_timeout_seconds = 0.1;
        settings.idle_timeout_seconds = 0.5;
        settings.cleanup_interval_seconds = 0.05;
        let settings = Arc::new(settings);

        let registry = SessionRegistry::new(test_models(), settings);
        let session = registry.create().await.unwrap();

        let sample: i16 = 5000;
        let mut chunk = Vec::new();
        for _ in 0..320 {
            chunk.extend_from_slice(&sample.to_le_bytes());
        }
        session.process_chunk(&chunk).await.unwrap();
        assert_eq!(session.get_info().await.state, SessionState::Active);

        registry.start().await;
        tokio::time::sleep(std::time::Duration::from_millis(250)).await;
        assert!(registry.get(session.id()).await.is_ok());

        tokio::time::sleep(std::time::Duration::from_millis(400)).await;
        assert!(registry.get(session.id()).await.is_err());
        registry.stop().await;
    }
}
