//! Application configuration.
//!
//! Read from environment variables with an `ASR_` prefix, mirroring the
//! field set of the original service's settings object. No file-based
//! config layering here; that loader lives outside this crate.

use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Settings {
    pub sample_rate: u32,
    pub sample_width: u32,
    pub bytes_per_second: u32,

    pub vad_aggressiveness: u32,
    pub vad_frame_ms: u32,

    pub endpointing_ms: u64,
    pub latency_ms: u64,

    pub words_per_second: f64,
    pub bytes_per_word: u64,

    pub max_sessions: usize,
    pub idle_timeout_seconds: f64,
    pub initial_speech_timeout_seconds: f64,
    pub cleanup_interval_seconds: f64,

    pub asr_engine: AsrEngine,

    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsrEngine {
    Mock,
    Whisper,
}

impl Settings {
    /// Load from the environment, falling back to documented defaults for
    /// anything unset. Malformed values fall back to the default rather
    /// than panicking the process at startup.
    pub fn from_env() -> Self {
        Self {
            sample_rate: env_u32("ASR_SAMPLE_RATE", 16000),
            sample_width: env_u32("ASR_SAMPLE_WIDTH", 2),
            bytes_per_second: env_u32("ASR_BYTES_PER_SECOND", 32000),

            vad_aggressiveness: env_u32("ASR_VAD_AGGRESSIVENESS", 2),
            vad_frame_ms: env_u32("ASR_VAD_FRAME_MS", 20),

            endpointing_ms: env_u64("ASR_ENDPOINTING_MS", 300),
            latency_ms: env_u64("ASR_LATENCY_MS", 50),

            words_per_second: env_f64("ASR_WORDS_PER_SECOND", 2.5),
            bytes_per_word: env_u64("ASR_BYTES_PER_WORD", 12800),

            max_sessions: env_u32("ASR_MAX_SESSIONS", 1000) as usize,
            idle_timeout_seconds: env_f64("ASR_IDLE_TIMEOUT_SECONDS", 300.0),
            initial_speech_timeout_seconds: env_f64("ASR_INITIAL_SPEECH_TIMEOUT_SECONDS", 10.0),
            cleanup_interval_seconds: env_f64("ASR_CLEANUP_INTERVAL_SECONDS", 30.0),

            asr_engine: match env::var("ASR_ASR_ENGINE").as_deref() {
                Ok("whisper") => AsrEngine::Whisper,
                _ => AsrEngine::Mock,
            },

            host: env::var("ASR_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_u32("ASR_PORT", 8001) as u16,
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.idle_timeout_seconds.max(0.0))
    }

    pub fn initial_speech_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.initial_speech_timeout_seconds.max(0.0))
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs_f64(self.cleanup_interval_seconds.max(0.0))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        // Construct without touching the environment so defaults are deterministic
        // regardless of the process's actual env.
        let settings = Settings {
            sample_rate: 16000,
            sample_width: 2,
            bytes_per_second: 32000,
            vad_aggressiveness: 2,
            vad_frame_ms: 20,
            endpointing_ms: 300,
            latency_ms: 50,
            words_per_second: 2.5,
            bytes_per_word: 12800,
            max_sessions: 1000,
            idle_timeout_seconds: 300.0,
            initial_speech_timeout_seconds: 10.0,
            cleanup_interval_seconds: 30.0,
            asr_engine: AsrEngine::Mock,
            host: "0.0.0.0".to_string(),
            port: 8001,
        };
        assert_eq!(settings.idle_timeout(), Duration::from_secs(300));
        assert_eq!(settings.initial_speech_timeout(), Duration::from_secs(10));
    }
}
