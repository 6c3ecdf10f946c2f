//! Mock ASR backend.
//!
//! Produces text proportional to audio byte length rather than running a
//! real model, so sessions and the endpointing loop can be exercised
//! without a model file on disk.

use super::{AsrError, SpeechToText};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::thread_rng;
use std::time::Duration;

const VOCABULARY: &[&str] = &[
    "the", "a", "an", "is", "was", "are", "were", "be", "been", "being", "have", "has", "had",
    "do", "does", "did", "will", "would", "should", "could", "can", "may", "might", "must",
    "shall", "hello", "world", "test", "testing", "speech", "audio", "voice", "sound", "word",
    "sentence", "text", "transcript", "session", "stream", "chunk", "frame", "silence", "noise",
    "good", "bad", "better", "best", "worse", "worst", "large", "small", "larger", "smaller",
    "quick", "slow", "quicker", "slower", "happy", "sad", "loud", "quiet", "please", "thank",
    "you", "yes", "no", "maybe", "today", "tomorrow", "yesterday", "morning", "afternoon",
    "evening", "night", "time", "day", "week", "month", "year", "question", "answer", "data",
    "system", "service", "server", "client", "message", "request", "response", "error", "success",
    "user", "model", "inference", "result", "output", "input", "check", "start", "stop", "close",
];

/// Generates deterministic-in-length, pseudo-random-in-content text: one
/// word per `bytes_per_word` bytes of audio, minimum one word.
pub struct TextGenerator {
    bytes_per_word: u64,
}

impl TextGenerator {
    pub fn new(bytes_per_word: u64) -> Self {
        Self { bytes_per_word }
    }

    pub fn generate(&self, audio_bytes: usize) -> String {
        let word_count = (audio_bytes as u64 / self.bytes_per_word).max(1);
        self.generate_words(word_count as usize)
    }

    pub fn generate_words(&self, word_count: usize) -> String {
        if word_count == 0 {
            return String::new();
        }
        let mut rng = thread_rng();
        (0..word_count)
            .map(|_| *VOCABULARY.choose(&mut rng).expect("vocabulary is non-empty"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub struct MockAsr {
    text_gen: TextGenerator,
    latency_ms: u64,
}

impl MockAsr {
    pub fn new(bytes_per_word: u64, latency_ms: u64) -> Self {
        Self {
            text_gen: TextGenerator::new(bytes_per_word),
            latency_ms,
        }
    }
}

#[async_trait]
impl SpeechToText for MockAsr {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn transcribe_sync(&self, pcm: &[u8]) -> Result<String, AsrError> {
        Ok(self.text_gen.generate(pcm.len()))
    }

    async fn transcribe(&self, pcm: &[u8]) -> Result<String, AsrError> {
        if self.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.latency_ms)).await;
        }
        self.transcribe_sync(pcm)
    }
}
