//! Per-session frame gate.
//!
//! Accumulates raw PCM bytes and hands the shared VAD predicate a
//! frame-sized window at a time. Holds no opinion about endpointing; it
//! only answers "is the most recent frame speech?".

use crate::vad::VoiceActivityDetection;
use std::sync::Arc;

const VALID_FRAME_DURATIONS_MS: [u32; 3] = [10, 20, 30];

pub struct FrameGate {
    vad: Arc<dyn VoiceActivityDetection>,
    sample_rate: u32,
    frame_duration_ms: u32,
    buffer: Vec<u8>,
}

impl FrameGate {
    pub fn new(vad: Arc<dyn VoiceActivityDetection>, sample_rate: u32, frame_duration_ms: u32) -> Self {
        debug_assert!(VALID_FRAME_DURATIONS_MS.contains(&frame_duration_ms));
        Self {
            vad,
            sample_rate,
            frame_duration_ms,
            buffer: Vec::new(),
        }
    }

    fn frame_size_bytes(&self) -> usize {
        (self.sample_rate as usize * self.frame_duration_ms as usize / 1000) * 2
    }

    /// Append `chunk` to the buffer and report whether the latest complete
    /// frame in it is speech.
    ///
    /// If the buffer does not yet hold a full frame, speech is assumed —
    /// audio is never dropped for lack of evidence. If the shared VAD
    /// predicate itself errors, the chunk is treated as speech as well.
    pub async fn is_speech(&mut self, chunk: &[u8]) -> bool {
        self.buffer.extend_from_slice(chunk);

        let frame_size = self.frame_size_bytes();
        if self.buffer.len() < frame_size {
            return true;
        }

        let frame_bytes = &self.buffer[self.buffer.len() - frame_size..];
        let samples = bytes_to_i16(frame_bytes);

        match self.vad.detect(&samples).await {
            Ok(result) => result.is_speech,
            Err(_) => true,
        }
    }

    /// Drain complete frames in FIFO order, reporting a verdict per frame.
    /// Used by diagnostics and tests; `is_speech` is the hot path.
    pub async fn process_frames(&mut self, chunk: &[u8]) -> Vec<bool> {
        self.buffer.extend_from_slice(chunk);

        let frame_size = self.frame_size_bytes();
        let mut verdicts = Vec::new();

        while self.buffer.len() >= frame_size {
            let frame_bytes: Vec<u8> = self.buffer.drain(..frame_size).collect();
            let samples = bytes_to_i16(&frame_bytes);
            let is_speech = match self.vad.detect(&samples).await {
                Ok(result) => result.is_speech,
                Err(_) => true,
            };
            verdicts.push(is_speech);
        }

        verdicts
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}

fn bytes_to_i16(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vad::RmsThresholdVad;

    fn gate() -> FrameGate {
        FrameGate::new(Arc::new(RmsThresholdVad::new()), 16000, 20)
    }

    #[tokio::test]
    async fn assumes_speech_before_a_full_frame_arrives() {
        let mut gate = gate();
        // 20ms @ 16kHz = 320 samples = 640 bytes; send fewer.
        assert!(gate.is_speech(&[0u8; 100]).await);
    }

    #[tokio::test]
    async fn silence_frame_is_not_speech_once_complete() {
        let mut gate = gate();
        assert!(!gate.is_speech(&vec![0u8; 640]).await);
    }

    #[tokio::test]
    async fn loud_frame_is_speech_once_complete() {
        let mut gate = gate();
        let loud_sample: i16 = 5000;
        let mut chunk = Vec::new();
        for _ in 0..320 {
            chunk.extend_from_slice(&loud_sample.to_le_bytes());
        }
        assert!(gate.is_speech(&chunk).await);
    }

    #[tokio::test]
    async fn uses_the_most_recent_suffix_not_the_oldest_bytes() {
        let mut gate = gate();
        let loud_sample: i16 = 5000;
        let mut loud_frame = Vec::new();
        for _ in 0..320 {
            loud_frame.extend_from_slice(&loud_sample.to_le_bytes());
        }
        // Feed a loud frame then a silent one; the verdict should reflect
        // the silent (most recent) frame, not the stale loud one.
        let _ = gate.is_speech(&loud_frame).await;
        assert!(!gate.is_speech(&vec![0u8; 640]).await);
    }

    #[tokio::test]
    async fn reset_clears_accumulated_bytes() {
        let mut gate = gate();
        let _ = gate.is_speech(&[0u8; 100]).await;
        gate.reset();
        assert_eq!(gate.buffer.len(), 0);
    }

    #[tokio::test]
    async fn process_frames_drains_fifo() {
        let mut gate = gate();
        let verdicts = gate.process_frames(&vec![0u8; 640 * 2]).await;
        assert_eq!(verdicts.len(), 2);
        assert!(verdicts.iter().all(|v| !v));
    }
}
