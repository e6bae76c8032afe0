//! Streaming speech synthesis
//!
//! Turns one response string into an ordered sequence of WAV audio chunks.
//! Synthesis engines live behind the [`engine`] trait; [`text`] holds the
//! normalization transforms and the sentence splitter.

pub mod engine;
mod stream;
pub mod text;

pub use engine::{SynthesizedAudio, TtsEngine};
pub use stream::TtsStream;
pub use text::{NumberExpansion, TextTransform};

use std::time::Duration;

use serde_json::json;

/// One synthesis event emitted by a [`TtsStream`]
///
/// Zero or more non-final chunk events per sentence sub-unit, then exactly
/// one final event per utterance carrying aggregate metadata.
#[derive(Debug, Clone)]
pub struct SynthesisEvent {
    /// WAV-encoded audio for one sub-unit; `None` on the final event
    pub audio: Option<Vec<u8>>,
    /// Whether this event closes the utterance
    pub finished: bool,
    /// Synthesis progress, 1.0 on the final event
    pub progress: f32,
    /// Wall-clock time spent synthesizing the utterance
    pub elapsed: Duration,
    /// Total duration in seconds of the generated audio
    pub audio_duration: f64,
    /// Total encoded byte size of the generated audio
    pub byte_size: usize,
}

impl SynthesisEvent {
    /// A non-final audio chunk
    #[must_use]
    pub fn chunk(audio: Vec<u8>) -> Self {
        Self {
            byte_size: audio.len(),
            audio: Some(audio),
            finished: false,
            progress: 0.0,
            elapsed: Duration::ZERO,
            audio_duration: 0.0,
        }
    }

    /// The final event closing an utterance
    #[must_use]
    pub const fn finished(elapsed: Duration, audio_duration: f64, byte_size: usize) -> Self {
        Self {
            audio: None,
            finished: true,
            progress: 1.0,
            elapsed,
            audio_duration,
            byte_size,
        }
    }

    /// Protocol-boundary notification payload
    #[must_use]
    pub fn to_notification(&self) -> serde_json::Value {
        json!({
            "progress": self.progress,
            "finished": self.finished,
            "elapsed": format!("{}ms", self.elapsed.as_millis()),
            "duration": format!("{:.2}s", self.audio_duration),
            "size": self.byte_size,
        })
    }
}
