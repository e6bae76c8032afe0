//! Synthesis engine interface

use crate::Result;

/// PCM audio produced by a synthesis engine
#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    /// Normalized mono samples in `[-1.0, 1.0]`
    pub samples: Vec<f32>,
    /// The engine's native output rate in Hz; the stream resamples when it
    /// differs from the session's target rate
    pub sample_rate: u32,
}

/// A loaded synthesis model, cached process-wide per model identifier
///
/// `synthesize` is a blocking call; streams run it on the blocking thread
/// pool so one slow engine never stalls the session tasks.
pub trait TtsEngine: Send + Sync {
    /// Synthesize one sentence sub-unit
    ///
    /// `target_rate` is advisory: engines that can render at the requested
    /// rate directly should, otherwise they report their native rate and the
    /// stream resamples.
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails for this sub-unit; the stream skips
    /// the sub-unit and continues with the rest of the utterance
    fn synthesize(&self, text: &str, speaker: &str, target_rate: u32) -> Result<SynthesizedAudio>;
}
