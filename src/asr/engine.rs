//! Recognition engine interface
//!
//! An [`AsrEngine`] is a loaded acoustic model, cached process-wide per model
//! identifier. Engines are never decoded against directly: each session asks
//! the engine for its own [`AsrDecoder`] handle, which carries all
//! per-utterance state and is driven by a single decode loop.

use crate::Result;

/// A loaded recognition model
///
/// Must support creating independent per-session decoder handles; a single
/// handle is never shared across sessions.
pub trait AsrEngine: Send + Sync {
    /// Create a fresh decoder handle for one session
    ///
    /// # Errors
    ///
    /// Returns error if per-session state cannot be allocated
    fn create_decoder(&self) -> Result<Box<dyn AsrDecoder>>;
}

/// Per-session streaming decoder handle
///
/// Driven sequentially by one decode loop; implementations do not need to be
/// internally synchronized.
pub trait AsrDecoder: Send {
    /// Feed normalized samples at the given rate into the decoder
    fn accept(&mut self, sample_rate: u32, samples: &[f32]);

    /// Whether a fully buffered frame is ready to decode
    fn has_ready_frame(&self) -> bool;

    /// Decode the next ready frame
    ///
    /// # Errors
    ///
    /// Returns error on unrecoverable decoder failure; the stream treats
    /// this as fatal and terminates its decode loop
    fn decode_ready_frame(&mut self) -> Result<()>;

    /// Whether trailing silence indicates the utterance is complete
    fn is_endpoint(&self) -> bool;

    /// Current hypothesis text for the in-flight utterance
    fn current_text(&self) -> String;

    /// Clear per-utterance state ahead of the next segment
    fn reset_utterance(&mut self);

    /// Start/end times in seconds for the in-flight utterance, if tracked
    fn segment_bounds(&self) -> (f64, f64) {
        (0.0, 0.0)
    }
}
