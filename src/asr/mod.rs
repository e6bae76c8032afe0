//! Streaming speech recognition
//!
//! The engine itself (model loading, frame decoding, endpoint detection) sits
//! behind the [`engine`] traits; this module owns the per-session stream that
//! turns a continuous audio feed into ordered, segmented transcript events.

pub mod engine;
mod stream;

pub use engine::{AsrDecoder, AsrEngine};
pub use stream::AsrStream;

use serde::{Deserialize, Serialize};

/// One transcription event emitted by an [`AsrStream`]
///
/// Partial events (`finished = false`) may repeat with growing text as the
/// decoder refines its hypothesis; a final event closes the segment and the
/// next segment gets the following `idx`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEvent {
    /// Recognized text for the current segment
    pub text: String,
    /// Whether this event closes the segment
    pub finished: bool,
    /// Monotonically increasing segment index within the session
    pub idx: u64,
    /// Segment start time in seconds, when the decoder reports it
    pub start: f64,
    /// Segment end time in seconds, when the decoder reports it
    pub end: f64,
    /// Audio channel identifier for multi-channel decoders
    pub channel: Option<u32>,
}

impl TranscriptEvent {
    /// Build a partial (non-final) event
    #[must_use]
    pub fn partial(text: impl Into<String>, idx: u64) -> Self {
        Self {
            text: text.into(),
            finished: false,
            idx,
            start: 0.0,
            end: 0.0,
            channel: None,
        }
    }

    /// Build a final event closing segment `idx`
    #[must_use]
    pub fn fin(text: impl Into<String>, idx: u64) -> Self {
        Self {
            text: text.into(),
            finished: true,
            idx,
            start: 0.0,
            end: 0.0,
            channel: None,
        }
    }
}
