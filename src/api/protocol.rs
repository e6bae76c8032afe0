//! Control message protocol for the voice WebSocket

use serde::{Deserialize, Serialize};

use crate::session::SessionOverrides;

/// Incoming control message from the client
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    /// Keep-alive probe
    Ping,
    /// Start the voice pipeline with optional per-session overrides
    StartSession(SessionOverrides),
    /// Close the pipeline streams
    EndSession,
}

/// Outgoing typed event to the client
///
/// Transcription and synthesis-finished payloads are untagged dicts for
/// client compatibility and are serialized at their source instead.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Pong,
    SessionStarted {
        client_id: String,
        mode: String,
        pipeline: String,
        llm_model: String,
    },
    SessionEnded,
    Error {
        message: String,
    },
}
