//! Error types for the voxgate gateway

use thiserror::Error;

/// Result type alias for voxgate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the voxgate gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio framing/resampling error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech recognition error
    #[error("ASR error: {0}")]
    Asr(String),

    /// Speech synthesis error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Chat-completion endpoint error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Connection registry error
    #[error("registry error: {0}")]
    Registry(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
