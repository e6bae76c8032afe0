//! Voxgate - real-time conversational voice pipeline server
//!
//! Clients stream microphone audio over a WebSocket; the server transcribes
//! it, generates a reply through an LLM endpoint, and streams synthesized
//! speech back.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                    Client                        │
//! │        PCM audio in  │  WAV audio + events out   │
//! └──────────────────────┬───────────────────────────┘
//!                        │ WebSocket
//! ┌──────────────────────▼───────────────────────────┐
//! │              Session Orchestrator                │
//! │   receive  │  ASR → LLM → TTS pipeline  │  send  │
//! └──────────────────────┬───────────────────────────┘
//!                        │
//! ┌──────────────────────▼───────────────────────────┐
//! │   Engine Catalog (ASR/TTS)  │  LLM endpoint      │
//! └──────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod asr;
pub mod audio;
pub mod config;
pub mod daemon;
pub mod engines;
pub mod error;
pub mod llm;
pub mod session;
pub mod tts;

pub use config::Config;
pub use daemon::Daemon;
pub use error::{Error, Result};
