//! Configuration management for the voxgate server

pub mod file;

use std::path::{Path, PathBuf};

use crate::audio::DEFAULT_SAMPLE_RATE;

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful voice assistant. Keep replies short and conversational.";

/// Voxgate server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP/WebSocket server configuration
    pub server: ServerConfig,

    /// Reply generation configuration
    pub llm: LlmConfig,

    /// Speech recognition configuration
    pub asr: AsrConfig,

    /// Speech synthesis configuration
    pub tts: TtsConfig,
}

/// HTTP/WebSocket server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,

    /// Listen port
    pub port: u16,

    /// Root directory for local model weights
    pub models_root: PathBuf,

    /// Inference threads per loaded engine, passed to backend loaders
    pub engine_threads: usize,
}

/// Reply generation configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Chat completions endpoint URL
    pub endpoint: String,

    /// Default model identifier, sessions may override per connection
    pub model: String,

    /// System prompt prepended to every conversation
    pub system_prompt: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Per-reply completion token cap
    pub max_tokens: u32,

    /// History token budget for request trimming
    pub history_max_tokens: usize,
}

/// Speech recognition configuration
#[derive(Debug, Clone)]
pub struct AsrConfig {
    /// Default recognizer model identifier
    pub model: String,

    /// Recognition language hint
    pub lang: String,

    /// Expected inbound sample rate in Hz
    pub sample_rate: u32,
}

/// Speech synthesis configuration
#[derive(Debug, Clone)]
pub struct TtsConfig {
    /// Default synthesizer model identifier
    pub model: String,

    /// Default speaker/voice identifier
    pub speaker: String,

    /// Outbound sample rate in Hz
    pub sample_rate: u32,

    /// Speaking-rate multiplier
    pub speed: f32,

    /// Split utterances on sentence punctuation before synthesis
    pub split: bool,
}

impl Config {
    /// Load configuration with precedence env > toml > default
    #[must_use]
    pub fn load(config_path: Option<&Path>) -> Self {
        let fc = file::load_config_file(config_path);

        let server = ServerConfig {
            host: std::env::var("VOXGATE_HOST")
                .ok()
                .or(fc.server.host)
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            port: std::env::var("VOXGATE_PORT")
                .or_else(|_| std::env::var("PORT"))
                .ok()
                .and_then(|s| s.parse().ok())
                .or(fc.server.port)
                .unwrap_or(8000),
            models_root: std::env::var("VOXGATE_MODELS_ROOT")
                .ok()
                .or(fc.server.models_root)
                .map_or_else(default_models_root, PathBuf::from),
            engine_threads: std::env::var("VOXGATE_ENGINE_THREADS")
                .ok()
                .and_then(|s| s.parse().ok())
                .or(fc.server.engine_threads)
                .unwrap_or(2),
        };

        let llm = LlmConfig {
            endpoint: std::env::var("VOXGATE_LLM_ENDPOINT")
                .ok()
                .or(fc.llm.endpoint)
                .unwrap_or_else(|| "http://localhost:8080/v1/chat/completions".to_string()),
            model: std::env::var("VOXGATE_LLM_MODEL")
                .ok()
                .or(fc.llm.model)
                .unwrap_or_else(|| "qwen2.5-7b-instruct".to_string()),
            system_prompt: std::env::var("VOXGATE_SYSTEM_PROMPT")
                .ok()
                .or(fc.llm.system_prompt)
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            temperature: std::env::var("VOXGATE_LLM_TEMPERATURE")
                .ok()
                .and_then(|s| s.parse().ok())
                .or(fc.llm.temperature)
                .unwrap_or(0.7),
            max_tokens: std::env::var("VOXGATE_LLM_MAX_TOKENS")
                .ok()
                .and_then(|s| s.parse().ok())
                .or(fc.llm.max_tokens)
                .unwrap_or(256),
            history_max_tokens: std::env::var("VOXGATE_HISTORY_MAX_TOKENS")
                .ok()
                .and_then(|s| s.parse().ok())
                .or(fc.llm.history_max_tokens)
                .unwrap_or(800),
        };

        let asr = AsrConfig {
            model: std::env::var("VOXGATE_ASR_MODEL")
                .ok()
                .or(fc.asr.model)
                .unwrap_or_else(|| "zipformer-en".to_string()),
            lang: std::env::var("VOXGATE_ASR_LANG")
                .ok()
                .or(fc.asr.lang)
                .unwrap_or_else(|| "en".to_string()),
            sample_rate: std::env::var("VOXGATE_ASR_SAMPLE_RATE")
                .ok()
                .and_then(|s| s.parse().ok())
                .or(fc.asr.sample_rate)
                .unwrap_or(DEFAULT_SAMPLE_RATE),
        };

        let tts = TtsConfig {
            model: std::env::var("VOXGATE_TTS_MODEL")
                .ok()
                .or(fc.tts.model)
                .unwrap_or_else(|| "vits-en".to_string()),
            speaker: std::env::var("VOXGATE_TTS_SPEAKER")
                .ok()
                .or(fc.tts.speaker)
                .unwrap_or_else(|| "0".to_string()),
            sample_rate: std::env::var("VOXGATE_TTS_SAMPLE_RATE")
                .ok()
                .and_then(|s| s.parse().ok())
                .or(fc.tts.sample_rate)
                .unwrap_or(DEFAULT_SAMPLE_RATE),
            speed: std::env::var("VOXGATE_TTS_SPEED")
                .ok()
                .and_then(|s| s.parse().ok())
                .or(fc.tts.speed)
                .unwrap_or(1.0),
            split: std::env::var("VOXGATE_TTS_SPLIT")
                .ok()
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .or(fc.tts.split)
                .unwrap_or(true),
        };

        Self {
            server,
            llm,
            asr,
            tts,
        }
    }
}

/// Default models directory: `~/.local/share/voxgate/models/`
fn default_models_root() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from(".local/share/voxgate/models"),
        |d| d.data_dir().join("voxgate").join("models"),
    )
}
