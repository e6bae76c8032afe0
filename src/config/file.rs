//! TOML configuration file loading
//!
//! Supports `~/.config/voxgate/config.toml` as a persistent config source.
//! All fields are optional, the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct VoxgateConfigFile {
    /// Server/runtime configuration
    #[serde(default)]
    pub server: ServerFileConfig,

    /// LLM configuration
    #[serde(default)]
    pub llm: LlmFileConfig,

    /// Speech recognition configuration
    #[serde(default)]
    pub asr: AsrFileConfig,

    /// Speech synthesis configuration
    #[serde(default)]
    pub tts: TtsFileConfig,
}

/// Server/runtime configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// Bind address
    pub host: Option<String>,

    /// Listen port
    pub port: Option<u16>,

    /// Root directory for local model weights
    pub models_root: Option<String>,

    /// Inference threads per loaded engine
    pub engine_threads: Option<usize>,
}

/// LLM-related configuration
#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    /// Chat completions endpoint URL
    pub endpoint: Option<String>,

    /// Model identifier
    pub model: Option<String>,

    /// System prompt prepended to every conversation
    pub system_prompt: Option<String>,

    /// Sampling temperature
    pub temperature: Option<f32>,

    /// Per-reply completion token cap
    pub max_tokens: Option<u32>,

    /// History token budget for request trimming
    pub history_max_tokens: Option<usize>,
}

/// Speech recognition configuration
#[derive(Debug, Default, Deserialize)]
pub struct AsrFileConfig {
    /// Recognizer model identifier
    pub model: Option<String>,

    /// Recognition language hint
    pub lang: Option<String>,

    /// Expected inbound sample rate in Hz
    pub sample_rate: Option<u32>,
}

/// Speech synthesis configuration
#[derive(Debug, Default, Deserialize)]
pub struct TtsFileConfig {
    /// Synthesizer model identifier
    pub model: Option<String>,

    /// Default speaker/voice identifier
    pub speaker: Option<String>,

    /// Outbound sample rate in Hz
    pub sample_rate: Option<u32>,

    /// Speaking-rate multiplier
    pub speed: Option<f32>,

    /// Split utterances on sentence punctuation before synthesis
    pub split: Option<bool>,
}

/// Load a TOML config file, falling back to the standard path
///
/// Returns `VoxgateConfigFile::default()` if the file doesn't exist or can't
/// be parsed.
pub fn load_config_file(explicit: Option<&Path>) -> VoxgateConfigFile {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => match config_file_path() {
            Some(p) => p,
            None => return VoxgateConfigFile::default(),
        },
    };

    if !path.exists() {
        return VoxgateConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                VoxgateConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            VoxgateConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/voxgate/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("voxgate").join("config.toml"))
}
