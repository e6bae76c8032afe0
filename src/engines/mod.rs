//! Engine catalog: lazy, process-wide model loading
//!
//! Loaders are registered at daemon construction. The first session to
//! request a model pays the load cost; later sessions share the cached
//! engine. Caches are keyed by model identifier and held for the lifetime
//! of the process.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::asr::AsrEngine;
use crate::tts::TtsEngine;
use crate::{Error, Result};

/// Builds an ASR engine for a model identifier
#[async_trait]
pub trait AsrEngineLoader: Send + Sync {
    /// Load the model behind `model`
    ///
    /// # Errors
    ///
    /// Returns error if the model files are missing or unloadable
    async fn load(&self, model: &str) -> Result<Arc<dyn AsrEngine>>;
}

/// Builds a TTS engine for a model identifier
#[async_trait]
pub trait TtsEngineLoader: Send + Sync {
    /// Load the model behind `model`
    ///
    /// # Errors
    ///
    /// Returns error if the model files are missing or unloadable
    async fn load(&self, model: &str) -> Result<Arc<dyn TtsEngine>>;
}

/// Registry of loaders plus the shared engine caches
pub struct EngineCatalog {
    asr_loaders: HashMap<String, Arc<dyn AsrEngineLoader>>,
    tts_loaders: HashMap<String, Arc<dyn TtsEngineLoader>>,
    asr_cache: Mutex<HashMap<String, Arc<dyn AsrEngine>>>,
    tts_cache: Mutex<HashMap<String, Arc<dyn TtsEngine>>>,
}

impl Default for EngineCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self {
            asr_loaders: HashMap::new(),
            tts_loaders: HashMap::new(),
            asr_cache: Mutex::new(HashMap::new()),
            tts_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Register an ASR loader under a model identifier
    pub fn register_asr(&mut self, model: impl Into<String>, loader: Arc<dyn AsrEngineLoader>) {
        self.asr_loaders.insert(model.into(), loader);
    }

    /// Register a TTS loader under a model identifier
    pub fn register_tts(&mut self, model: impl Into<String>, loader: Arc<dyn TtsEngineLoader>) {
        self.tts_loaders.insert(model.into(), loader);
    }

    /// Model identifiers with a registered ASR loader
    #[must_use]
    pub fn asr_models(&self) -> Vec<String> {
        self.asr_loaders.keys().cloned().collect()
    }

    /// Model identifiers with a registered TTS loader
    #[must_use]
    pub fn tts_models(&self) -> Vec<String> {
        self.tts_loaders.keys().cloned().collect()
    }

    /// Fetch the cached ASR engine for `model`, loading it on first use
    ///
    /// The cache lock is held across the load so concurrent sessions never
    /// load the same model twice.
    ///
    /// # Errors
    ///
    /// Returns error if no loader is registered for `model` or loading fails
    pub async fn asr(&self, model: &str) -> Result<Arc<dyn AsrEngine>> {
        let mut cache = self.asr_cache.lock().await;
        if let Some(engine) = cache.get(model) {
            return Ok(Arc::clone(engine));
        }

        let loader = self
            .asr_loaders
            .get(model)
            .ok_or_else(|| Error::Asr(format!("unknown ASR model: {model}")))?;

        tracing::info!(model, "loading ASR engine");
        let engine = loader.load(model).await?;
        cache.insert(model.to_string(), Arc::clone(&engine));
        Ok(engine)
    }

    /// Fetch the cached TTS engine for `model`, loading it on first use
    ///
    /// # Errors
    ///
    /// Returns error if no loader is registered for `model` or loading fails
    pub async fn tts(&self, model: &str) -> Result<Arc<dyn TtsEngine>> {
        let mut cache = self.tts_cache.lock().await;
        if let Some(engine) = cache.get(model) {
            return Ok(Arc::clone(engine));
        }

        let loader = self
            .tts_loaders
            .get(model)
            .ok_or_else(|| Error::Tts(format!("unknown TTS model: {model}")))?;

        tracing::info!(model, "loading TTS engine");
        let engine = loader.load(model).await?;
        cache.insert(model.to_string(), Arc::clone(&engine));
        Ok(engine)
    }
}
