//! Daemon - the voice pipeline service
//!
//! Wires the engine catalog, LLM client, and connection registry into the
//! API server and runs it.

use std::sync::Arc;

use crate::api::{ApiServer, ApiState, connections::ConnectionRegistry};
use crate::config::Config;
use crate::engines::EngineCatalog;
use crate::llm::LlmClient;
use crate::Result;

/// The voxgate daemon
pub struct Daemon {
    config: Config,
    engines: EngineCatalog,
}

impl Daemon {
    /// Create a new daemon instance
    pub fn new(config: Config) -> Self {
        tracing::info!(
            models_root = %config.server.models_root.display(),
            llm_endpoint = %config.llm.endpoint,
            "daemon initialized"
        );
        Self {
            config,
            engines: EngineCatalog::new(),
        }
    }

    /// Mutable access to the engine catalog for loader registration
    ///
    /// Backends register their ASR/TTS loaders here before `run`.
    pub fn engines_mut(&mut self) -> &mut EngineCatalog {
        &mut self.engines
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Run the daemon until interrupted
    ///
    /// # Errors
    ///
    /// Returns error if the LLM client or API server fails to start
    pub async fn run(self) -> Result<()> {
        let llm = Arc::new(LlmClient::new(
            self.config.llm.endpoint.clone(),
            self.config.llm.temperature,
            self.config.llm.max_tokens,
        )?);

        let state = Arc::new(ApiState {
            config: self.config,
            engines: Arc::new(self.engines),
            llm,
            connections: Arc::new(ConnectionRegistry::new()),
        });

        ApiServer::new(state).run().await
    }
}
