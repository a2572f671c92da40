//! Application state
//!
//! Shared, read-only state handed to every request handler.

use crate::bridge::{ProcessLauncher, SessionLauncher};
use crate::config::{Config, ConfigError};
use crate::orchestrator::Orchestrator;
use crate::transform::{GenerativeBackend, OllamaClient};
use std::sync::Arc;

/// State shared across handlers
pub struct AppState {
    /// Job runner
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    /// Wrap an existing orchestrator
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Wire the production collaborators: a process-backed tool bridge and
    /// the Ollama client
    ///
    /// # Errors
    /// * `ConfigError::Invalid` if the orchestrator configuration is invalid
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let launcher: Arc<dyn SessionLauncher> =
            Arc::new(ProcessLauncher::new(config.tool_server.clone()));
        let backend: Arc<dyn GenerativeBackend> = Arc::new(OllamaClient::new(
            reqwest::Client::new(),
            &config.orchestrator.backend_url,
        ));
        let orchestrator = Orchestrator::new(config.orchestrator.clone(), launcher, backend)?;
        Ok(Self::new(Arc::new(orchestrator)))
    }
}
