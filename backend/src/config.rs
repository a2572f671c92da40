//! Application configuration
//!
//! Centralized configuration management with environment variable support
//! and sensible defaults. A `.env` file, if present, is loaded by `main`
//! before this runs.

use crate::bridge::ToolServerConfig;
use crate::orchestrator::config::OrchestratorConfig;
use crate::path_mapper::{PathMapper, PathMappingError};
use std::env;
use std::str::FromStr;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An environment variable holds a value that does not parse
    #[error("Invalid value for {name}: '{value}'")]
    InvalidVar {
        /// Variable name
        name: &'static str,
        /// Offending value
        value: String,
    },

    /// The path mapping file could not be loaded
    #[error(transparent)]
    PathMapping(#[from] PathMappingError),

    /// A setting is out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Tool server process configuration
    pub tool_server: ToolServerConfig,
    /// Orchestrator configuration
    pub orchestrator: OrchestratorConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind the server to
    pub port: u16,
    /// Host address to bind to
    pub host: String,
}

impl Config {
    /// Load configuration from environment variables with defaults
    ///
    /// Unset or blank variables fall back to defaults. A variable that is
    /// set but does not parse is an error rather than silently ignored.
    pub fn from_env() -> Result<Self, ConfigError> {
        let tool_defaults = ToolServerConfig::default();
        let orch_defaults = OrchestratorConfig::default();

        let server = ServerConfig {
            port: parse_var("PORT")?.unwrap_or(8000),
            host: string_var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
        };

        let tool_server = ToolServerConfig {
            command: string_var("TOOL_SERVER_COMMAND").unwrap_or(tool_defaults.command),
            args: string_var("TOOL_SERVER_ARGS")
                .map(|args| args.split_whitespace().map(str::to_string).collect())
                .unwrap_or(tool_defaults.args),
            credential_env_var: string_var("TOOL_CREDENTIAL_ENV")
                .unwrap_or(tool_defaults.credential_env_var),
            handshake_timeout_secs: parse_var("TOOL_HANDSHAKE_TIMEOUT_SECS")?
                .unwrap_or(tool_defaults.handshake_timeout_secs),
            client_name: tool_defaults.client_name,
        };

        let path_mapping_table = match string_var("PATH_MAPPING_FILE") {
            Some(path) => PathMapper::from_json_file(path)?,
            None => orch_defaults.path_mapping_table,
        };

        let orchestrator = OrchestratorConfig {
            backend_url: string_var("OLLAMA_URL").unwrap_or(orch_defaults.backend_url),
            model_name: string_var("MODEL_NAME").unwrap_or(orch_defaults.model_name),
            context_window: parse_var("CONTEXT_WINDOW")?.unwrap_or(orch_defaults.context_window),
            temperature: parse_var("TEMPERATURE")?.unwrap_or(orch_defaults.temperature),
            candidate_filenames: string_var("CANDIDATE_FILES")
                .map(|files| split_list(&files))
                .unwrap_or(orch_defaults.candidate_filenames),
            path_mapping_table,
            max_concurrent_transforms: parse_var("MAX_CONCURRENT_TRANSFORMS")?
                .unwrap_or(orch_defaults.max_concurrent_transforms),
            target_branch: string_var("TARGET_BRANCH").unwrap_or(orch_defaults.target_branch),
            job_timeout_secs: parse_var("JOB_TIMEOUT_SECS")?.or(orch_defaults.job_timeout_secs),
            repository_description: orch_defaults.repository_description,
            private_repositories: orch_defaults.private_repositories,
            tool_names: orch_defaults.tool_names,
            repository_web_base: orch_defaults.repository_web_base,
            default_target_owner: string_var("DEFAULT_TARGET_OWNER"),
        };
        orchestrator.validate()?;

        Ok(Self {
            server,
            tool_server,
            orchestrator,
        })
    }

    /// Get the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// A set, non-blank variable
fn string_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// A set variable parsed as `T`
fn parse_var<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match string_var(name) {
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidVar { name, value }),
        None => Ok(None),
    }
}

/// Comma-separated list with blanks removed
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
