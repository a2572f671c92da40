//! Orchestrator configuration
//!
//! Everything a job needs to know besides its request, passed into the
//! orchestrator at construction.

use crate::config::ConfigError;
use crate::path_mapper::PathMapper;
use crate::repository::ToolNames;
use crate::transform::ollama::DEFAULT_OLLAMA_URL;
use crate::transform::GenerationOptions;
use serde::Serialize;

/// Files fetched from every source repository, in report order
pub const DEFAULT_CANDIDATE_FILES: [&str; 6] = [
    "app.py",
    "main.py",
    "requirements.txt",
    "Dockerfile",
    "package.json",
    "index.js",
];

/// Orchestrator configuration
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorConfig {
    /// Generative backend endpoint
    pub backend_url: String,
    /// Model name sent with every rewrite request
    pub model_name: String,
    /// Context window size in tokens
    pub context_window: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Files to look for in the source repository
    pub candidate_filenames: Vec<String>,
    /// Destination path policy
    pub path_mapping_table: PathMapper,
    /// Maximum number of backend calls in flight across all jobs
    pub max_concurrent_transforms: usize,
    /// Branch written to in the target repository
    pub target_branch: String,
    /// Per-job time limit in seconds (None = unlimited)
    pub job_timeout_secs: Option<u64>,
    /// Description given to created repositories
    pub repository_description: String,
    /// Whether created repositories are private
    pub private_repositories: bool,
    /// Remote tool names for each repository operation
    pub tool_names: ToolNames,
    /// Base of the browser link reported for a created repository
    pub repository_web_base: String,
    /// Target owner used when a request does not name one
    pub default_target_owner: Option<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_OLLAMA_URL.to_string(),
            model_name: "qwen2.5-coder:14b".to_string(),
            context_window: 16384,
            temperature: 0.2,
            candidate_filenames: DEFAULT_CANDIDATE_FILES
                .iter()
                .map(|name| name.to_string())
                .collect(),
            path_mapping_table: PathMapper::default(),
            max_concurrent_transforms: 4,
            target_branch: "main".to_string(),
            job_timeout_secs: None,
            repository_description: "Refactored by AI DevOps Agent".to_string(),
            private_repositories: true,
            tool_names: ToolNames::default(),
            repository_web_base: "https://github.com".to_string(),
            default_target_owner: None,
        }
    }
}

impl OrchestratorConfig {
    /// Reject settings no job could run with
    ///
    /// # Errors
    /// * `ConfigError::Invalid` naming the first offending setting
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_transforms == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent_transforms must be > 0".to_string(),
            ));
        }
        if self.model_name.trim().is_empty() {
            return Err(ConfigError::Invalid("model_name cannot be empty".to_string()));
        }
        if self.candidate_filenames.iter().all(|f| f.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "candidate_filenames cannot be empty".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::Invalid(format!(
                "temperature must be between 0 and 2, got {}",
                self.temperature
            )));
        }
        if self.context_window == 0 {
            return Err(ConfigError::Invalid("context_window must be > 0".to_string()));
        }
        if self.target_branch.trim().is_empty() {
            return Err(ConfigError::Invalid("target_branch cannot be empty".to_string()));
        }
        if self.job_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid("job_timeout_secs must be > 0".to_string()));
        }
        Ok(())
    }

    /// Sampling options for the generative backend
    pub fn generation_options(&self) -> GenerationOptions {
        GenerationOptions {
            context_window: self.context_window,
            temperature: self.temperature,
        }
    }

    /// Browser link for a repository
    pub fn repository_link(&self, owner: &str, repo: &str) -> String {
        format!(
            "{}/{}/{}",
            self.repository_web_base.trim_end_matches('/'),
            owner,
            repo
        )
    }
}
