//! Transform Stage
//!
//! Rewrites one artifact through the generative backend. A backend failure
//! never escapes this stage: the artifact falls back to its original
//! content and the error is handed back as a recovered outcome so the job
//! report can show it.

use crate::transform::backend::{
    BackendError, GenerationOptions, GenerationRequest, GenerativeBackend,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// System directive sent with every rewrite request
pub const SYSTEM_DIRECTIVE: &str = "You are an elite code refactoring engine. \
Output ONLY valid code. Do not use Markdown backticks. Do not chat.";

/// Why a rewrite fell back to the original content
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// The backend call failed
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The job was cancelled before the backend answered
    #[error("Transform cancelled")]
    Cancelled,

    /// The concurrency limiter was shut down
    #[error("Transform limiter closed")]
    LimiterClosed,
}

/// Result of transforming one artifact
#[derive(Debug, Clone, PartialEq)]
pub enum TransformOutcome {
    /// The backend produced new content
    Transformed(String),
    /// The backend failed; `content` is the original source
    Recovered {
        /// Original, unmodified source content
        content: String,
        /// What went wrong
        error: TransformError,
    },
}

impl TransformOutcome {
    /// Content to carry forward, whichever path was taken
    pub fn content(&self) -> &str {
        match self {
            TransformOutcome::Transformed(content) => content,
            TransformOutcome::Recovered { content, .. } => content,
        }
    }

    /// The recovered error, if the fallback path was taken
    pub fn error(&self) -> Option<&TransformError> {
        match self {
            TransformOutcome::Transformed(_) => None,
            TransformOutcome::Recovered { error, .. } => Some(error),
        }
    }

    /// Split into content and recovered error
    pub fn into_parts(self) -> (String, Option<TransformError>) {
        match self {
            TransformOutcome::Transformed(content) => (content, None),
            TransformOutcome::Recovered { content, error } => (content, Some(error)),
        }
    }
}

/// Build the user prompt for one artifact
pub fn build_prompt(path: &str, instructions: &str, source: &str) -> String {
    format!(
        "FILE: {}\nINSTRUCTION: {}\nSOURCE CODE:\n{}",
        path, instructions, source
    )
}

/// Per-artifact rewrite through a shared, rate-limited backend
#[derive(Clone)]
pub struct TransformStage {
    backend: Arc<dyn GenerativeBackend>,
    limiter: Arc<Semaphore>,
    model: String,
    options: GenerationOptions,
}

impl TransformStage {
    /// Create a stage allowing at most `max_concurrent` backend calls at once
    pub fn new(
        backend: Arc<dyn GenerativeBackend>,
        model: impl Into<String>,
        options: GenerationOptions,
        max_concurrent: usize,
    ) -> Self {
        Self {
            backend,
            limiter: Arc::new(Semaphore::new(max_concurrent.max(1))),
            model: model.into(),
            options,
        }
    }

    /// Rewrite one artifact, falling back to `source` on any failure
    pub async fn transform(
        &self,
        path: &str,
        source: &str,
        instructions: &str,
        cancel: &CancellationToken,
    ) -> TransformOutcome {
        match self.try_transform(path, source, instructions, cancel).await {
            Ok(content) => {
                debug!(path, bytes = content.len(), "Artifact transformed");
                TransformOutcome::Transformed(content)
            }
            Err(error) => {
                warn!(path, error = %error, "Transform failed, keeping original content");
                TransformOutcome::Recovered {
                    content: source.to_string(),
                    error,
                }
            }
        }
    }

    async fn try_transform(
        &self,
        path: &str,
        source: &str,
        instructions: &str,
        cancel: &CancellationToken,
    ) -> Result<String, TransformError> {
        let _permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TransformError::Cancelled),
            permit = self.limiter.acquire() => permit.map_err(|_| TransformError::LimiterClosed)?,
        };

        let request = GenerationRequest {
            model: self.model.clone(),
            prompt: build_prompt(path, instructions, source),
            system: SYSTEM_DIRECTIVE.to_string(),
            options: self.options,
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TransformError::Cancelled),
            result = self.backend.generate(&request) => Ok(result?),
        }
    }
}
