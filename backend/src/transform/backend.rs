//! Generative backend contract
//!
//! The Transform Stage only needs single-shot text completion. Anything
//! that can turn a prompt plus system directive into text implements
//! [`GenerativeBackend`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sampling options forwarded to the backend
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Context window size in tokens
    pub context_window: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            context_window: 16384,
            temperature: 0.2,
        }
    }
}

/// One completion request
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Model name
    pub model: String,
    /// User prompt
    pub prompt: String,
    /// System directive
    pub system: String,
    /// Sampling options
    pub options: GenerationOptions,
}

/// Errors from a generative backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The request never got a response
    #[error("Backend request failed: {0}")]
    Request(String),

    /// The backend answered with a non-success status
    #[error("Backend returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, for diagnostics
        body: String,
    },

    /// The response body could not be decoded
    #[error("Failed to parse backend response: {0}")]
    InvalidResponse(String),

    /// The backend returned no text
    #[error("Backend returned an empty response")]
    EmptyResponse,
}

/// Single-shot text completion service
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Generate text for one request
    ///
    /// No timeout is applied here; callers cancel by dropping the future.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, BackendError>;
}
