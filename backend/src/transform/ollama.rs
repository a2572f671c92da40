//! Ollama API client
//!
//! HTTP client for a local or remote Ollama server's `/api/generate`
//! endpoint. No request timeout is set; large files on slow hardware can
//! take minutes.

use crate::transform::backend::{BackendError, GenerationRequest, GenerativeBackend};
use crate::transform::ollama_types::{GenerateOptions, GenerateRequest, GenerateResponse};
use async_trait::async_trait;

/// Path of the generate endpoint
const GENERATE_PATH: &str = "/api/generate";

/// Default endpoint when none is configured
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434/api/generate";

/// Client for Ollama's generate endpoint
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    endpoint: String,
}

impl OllamaClient {
    /// Create a client
    ///
    /// `url` may be the full generate endpoint or just the server base URL.
    pub fn new(client: reqwest::Client, url: &str) -> Self {
        Self {
            client,
            endpoint: normalize_endpoint(url),
        }
    }
}

/// Accept either a base URL or the full generate URL
pub fn normalize_endpoint(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return DEFAULT_OLLAMA_URL.to_string();
    }
    if trimmed.ends_with(GENERATE_PATH) {
        trimmed.to_string()
    } else {
        format!("{}{}", trimmed, GENERATE_PATH)
    }
}

#[async_trait]
impl GenerativeBackend for OllamaClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, BackendError> {
        let body = GenerateRequest {
            model: &request.model,
            prompt: &request.prompt,
            system: &request.system,
            stream: false,
            options: GenerateOptions {
                num_ctx: request.options.context_window,
                temperature: request.options.temperature,
            },
        };

        tracing::debug!(
            url = %self.endpoint,
            model = %request.model,
            prompt_len = request.prompt.len(),
            "Calling Ollama API"
        );

        // Shared client (connection pooling)
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());

            tracing::error!(
                status_code = status.as_u16(),
                error_body = %error_body,
                "Ollama API returned error status"
            );

            return Err(BackendError::Status {
                status: status.as_u16(),
                body: error_body,
            });
        }

        let response_body = response
            .text()
            .await
            .map_err(|e| BackendError::Request(format!("Failed to read response body: {}", e)))?;

        let parsed: GenerateResponse = serde_json::from_str(&response_body)
            .map_err(|e| BackendError::InvalidResponse(format!("{} - body: {}", e, response_body)))?;

        if parsed.response.trim().is_empty() {
            return Err(BackendError::EmptyResponse);
        }

        tracing::debug!(
            response_len = parsed.response.len(),
            model = ?parsed.model,
            done = parsed.done,
            "Received response from Ollama API"
        );

        Ok(parsed.response)
    }
}
