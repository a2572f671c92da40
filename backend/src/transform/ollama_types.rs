//! Ollama API types
//!
//! Structs that mirror the `/api/generate` JSON format.

use serde::{Deserialize, Serialize};

/// Request body for `/api/generate`
#[derive(Serialize, Debug)]
pub struct GenerateRequest<'a> {
    /// Model name
    pub model: &'a str,
    /// User prompt
    pub prompt: &'a str,
    /// System directive
    pub system: &'a str,
    /// Always false; one response object per call
    pub stream: bool,
    /// Sampling options
    pub options: GenerateOptions,
}

/// Sampling options
#[derive(Serialize, Debug)]
pub struct GenerateOptions {
    /// Context window size in tokens
    pub num_ctx: u32,
    /// Sampling temperature
    pub temperature: f32,
}

/// Response body of a non-streaming `/api/generate` call
#[derive(Deserialize, Debug)]
pub struct GenerateResponse {
    /// Generated text
    #[serde(default)]
    pub response: String,
    /// Model that answered
    #[serde(default)]
    pub model: Option<String>,
    /// Whether generation finished
    #[serde(default)]
    pub done: bool,
}
