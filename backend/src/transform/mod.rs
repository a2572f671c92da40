//! Transform module
//!
//! The generative backend seam, its Ollama implementation, and the
//! Transform Stage that rewrites artifacts through it.

pub mod backend;
pub mod ollama;
pub mod ollama_types;
pub mod stage;

pub use backend::{BackendError, GenerationOptions, GenerationRequest, GenerativeBackend};
pub use ollama::OllamaClient;
pub use stage::{TransformError, TransformOutcome, TransformStage};
