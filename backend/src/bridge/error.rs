//! Tool bridge error types
//!
//! Errors that can occur while talking to the tool server (process
//! spawning, handshake, broken pipes, or a tool reporting failure).

use thiserror::Error;

/// Errors surfaced by a tool session
///
/// Callers interpret these differently: a fetch treats any error as an
/// absent file, repository creation treats it as fatal, and a write records
/// it against the artifact.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// The remote server answered, but reported that the tool call failed
    #[error("Tool '{tool}' failed: {detail}")]
    ExecutionFailed {
        /// Name of the tool that failed
        tool: String,
        /// Error text reported by the server
        detail: String,
    },

    /// The process exited, the pipe broke, or the handshake never completed
    #[error("Tool transport failed: {0}")]
    TransportFailed(String),
}

/// Coarse classification of a [`ToolError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolErrorKind {
    /// See [`ToolError::ExecutionFailed`]
    ExecutionFailed,
    /// See [`ToolError::TransportFailed`]
    TransportFailed,
}

impl ToolError {
    /// Build an execution failure for the given tool
    pub fn execution(tool: impl Into<String>, detail: impl Into<String>) -> Self {
        ToolError::ExecutionFailed {
            tool: tool.into(),
            detail: detail.into(),
        }
    }

    /// Build a transport failure
    pub fn transport(detail: impl Into<String>) -> Self {
        ToolError::TransportFailed(detail.into())
    }

    /// Classification of this error
    pub fn kind(&self) -> ToolErrorKind {
        match self {
            ToolError::ExecutionFailed { .. } => ToolErrorKind::ExecutionFailed,
            ToolError::TransportFailed(_) => ToolErrorKind::TransportFailed,
        }
    }

    /// The error detail without the variant prefix
    pub fn detail(&self) -> &str {
        match self {
            ToolError::ExecutionFailed { detail, .. } => detail,
            ToolError::TransportFailed(detail) => detail,
        }
    }
}
