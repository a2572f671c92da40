//! Job-level error types
//!
//! Failures that end a job. Per-artifact failures never appear here; they
//! are recorded on the artifact and the job carries on.

use serde::Serialize;
use thiserror::Error;

/// Why the target repository could not be created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetCreationReason {
    /// A repository with that name already exists
    NameCollision,
    /// The tool server connection failed
    TransportFailed,
    /// The tool server reported a failure
    ExecutionFailed,
}

impl std::fmt::Display for TargetCreationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            TargetCreationReason::NameCollision => "name collision",
            TargetCreationReason::TransportFailed => "transport failed",
            TargetCreationReason::ExecutionFailed => "execution failed",
        };
        f.write_str(text)
    }
}

/// Errors that abort a job
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    /// The source URL does not name an owner and a repository
    #[error("Invalid source repository URL: {0}")]
    InvalidSource(String),

    /// A required request field is empty or malformed
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// None of the candidate files exist in the source repository
    #[error("No candidate files found in {owner}/{repo}")]
    NoFilesFound {
        /// Source owner
        owner: String,
        /// Source repository
        repo: String,
    },

    /// The destination repository could not be created
    #[error("Failed to create target repository '{repo}' ({reason}): {detail}")]
    TargetCreationFailed {
        /// Repository name that was attempted
        repo: String,
        /// Classified cause
        reason: TargetCreationReason,
        /// Server detail
        detail: String,
    },

    /// The tool server could not be started or did not complete the handshake
    #[error("Tool session unavailable: {0}")]
    SessionUnavailable(String),

    /// The job was cancelled by its caller
    #[error("Job cancelled")]
    Cancelled,

    /// The job exceeded its time limit
    #[error("Job timed out after {0} seconds")]
    TimedOut(u64),
}
