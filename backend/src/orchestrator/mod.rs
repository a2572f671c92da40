//! Orchestrator module
//!
//! Owns the end-to-end job: source parsing, fetching candidate files,
//! target creation, concurrent transformation, and best-effort pushing.

pub mod config;
pub mod error;
pub mod job;
pub mod pipeline;

pub use config::OrchestratorConfig;
pub use error::{JobError, TargetCreationReason};
pub use job::{
    ArtifactFailure, ArtifactReport, ArtifactStatus, FileArtifact, JobPhase, JobReport,
    JobRequest, SourceCoordinates, TransformJob,
};
pub use pipeline::Orchestrator;
