//! Job pipeline
//!
//! Runs one job end to end: parse, fetch, create target, transform,
//! push. A job owns exactly one tool session, opened after the request is
//! validated and closed once on every exit path.

use crate::bridge::{SessionLauncher, ToolError, ToolSession};
use crate::config::ConfigError;
use crate::orchestrator::config::OrchestratorConfig;
use crate::orchestrator::error::{JobError, TargetCreationReason};
use crate::orchestrator::job::{
    ArtifactFailure, ArtifactReport, ArtifactStatus, FileArtifact, JobPhase, JobReport,
    JobRequest, TransformJob,
};
use crate::path_mapper::PathMapper;
use crate::repository::{CreateOutcome, RepositoryClient, WriteOutcome};
use crate::sanitizer::sanitize;
use crate::transform::{GenerativeBackend, TransformStage};
use chrono::Utc;
use futures_util::future::join_all;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Runs transformation jobs
pub struct Orchestrator {
    config: OrchestratorConfig,
    launcher: Arc<dyn SessionLauncher>,
    stage: TransformStage,
}

impl Orchestrator {
    /// Create an orchestrator
    ///
    /// # Errors
    /// * `ConfigError::Invalid` if the configuration does not validate
    pub fn new(
        config: OrchestratorConfig,
        launcher: Arc<dyn SessionLauncher>,
        backend: Arc<dyn GenerativeBackend>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let stage = TransformStage::new(
            backend,
            config.model_name.clone(),
            config.generation_options(),
            config.max_concurrent_transforms,
        );
        Ok(Self {
            config,
            launcher,
            stage,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Run one job to completion
    ///
    /// Cancelling `cancel` (or exceeding the configured job timeout) stops
    /// all in-flight work and closes the tool session before returning.
    ///
    /// # Errors
    /// * Any job-fatal [`JobError`]; per-artifact failures are in the report
    pub async fn run(
        &self,
        request: JobRequest,
        cancel: CancellationToken,
    ) -> Result<JobReport, JobError> {
        let started_at = Utc::now();

        let job = TransformJob::from_request(request, self.config.default_target_owner.as_deref())
            .inspect_err(|e| {
                warn!(phase = %JobPhase::Parsing, error = %e, "Job rejected");
            })?;
        let job_id = job.job_id();

        info!(
            job_id = %job_id,
            source = %job.source(),
            target_owner = %job.target_owner(),
            target_repo = %job.target_repo_name(),
            "Job started"
        );

        let session = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(JobError::Cancelled),
            opened = self.launcher.open_session(job.credential()) => opened.map_err(|e| {
                error!(job_id = %job_id, error = %e, "Tool session unavailable");
                JobError::SessionUnavailable(e.to_string())
            })?,
        };

        let work_cancel = cancel.child_token();
        let timeout_secs = self.config.job_timeout_secs;
        let deadline = async move {
            match timeout_secs {
                Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
                None => std::future::pending::<()>().await,
            }
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(JobError::Cancelled),
            _ = deadline => Err(JobError::TimedOut(timeout_secs.unwrap_or_default())),
            result = self.execute(&job, session.as_ref(), &work_cancel) => result,
        };

        // Stop anything still holding the child token, then release the server
        work_cancel.cancel();
        if let Err(e) = session.close().await {
            warn!(job_id = %job_id, error = %e, "Failed to close tool session");
        }

        let artifacts = match outcome {
            Ok(artifacts) => artifacts,
            Err(e) => {
                error!(job_id = %job_id, phase = %JobPhase::Failed, error = %e, "Job failed");
                return Err(e);
            }
        };

        let report = JobReport {
            job_id,
            source: job.source().to_string(),
            target_owner: job.target_owner().to_string(),
            target_repo: job.target_repo_name().to_string(),
            link: self
                .config
                .repository_link(job.target_owner(), job.target_repo_name()),
            started_at,
            finished_at: Utc::now(),
            artifacts: artifacts.iter().map(ArtifactReport::from).collect(),
        };

        info!(
            job_id = %job_id,
            phase = %JobPhase::Completed,
            artifacts = report.artifacts.len(),
            pushed = report.pushed_count(),
            link = %report.link,
            "Job completed"
        );
        Ok(report)
    }

    /// Phases after the session is open
    async fn execute(
        &self,
        job: &TransformJob,
        session: &dyn ToolSession,
        cancel: &CancellationToken,
    ) -> Result<Vec<FileArtifact>, JobError> {
        let job_id = job.job_id();
        let client = RepositoryClient::new(session, &self.config.tool_names);

        self.check_capabilities(job, session).await;

        debug!(job_id = %job_id, phase = %JobPhase::Fetching, "Entering phase");
        let mut artifacts = self.fetch_artifacts(job, &client).await?;

        debug!(job_id = %job_id, phase = %JobPhase::CreatingTarget, "Entering phase");
        self.create_target(job, &client).await?;

        debug!(job_id = %job_id, phase = %JobPhase::Transforming, "Entering phase");
        self.transform_artifacts(job, &mut artifacts, cancel).await;
        if cancel.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        debug!(job_id = %job_id, phase = %JobPhase::Pushing, "Entering phase");
        self.push_artifacts(job, &client, &mut artifacts).await;

        Ok(artifacts)
    }

    /// Warn when the server does not advertise a tool we rely on
    async fn check_capabilities(&self, job: &TransformJob, session: &dyn ToolSession) {
        match session.list_tools().await {
            Ok(tools) => {
                for required in self.config.tool_names.all() {
                    if !tools.iter().any(|tool| tool.name == required) {
                        warn!(
                            job_id = %job.job_id(),
                            tool = required,
                            "Tool server does not advertise required tool"
                        );
                    }
                }
            }
            Err(e) => {
                debug!(job_id = %job.job_id(), error = %e, "Tool listing unavailable");
            }
        }
    }

    /// Fetch every candidate file; absent ones are dropped, order is kept
    async fn fetch_artifacts(
        &self,
        job: &TransformJob,
        client: &RepositoryClient<'_>,
    ) -> Result<Vec<FileArtifact>, JobError> {
        let source = job.source();
        let candidates: Vec<&str> = self
            .config
            .candidate_filenames
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .collect();

        let fetches = candidates
            .iter()
            .map(|name| client.fetch_file(&source.owner, &source.repo, name));
        let contents = join_all(fetches).await;

        let artifacts: Vec<FileArtifact> = candidates
            .iter()
            .zip(contents)
            .filter_map(|(name, content)| content.map(|c| FileArtifact::fetched(*name, c)))
            .collect();

        if artifacts.is_empty() {
            warn!(job_id = %job.job_id(), source = %source, "No candidate files found");
            return Err(JobError::NoFilesFound {
                owner: source.owner.clone(),
                repo: source.repo.clone(),
            });
        }

        info!(
            job_id = %job.job_id(),
            fetched = artifacts.len(),
            files = ?artifacts.iter().map(|a| a.original_path.as_str()).collect::<Vec<_>>(),
            "Fetched source files"
        );
        Ok(artifacts)
    }

    /// Create the destination repository
    async fn create_target(
        &self,
        job: &TransformJob,
        client: &RepositoryClient<'_>,
    ) -> Result<(), JobError> {
        let outcome = client
            .create_repository(
                job.target_repo_name(),
                &self.config.repository_description,
                self.config.private_repositories,
            )
            .await;

        let (reason, detail) = match outcome {
            CreateOutcome::Created => return Ok(()),
            CreateOutcome::AlreadyExists(detail) => (TargetCreationReason::NameCollision, detail),
            CreateOutcome::Failed(ToolError::TransportFailed(detail)) => {
                (TargetCreationReason::TransportFailed, detail)
            }
            CreateOutcome::Failed(ToolError::ExecutionFailed { detail, .. }) => {
                (TargetCreationReason::ExecutionFailed, detail)
            }
        };

        Err(JobError::TargetCreationFailed {
            repo: job.target_repo_name().to_string(),
            reason,
            detail,
        })
    }

    /// Rewrite all artifacts concurrently, then sanitize and map each one
    async fn transform_artifacts(
        &self,
        job: &TransformJob,
        artifacts: &mut [FileArtifact],
        cancel: &CancellationToken,
    ) {
        let rewrites = artifacts.iter().map(|artifact| {
            self.stage.transform(
                &artifact.original_path,
                &artifact.source_content,
                job.instructions(),
                cancel,
            )
        });
        let outcomes = join_all(rewrites).await;

        let mapper: &PathMapper = &self.config.path_mapping_table;
        for (artifact, outcome) in artifacts.iter_mut().zip(outcomes) {
            let (content, error) = outcome.into_parts();
            if let Some(e) = error {
                warn!(
                    job_id = %job.job_id(),
                    path = %artifact.original_path,
                    error = %e,
                    "Transform failed, original content kept"
                );
                artifact.record_failure(ArtifactFailure::TransformFailed {
                    detail: e.to_string(),
                });
            }
            artifact.status = ArtifactStatus::Transformed;

            artifact.transformed_content = sanitize(&content);
            artifact.target_path = mapper.map_path(&artifact.original_path, job.instructions());
            artifact.status = ArtifactStatus::Sanitized;

            debug!(
                job_id = %job.job_id(),
                path = %artifact.original_path,
                target_path = %artifact.target_path,
                "Artifact ready to push"
            );
        }

        reject_path_collisions(job, artifacts);
    }

    /// Write every artifact; failures are recorded, not fatal
    async fn push_artifacts(
        &self,
        job: &TransformJob,
        client: &RepositoryClient<'_>,
        artifacts: &mut [FileArtifact],
    ) {
        for artifact in artifacts.iter_mut() {
            if artifact.status == ArtifactStatus::Failed {
                continue;
            }
            let message = commit_message(&artifact.target_path);
            let outcome = client
                .write_file(
                    job.target_owner(),
                    job.target_repo_name(),
                    &artifact.target_path,
                    &artifact.transformed_content,
                    &message,
                    &self.config.target_branch,
                )
                .await;

            match outcome {
                WriteOutcome::Written => {
                    artifact.status = ArtifactStatus::Pushed;
                    info!(
                        job_id = %job.job_id(),
                        path = %artifact.target_path,
                        "Artifact pushed"
                    );
                }
                WriteOutcome::Failed(e) => {
                    warn!(
                        job_id = %job.job_id(),
                        path = %artifact.target_path,
                        error = %e,
                        "Artifact write failed"
                    );
                    artifact.record_failure(ArtifactFailure::WriteFailed {
                        detail: e.to_string(),
                    });
                }
            }
        }
    }
}

/// Fail every artifact whose target path was already claimed by an earlier
/// one, so a later write never overwrites an earlier artifact
fn reject_path_collisions(job: &TransformJob, artifacts: &mut [FileArtifact]) {
    let mut claimed: HashMap<String, String> = HashMap::new();
    for artifact in artifacts.iter_mut() {
        if let Some(owner) = claimed.get(&artifact.target_path).cloned() {
            warn!(
                job_id = %job.job_id(),
                path = %artifact.original_path,
                target_path = %artifact.target_path,
                conflicts_with = %owner,
                "Target path already taken, artifact not written"
            );
            artifact.record_failure(ArtifactFailure::PathCollision {
                conflicts_with: owner,
            });
        } else {
            claimed.insert(artifact.target_path.clone(), artifact.original_path.clone());
        }
    }
}

/// Commit message for one written file
pub fn commit_message(target_path: &str) -> String {
    let name = Path::new(target_path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(target_path);
    format!("AI Agent: Added {}", name)
}
