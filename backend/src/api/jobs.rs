//! Job API handlers
//!
//! `POST /convert-and-push` takes the HTML form fields; `POST /api/jobs`
//! takes the same fields as JSON. Both run the job to completion before
//! answering. If the client disconnects, the job is cancelled and its tool
//! server is shut down.

use crate::bridge::Credential;
use crate::error::AppError;
use crate::orchestrator::{ArtifactReport, JobReport, JobRequest, OrchestratorConfig};
use crate::state::AppState;
use axum::{
    extract::{
        rejection::{FormRejection, JsonRejection},
        State,
    },
    Form, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

/// Job submission
///
/// No `Debug`: it carries the caller's token.
#[derive(Deserialize)]
pub struct ConvertRequest {
    /// URL of the source repository
    pub source_url: String,
    /// Desired target repository name
    pub new_repo_name: String,
    /// Credential passed to the tool server
    pub github_token: String,
    /// Rewrite instructions
    pub instructions: String,
    /// Owner of the target repository (defaults to the configured owner)
    #[serde(default)]
    pub target_owner: Option<String>,
}

impl From<ConvertRequest> for JobRequest {
    fn from(request: ConvertRequest) -> Self {
        JobRequest {
            source_url: request.source_url,
            target_repo_name: request.new_repo_name,
            credential: Credential::new(request.github_token),
            instructions: request.instructions,
            target_owner: request.target_owner,
        }
    }
}

/// Successful job response
#[derive(Debug, Serialize, Deserialize)]
pub struct ConvertResponse {
    /// Always "success"
    pub status: String,
    /// Name of the created repository
    pub new_repo: String,
    /// Browser link to the created repository
    pub link: String,
    /// Job ID, for correlating logs
    pub job_id: Uuid,
    /// Per-artifact outcomes
    pub artifacts: Vec<ArtifactReport>,
}

impl From<JobReport> for ConvertResponse {
    fn from(report: JobReport) -> Self {
        Self {
            status: "success".to_string(),
            new_repo: report.target_repo,
            link: report.link,
            job_id: report.job_id,
            artifacts: report.artifacts,
        }
    }
}

/// Run a job submitted as form fields
///
/// Malformed bodies are answered with the same `{error, status}` shape as
/// job errors.
pub async fn convert_and_push(
    State(state): State<Arc<AppState>>,
    form: Result<Form<ConvertRequest>, FormRejection>,
) -> Result<Json<ConvertResponse>, AppError> {
    let Form(request) = form?;
    run_job(&state, request).await
}

/// Run a job submitted as JSON
pub async fn create_job(
    State(state): State<Arc<AppState>>,
    json: Result<Json<ConvertRequest>, JsonRejection>,
) -> Result<Json<ConvertResponse>, AppError> {
    let Json(request) = json?;
    run_job(&state, request).await
}

/// Non-secret orchestrator configuration
pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<OrchestratorConfig> {
    Json(state.orchestrator.config().clone())
}

async fn run_job(
    state: &AppState,
    request: ConvertRequest,
) -> Result<Json<ConvertResponse>, AppError> {
    info!(
        source_url = %request.source_url,
        new_repo_name = %request.new_repo_name,
        "Received conversion request"
    );

    // Dropping the handler future (client gone) cancels the job
    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let report = state.orchestrator.run(request.into(), cancel).await?;
    Ok(Json(ConvertResponse::from(report)))
}
