//! Error types and error handling for the application
//!
//! This module defines the HTTP-facing error type. All errors implement
//! `IntoResponse` to provide consistent error formatting.

use crate::orchestrator::{JobError, TargetCreationReason};
use axum::{
    extract::rejection::{FormRejection, JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error types
#[derive(Error, Debug)]
pub enum AppError {
    /// The request itself is malformed
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A job failed
    #[error(transparent)]
    Job(#[from] JobError),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl From<FormRejection> for AppError {
    fn from(rejection: FormRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl AppError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Job(job) => match job {
                JobError::InvalidSource(_) | JobError::InvalidRequest(_) => {
                    StatusCode::BAD_REQUEST
                }
                JobError::NoFilesFound { .. } => StatusCode::NOT_FOUND,
                JobError::TargetCreationFailed { reason, .. } => match reason {
                    TargetCreationReason::NameCollision => StatusCode::CONFLICT,
                    TargetCreationReason::TransportFailed
                    | TargetCreationReason::ExecutionFailed => StatusCode::BAD_GATEWAY,
                },
                JobError::SessionUnavailable(_) => StatusCode::BAD_GATEWAY,
                JobError::TimedOut(_) => StatusCode::GATEWAY_TIMEOUT,
                // Only reachable when the client has already gone away
                JobError::Cancelled => StatusCode::REQUEST_TIMEOUT,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_error_status_codes() {
        let cases = [
            (
                AppError::Job(JobError::InvalidSource("x".to_string())),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::Job(JobError::NoFilesFound {
                    owner: "alice".to_string(),
                    repo: "widgets".to_string(),
                }),
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::Job(JobError::TargetCreationFailed {
                    repo: "widgets".to_string(),
                    reason: TargetCreationReason::NameCollision,
                    detail: "exists".to_string(),
                }),
                StatusCode::CONFLICT,
            ),
            (
                AppError::Job(JobError::SessionUnavailable("spawn".to_string())),
                StatusCode::BAD_GATEWAY,
            ),
            (
                AppError::Job(JobError::TimedOut(60)),
                StatusCode::GATEWAY_TIMEOUT,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.status_code(), expected, "for {}", error);
        }
    }

    #[tokio::test]
    async fn test_error_response_body() {
        let response = AppError::InvalidRequest("missing field".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], 400);
        assert_eq!(body["error"], "Invalid request: missing field");
    }
}
