//! Job and artifact types
//!
//! A [`TransformJob`] is built once per request from a [`JobRequest`] and
//! never changes afterwards. Each candidate file that exists becomes a
//! [`FileArtifact`] owned by that job; the final [`JobReport`] is what the
//! caller sees.

use crate::bridge::Credential;
use crate::orchestrator::error::JobError;
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Raw job input, as received from the caller
#[derive(Debug, Clone)]
pub struct JobRequest {
    /// URL of the source repository
    pub source_url: String,
    /// Desired name of the target repository (normalized later)
    pub target_repo_name: String,
    /// Credential for the tool server
    pub credential: Credential,
    /// Free-text rewrite instructions
    pub instructions: String,
    /// Owner of the target repository, if not the configured default
    pub target_owner: Option<String>,
}

/// Owner and name of the source repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCoordinates {
    /// Repository owner
    pub owner: String,
    /// Repository name
    pub repo: String,
}

impl fmt::Display for SourceCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Split a repository URL into owner and name
///
/// The URL path must be exactly `/<owner>/<repo>`, optionally with a
/// trailing slash or `.git` suffix. A missing scheme is read as `https`.
///
/// # Errors
/// * `JobError::InvalidSource` otherwise
pub fn parse_source_url(url: &str) -> Result<SourceCoordinates, JobError> {
    let invalid = || JobError::InvalidSource(url.to_string());

    let trimmed = url.trim();
    let parsed = if trimmed.contains("://") {
        Url::parse(trimmed)
    } else {
        Url::parse(&format!("https://{}", trimmed))
    }
    .map_err(|_| invalid())?;
    let segments: Vec<&str> = parsed
        .path_segments()
        .ok_or_else(invalid)?
        .filter(|segment| !segment.is_empty())
        .collect();

    match segments.as_slice() {
        [owner, repo] => {
            let repo = repo.strip_suffix(".git").unwrap_or(*repo);
            if repo.is_empty() {
                return Err(invalid());
            }
            Ok(SourceCoordinates {
                owner: owner.to_string(),
                repo: repo.to_string(),
            })
        }
        _ => Err(invalid()),
    }
}

/// Normalize a requested repository name: trimmed, spaces to dashes,
/// lower-cased
pub fn normalize_repo_name(name: &str) -> String {
    name.trim().replace(' ', "-").to_lowercase()
}

/// One validated job
#[derive(Debug, Clone)]
pub struct TransformJob {
    job_id: Uuid,
    source: SourceCoordinates,
    target_owner: String,
    target_repo_name: String,
    credential: Credential,
    instructions: String,
}

impl TransformJob {
    /// Validate a request and build a job from it
    ///
    /// `default_owner` is used when the request does not name a target owner.
    ///
    /// # Errors
    /// * `JobError::InvalidSource` if the source URL does not parse
    /// * `JobError::InvalidRequest` if the target name, owner, or credential
    ///   is missing
    pub fn from_request(
        request: JobRequest,
        default_owner: Option<&str>,
    ) -> Result<Self, JobError> {
        let source = parse_source_url(&request.source_url)?;

        let target_repo_name = normalize_repo_name(&request.target_repo_name);
        if target_repo_name.is_empty() {
            return Err(JobError::InvalidRequest(
                "target repository name is empty".to_string(),
            ));
        }

        let target_owner = request
            .target_owner
            .as_deref()
            .map(str::trim)
            .filter(|owner| !owner.is_empty())
            .or(default_owner.map(str::trim).filter(|owner| !owner.is_empty()))
            .ok_or_else(|| {
                JobError::InvalidRequest(
                    "target owner is required (no default owner configured)".to_string(),
                )
            })?
            .to_string();

        if request.credential.is_empty() {
            return Err(JobError::InvalidRequest("credential is empty".to_string()));
        }

        Ok(Self {
            job_id: Uuid::new_v4(),
            source,
            target_owner,
            target_repo_name,
            credential: request.credential,
            instructions: request.instructions,
        })
    }

    /// Unique job ID
    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Source repository
    pub fn source(&self) -> &SourceCoordinates {
        &self.source
    }

    /// Owner of the target repository
    pub fn target_owner(&self) -> &str {
        &self.target_owner
    }

    /// Normalized target repository name
    pub fn target_repo_name(&self) -> &str {
        &self.target_repo_name
    }

    /// Credential for the tool server
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Rewrite instructions
    pub fn instructions(&self) -> &str {
        &self.instructions
    }
}

/// Job state machine phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    /// Splitting the source URL
    Parsing,
    /// Reading candidate files
    Fetching,
    /// Creating the target repository
    CreatingTarget,
    /// Rewriting, sanitizing and mapping artifacts
    Transforming,
    /// Writing artifacts to the target
    Pushing,
    /// All writes attempted
    Completed,
    /// Job-level failure
    Failed,
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobPhase::Parsing => "parsing",
            JobPhase::Fetching => "fetching",
            JobPhase::CreatingTarget => "creating_target",
            JobPhase::Transforming => "transforming",
            JobPhase::Pushing => "pushing",
            JobPhase::Completed => "completed",
            JobPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Where an artifact is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    /// Not yet fetched
    Pending,
    /// Source content read
    Fetched,
    /// Rewrite attempted (content may be the fallback)
    Transformed,
    /// Fences stripped and destination path decided
    Sanitized,
    /// Written to the target repository
    Pushed,
    /// Not written (write failed or target path collided)
    Failed,
}

/// A recovered per-artifact failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArtifactFailure {
    /// The rewrite failed; original content was kept
    TransformFailed {
        /// Error detail
        detail: String,
    },
    /// The write to the target repository failed
    WriteFailed {
        /// Error detail
        detail: String,
    },
    /// Another artifact already maps to the same target path; not written
    PathCollision {
        /// Source path of the artifact that keeps the target path
        conflicts_with: String,
    },
}

/// One file moving through the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct FileArtifact {
    /// Path in the source repository
    pub original_path: String,
    /// Content read from the source
    pub source_content: String,
    /// Content after rewrite and sanitizing
    pub transformed_content: String,
    /// Path in the target repository
    pub target_path: String,
    /// Lifecycle status
    pub status: ArtifactStatus,
    /// Failures recorded along the way
    pub failures: Vec<ArtifactFailure>,
}

impl FileArtifact {
    /// A freshly fetched artifact
    pub fn fetched(original_path: impl Into<String>, source_content: impl Into<String>) -> Self {
        let original_path = original_path.into();
        Self {
            target_path: original_path.clone(),
            original_path,
            source_content: source_content.into(),
            transformed_content: String::new(),
            status: ArtifactStatus::Fetched,
            failures: Vec::new(),
        }
    }

    /// Record a failure; anything that prevents the write also marks the
    /// artifact failed
    pub fn record_failure(&mut self, failure: ArtifactFailure) {
        if matches!(
            failure,
            ArtifactFailure::WriteFailed { .. } | ArtifactFailure::PathCollision { .. }
        ) {
            self.status = ArtifactStatus::Failed;
        }
        self.failures.push(failure);
    }
}

/// Per-artifact outcome in the job report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactReport {
    /// Path in the source repository
    pub original_path: String,
    /// Path in the target repository
    pub target_path: String,
    /// Final status
    pub status: ArtifactStatus,
    /// Recovered failures
    pub failures: Vec<ArtifactFailure>,
}

impl From<&FileArtifact> for ArtifactReport {
    fn from(artifact: &FileArtifact) -> Self {
        Self {
            original_path: artifact.original_path.clone(),
            target_path: artifact.target_path.clone(),
            status: artifact.status,
            failures: artifact.failures.clone(),
        }
    }
}

/// Result of a completed job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReport {
    /// Job ID
    pub job_id: Uuid,
    /// Source repository, as `owner/repo`
    pub source: String,
    /// Owner of the created repository
    pub target_owner: String,
    /// Name of the created repository
    pub target_repo: String,
    /// Browser link to the created repository
    pub link: String,
    /// When the job started
    pub started_at: DateTime<Utc>,
    /// When the job finished
    pub finished_at: DateTime<Utc>,
    /// Per-artifact outcomes, in candidate-file order
    pub artifacts: Vec<ArtifactReport>,
}

impl JobReport {
    /// Number of artifacts written successfully
    pub fn pushed_count(&self) -> usize {
        self.artifacts
            .iter()
            .filter(|a| a.status == ArtifactStatus::Pushed)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> JobRequest {
        JobRequest {
            source_url: "https://github.com/alice/widgets".to_string(),
            target_repo_name: "  Widgets Java  ".to_string(),
            credential: Credential::new("token"),
            instructions: "convert to Java".to_string(),
            target_owner: None,
        }
    }

    #[test]
    fn test_parse_source_url() {
        let coords = parse_source_url("https://example.com/alice/widgets").unwrap();
        assert_eq!(coords.owner, "alice");
        assert_eq!(coords.repo, "widgets");
        assert_eq!(coords.to_string(), "alice/widgets");

        let coords = parse_source_url("https://github.com/alice/widgets.git/").unwrap();
        assert_eq!(coords.repo, "widgets");
    }

    #[test]
    fn test_parse_source_url_without_scheme() {
        let coords = parse_source_url("github.com/alice/widgets").unwrap();
        assert_eq!(coords.owner, "alice");
        assert_eq!(coords.repo, "widgets");

        let coords = parse_source_url("www.github.com/alice/widgets/").unwrap();
        assert_eq!(coords.to_string(), "alice/widgets");
    }

    #[test]
    fn test_parse_source_url_rejects_wrong_segment_count() {
        for url in [
            "https://github.com/alice",
            "https://github.com/",
            "https://github.com/alice/widgets/tree/main",
            "not a url",
            "alice/widgets",
            "https://github.com/alice/.git",
        ] {
            assert!(
                matches!(parse_source_url(url), Err(JobError::InvalidSource(_))),
                "expected InvalidSource for {}",
                url
            );
        }
    }

    #[test]
    fn test_normalize_repo_name() {
        assert_eq!(normalize_repo_name("  My Cool Repo "), "my-cool-repo");
        assert_eq!(normalize_repo_name("widgets"), "widgets");
    }

    #[test]
    fn test_job_from_request_normalizes_and_uses_default_owner() {
        let job = TransformJob::from_request(request(), Some("bob")).unwrap();
        assert_eq!(job.target_repo_name(), "widgets-java");
        assert_eq!(job.target_owner(), "bob");
        assert_eq!(job.source().owner, "alice");
        assert_eq!(job.instructions(), "convert to Java");
    }

    #[test]
    fn test_explicit_target_owner_wins() {
        let mut req = request();
        req.target_owner = Some(" carol ".to_string());
        let job = TransformJob::from_request(req, Some("bob")).unwrap();
        assert_eq!(job.target_owner(), "carol");
    }

    #[test]
    fn test_missing_owner_is_invalid_request() {
        let result = TransformJob::from_request(request(), None);
        assert!(matches!(result, Err(JobError::InvalidRequest(_))));
    }

    #[test]
    fn test_blank_name_or_credential_is_invalid_request() {
        let mut req = request();
        req.target_repo_name = "   ".to_string();
        assert!(matches!(
            TransformJob::from_request(req, Some("bob")),
            Err(JobError::InvalidRequest(_))
        ));

        let mut req = request();
        req.credential = Credential::new("");
        assert!(matches!(
            TransformJob::from_request(req, Some("bob")),
            Err(JobError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_write_failure_marks_artifact_failed() {
        let mut artifact = FileArtifact::fetched("app.py", "print(1)");
        artifact.record_failure(ArtifactFailure::TransformFailed {
            detail: "boom".to_string(),
        });
        assert_eq!(artifact.status, ArtifactStatus::Fetched);

        artifact.record_failure(ArtifactFailure::WriteFailed {
            detail: "conflict".to_string(),
        });
        assert_eq!(artifact.status, ArtifactStatus::Failed);
        assert_eq!(artifact.failures.len(), 2);
    }

    #[test]
    fn test_artifact_failure_serializes_with_kind_tag() {
        let json = serde_json::to_value(ArtifactFailure::WriteFailed {
            detail: "conflict".to_string(),
        })
        .unwrap();
        assert_eq!(json["kind"], "write_failed");
        assert_eq!(json["detail"], "conflict");
    }
}
