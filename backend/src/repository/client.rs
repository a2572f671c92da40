//! Repository operations over a tool session

use crate::bridge::{ToolArguments, ToolError, ToolSession};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

/// Names of the remote tools backing each repository operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolNames {
    /// Reads one file
    pub fetch_file: String,
    /// Creates a repository under the authenticated account
    pub create_repository: String,
    /// Creates or overwrites one file with a commit
    pub write_file: String,
}

impl Default for ToolNames {
    fn default() -> Self {
        Self {
            fetch_file: "get_file_contents".to_string(),
            create_repository: "create_repository".to_string(),
            write_file: "create_or_update_file".to_string(),
        }
    }
}

impl ToolNames {
    /// All tool names, for capability checks
    pub fn all(&self) -> [&str; 3] {
        [&self.fetch_file, &self.create_repository, &self.write_file]
    }
}

/// Outcome of [`RepositoryClient::create_repository`]
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    /// Repository was created
    Created,
    /// A repository with this name already exists; carries the server detail
    AlreadyExists(String),
    /// Any other failure
    Failed(ToolError),
}

/// Outcome of [`RepositoryClient::write_file`]
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// File was committed
    Written,
    /// The write failed
    Failed(ToolError),
}

/// GitHub-style file envelope returned by some servers
#[derive(Deserialize)]
struct FileEnvelope {
    content: String,
    #[serde(default)]
    encoding: Option<String>,
}

/// Repository operations bound to one session
pub struct RepositoryClient<'a> {
    session: &'a dyn ToolSession,
    tools: &'a ToolNames,
}

impl<'a> RepositoryClient<'a> {
    /// Bind the client to a session
    pub fn new(session: &'a dyn ToolSession, tools: &'a ToolNames) -> Self {
        Self { session, tools }
    }

    /// Fetch a file's content
    ///
    /// Returns `None` when the file is absent, empty, or the call fails.
    /// Missing candidate files are expected, so errors are logged and
    /// swallowed here.
    pub async fn fetch_file(&self, owner: &str, repo: &str, path: &str) -> Option<String> {
        let arguments = args(json!({
            "owner": owner,
            "repo": repo,
            "path": path,
        }));

        let result = match self.session.invoke(&self.tools.fetch_file, arguments).await {
            Ok(result) => result,
            Err(e) => {
                debug!(owner, repo, path, error = %e, "File not fetched, treating as absent");
                return None;
            }
        };

        let content = decode_file_payload(&result.text());
        if content.is_empty() {
            debug!(owner, repo, path, "File is empty, treating as absent");
            return None;
        }

        debug!(owner, repo, path, bytes = content.len(), "Fetched file");
        Some(content)
    }

    /// Create a repository under the authenticated account
    pub async fn create_repository(
        &self,
        name: &str,
        description: &str,
        private: bool,
    ) -> CreateOutcome {
        let arguments = args(json!({
            "name": name,
            "description": description,
            "private": private,
            "autoInit": true,
        }));

        match self
            .session
            .invoke(&self.tools.create_repository, arguments)
            .await
        {
            Ok(_) => {
                info!(repo = name, "Repository created");
                CreateOutcome::Created
            }
            Err(ToolError::ExecutionFailed { detail, .. }) if is_name_collision(&detail) => {
                warn!(repo = name, detail = %detail, "Repository name already taken");
                CreateOutcome::AlreadyExists(detail)
            }
            Err(e) => {
                warn!(repo = name, error = %e, "Repository creation failed");
                CreateOutcome::Failed(e)
            }
        }
    }

    /// Create or overwrite one file with a commit
    ///
    /// Writing the same path twice overwrites the first write.
    pub async fn write_file(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        content: &str,
        message: &str,
        branch: &str,
    ) -> WriteOutcome {
        let arguments = args(json!({
            "owner": owner,
            "repo": repo,
            "path": path,
            "content": content,
            "message": message,
            "branch": branch,
        }));

        match self.session.invoke(&self.tools.write_file, arguments).await {
            Ok(_) => {
                debug!(owner, repo, path, "File written");
                WriteOutcome::Written
            }
            Err(e) => {
                warn!(owner, repo, path, error = %e, "File write failed");
                WriteOutcome::Failed(e)
            }
        }
    }
}

/// Turn a `json!` object literal into tool arguments
fn args(value: Value) -> ToolArguments {
    match value {
        Value::Object(map) => map,
        _ => ToolArguments::new(),
    }
}

/// Servers phrase collisions differently; match the common wordings
fn is_name_collision(detail: &str) -> bool {
    let detail = detail.to_lowercase();
    detail.contains("already exists") || detail.contains("name already")
}

/// Unwrap a base64 file envelope, or return the payload as-is
fn decode_file_payload(payload: &str) -> String {
    let Ok(envelope) = serde_json::from_str::<FileEnvelope>(payload) else {
        return payload.to_string();
    };

    match envelope.encoding.as_deref() {
        Some("base64") => {
            // GitHub wraps base64 at 60 columns
            let compact: String = envelope
                .content
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect();
            match STANDARD.decode(compact) {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    warn!(error = %e, "Invalid base64 file content, using raw payload");
                    payload.to_string()
                }
            }
        }
        _ => envelope.content,
    }
}
