//! In-process fakes for the tool bridge and the generative backend
//!
//! `FakeRepos` is an in-memory repository host shared by every session a
//! `FakeLauncher` opens, so tests can inspect what a job did after it
//! finished.

#![allow(dead_code)]

use async_trait::async_trait;
use repo_transformer_backend::bridge::{
    CallToolResult, Credential, SessionLauncher, ToolArguments, ToolDescriptor, ToolError,
    ToolSession,
};
use repo_transformer_backend::orchestrator::{Orchestrator, OrchestratorConfig};
use repo_transformer_backend::transform::{BackendError, GenerationRequest, GenerativeBackend};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One recorded `create_or_update_file` call
#[derive(Debug, Clone, PartialEq)]
pub struct WriteCall {
    pub owner: String,
    pub repo: String,
    pub path: String,
    pub content: String,
    pub message: String,
    pub branch: String,
}

/// Observable state of the fake host
#[derive(Debug, Default)]
pub struct RepoState {
    /// `owner/repo/path` -> content
    pub files: HashMap<String, String>,
    /// Repository names that already exist
    pub existing_repos: HashSet<String>,
    /// Names passed to `create_repository`
    pub create_calls: Vec<String>,
    /// Successful and failed writes, in call order
    pub writes: Vec<WriteCall>,
    /// Target paths whose write fails
    pub failing_writes: HashSet<String>,
    /// Credentials sessions were opened with
    pub credentials: Vec<String>,
    pub sessions_opened: usize,
    pub sessions_closed: usize,
    /// Every tool name invoked
    pub invocations: Vec<String>,
}

/// Shared handle to the fake host
#[derive(Clone, Default)]
pub struct FakeRepos {
    pub state: Arc<Mutex<RepoState>>,
}

impl FakeRepos {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, owner: &str, repo: &str, path: &str, content: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .files
            .insert(format!("{}/{}/{}", owner, repo, path), content.to_string());
        self
    }

    pub fn with_existing_repo(self, name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .existing_repos
            .insert(name.to_string());
        self
    }

    pub fn with_failing_write(self, path: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_writes
            .insert(path.to_string());
        self
    }

    pub fn snapshot<T>(&self, read: impl FnOnce(&RepoState) -> T) -> T {
        read(&self.state.lock().unwrap())
    }
}

/// Launcher handing out sessions against [`FakeRepos`]
pub struct FakeLauncher {
    repos: FakeRepos,
    fail_open: bool,
}

impl FakeLauncher {
    pub fn new(repos: FakeRepos) -> Self {
        Self {
            repos,
            fail_open: false,
        }
    }

    pub fn failing(repos: FakeRepos) -> Self {
        Self {
            repos,
            fail_open: true,
        }
    }
}

#[async_trait]
impl SessionLauncher for FakeLauncher {
    async fn open_session(
        &self,
        credential: &Credential,
    ) -> Result<Box<dyn ToolSession>, ToolError> {
        if self.fail_open {
            return Err(ToolError::transport("Failed to spawn tool server 'npx'"));
        }
        let mut state = self.repos.state.lock().unwrap();
        state.sessions_opened += 1;
        state.credentials.push(credential.expose().to_string());
        Ok(Box::new(FakeSession {
            repos: self.repos.clone(),
            closed: Mutex::new(false),
        }))
    }
}

/// Session against the fake host
pub struct FakeSession {
    repos: FakeRepos,
    closed: Mutex<bool>,
}

fn arg<'a>(arguments: &'a ToolArguments, key: &str) -> &'a str {
    arguments
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
}

#[async_trait]
impl ToolSession for FakeSession {
    async fn invoke(
        &self,
        tool_name: &str,
        arguments: ToolArguments,
    ) -> Result<CallToolResult, ToolError> {
        // Yield so concurrent callers interleave like they would over a pipe
        tokio::task::yield_now().await;

        let mut state = self.repos.state.lock().unwrap();
        state.invocations.push(tool_name.to_string());

        match tool_name {
            "get_file_contents" => {
                let key = format!(
                    "{}/{}/{}",
                    arg(&arguments, "owner"),
                    arg(&arguments, "repo"),
                    arg(&arguments, "path")
                );
                match state.files.get(&key) {
                    Some(content) => Ok(CallToolResult::from_text(content.clone(), false)),
                    None => Err(ToolError::execution(tool_name, "Not Found")),
                }
            }
            "create_repository" => {
                let name = arg(&arguments, "name").to_string();
                state.create_calls.push(name.clone());
                if !state.existing_repos.insert(name) {
                    return Err(ToolError::execution(
                        tool_name,
                        "Repository creation failed: name already exists on this account",
                    ));
                }
                Ok(CallToolResult::from_text("{}", false))
            }
            "create_or_update_file" => {
                let call = WriteCall {
                    owner: arg(&arguments, "owner").to_string(),
                    repo: arg(&arguments, "repo").to_string(),
                    path: arg(&arguments, "path").to_string(),
                    content: arg(&arguments, "content").to_string(),
                    message: arg(&arguments, "message").to_string(),
                    branch: arg(&arguments, "branch").to_string(),
                };
                let fails = state.failing_writes.contains(&call.path);
                state.writes.push(call);
                if fails {
                    return Err(ToolError::execution(tool_name, "409 Conflict"));
                }
                Ok(CallToolResult::from_text("{}", false))
            }
            other => Err(ToolError::execution(other, "Unknown tool")),
        }
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError> {
        Ok(["get_file_contents", "create_repository", "create_or_update_file"]
            .iter()
            .map(|name| ToolDescriptor {
                name: name.to_string(),
                description: None,
                input_schema: json!({"type": "object"}),
            })
            .collect())
    }

    async fn close(&self) -> Result<(), ToolError> {
        let mut closed = self.closed.lock().unwrap();
        if !*closed {
            *closed = true;
            self.repos.state.lock().unwrap().sessions_closed += 1;
        }
        Ok(())
    }
}

/// How the fake backend answers for one file
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail(BackendError),
    Delayed(Duration, String),
    Hang,
}

/// Backend keyed on the `FILE:` line of the prompt
#[derive(Default)]
pub struct FakeBackend {
    replies: HashMap<String, Reply>,
    default_hang: bool,
    pub requests: Mutex<Vec<GenerationRequest>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend that never answers
    pub fn hanging() -> Self {
        Self {
            default_hang: true,
            ..Self::default()
        }
    }

    pub fn reply(mut self, path: &str, reply: Reply) -> Self {
        self.replies.insert(path.to_string(), reply);
        self
    }
}

/// Path named on the prompt's `FILE:` line
pub fn prompt_path(prompt: &str) -> &str {
    prompt
        .lines()
        .next()
        .and_then(|line| line.strip_prefix("FILE: "))
        .unwrap_or_default()
}

#[async_trait]
impl GenerativeBackend for FakeBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, BackendError> {
        self.requests.lock().unwrap().push(request.clone());
        let path = prompt_path(&request.prompt).to_string();

        let reply = match self.replies.get(&path) {
            Some(reply) => reply.clone(),
            None if self.default_hang => Reply::Hang,
            None => Reply::Text(format!("// converted {}", path)),
        };

        match reply {
            Reply::Text(text) => Ok(text),
            Reply::Fail(error) => Err(error),
            Reply::Delayed(delay, text) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
            Reply::Hang => {
                std::future::pending::<()>().await;
                Ok(String::new())
            }
        }
    }
}

/// Orchestrator over the fakes with default configuration
pub fn orchestrator(repos: &FakeRepos, backend: FakeBackend) -> Orchestrator {
    orchestrator_with(OrchestratorConfig::default(), repos, backend)
}

/// Orchestrator over the fakes with a custom configuration
pub fn orchestrator_with(
    config: OrchestratorConfig,
    repos: &FakeRepos,
    backend: FakeBackend,
) -> Orchestrator {
    Orchestrator::new(
        config,
        Arc::new(FakeLauncher::new(repos.clone())),
        Arc::new(backend),
    )
    .expect("valid test configuration")
}
