//! Process-backed tool session
//!
//! Spawns the tool server as a child process, injects the credential into
//! its environment, and speaks newline-delimited JSON-RPC over its
//! stdin/stdout. One request/response pair is in flight at a time.

use crate::bridge::error::ToolError;
use crate::bridge::protocol::{
    CallToolParams, CallToolResult, ClientInfo, InitializeParams, ListToolsResult, RpcError,
    RpcMessage, RpcRequest, RpcResponse, ToolArguments, ToolDescriptor, METHOD_INITIALIZE,
    METHOD_INITIALIZED, METHOD_NOT_FOUND, METHOD_PING, METHOD_TOOLS_CALL, METHOD_TOOLS_LIST,
    PROTOCOL_VERSION,
};
use crate::bridge::session::{Credential, SessionLauncher, ToolSession};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// How long `close` waits for the server to exit after stdin is closed
const GRACEFUL_EXIT: Duration = Duration::from_secs(2);

/// How to start the tool server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolServerConfig {
    /// Executable to run
    pub command: String,
    /// Arguments passed to the executable
    pub args: Vec<String>,
    /// Environment variable the credential is injected under
    pub credential_env_var: String,
    /// Upper bound on the handshake, in seconds
    pub handshake_timeout_secs: u64,
    /// Client name announced during the handshake
    pub client_name: String,
}

impl Default for ToolServerConfig {
    fn default() -> Self {
        Self {
            command: "npx".to_string(),
            args: vec![
                "-y".to_string(),
                "@modelcontextprotocol/server-github".to_string(),
            ],
            credential_env_var: "GITHUB_PERSONAL_ACCESS_TOKEN".to_string(),
            // npx may need to download the server on first use
            handshake_timeout_secs: 120,
            client_name: env!("CARGO_PKG_NAME").to_string(),
        }
    }
}

/// Launches one tool server process per session
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    config: ToolServerConfig,
}

impl ProcessLauncher {
    /// Create a launcher for the given server configuration
    pub fn new(config: ToolServerConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SessionLauncher for ProcessLauncher {
    async fn open_session(
        &self,
        credential: &Credential,
    ) -> Result<Box<dyn ToolSession>, ToolError> {
        let session = ProcessSession::spawn(&self.config, credential)?;

        let handshake = Duration::from_secs(self.config.handshake_timeout_secs);
        match timeout(handshake, session.handshake(&self.config.client_name)).await {
            Ok(Ok(())) => Ok(Box::new(session)),
            Ok(Err(e)) => {
                error!(
                    session_id = %session.session_id,
                    error = %e,
                    "Tool server handshake failed"
                );
                let _ = session.close().await;
                Err(ToolError::transport(format!("Handshake failed: {}", e.detail())))
            }
            Err(_) => {
                error!(
                    session_id = %session.session_id,
                    timeout_secs = handshake.as_secs(),
                    "Tool server handshake timed out"
                );
                let _ = session.close().await;
                Err(ToolError::transport(format!(
                    "Handshake did not complete within {} seconds",
                    handshake.as_secs()
                )))
            }
        }
    }
}

/// Stdin and stdout of the child, locked together so that a request and
/// its response are never interleaved with another request
struct SessionIo {
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

/// Why a single JSON-RPC request failed
enum RequestError {
    /// The connection itself failed
    Transport(String),
    /// The server answered with a JSON-RPC error object
    Remote(RpcError),
}

/// Handle to a running tool server process
pub struct ProcessSession {
    /// Child process handle (without stdin/stdout/stderr)
    child: Mutex<Option<Child>>,
    /// Request/response channel
    io: Mutex<Option<SessionIo>>,
    /// Task draining stderr into the log
    stderr: Mutex<Option<JoinHandle<()>>>,
    /// Next JSON-RPC request ID
    next_id: AtomicU64,
    /// Identifier used in log lines
    session_id: String,
}

impl ProcessSession {
    /// Spawn the server process without performing the handshake
    ///
    /// # Errors
    /// * `ToolError::TransportFailed` if the process cannot be started
    pub fn spawn(config: &ToolServerConfig, credential: &Credential) -> Result<Self, ToolError> {
        let session_id = Uuid::new_v4().to_string();
        debug!(
            session_id = %session_id,
            command = %config.command,
            args = ?config.args,
            "Spawning tool server"
        );

        let mut child = Command::new(&config.command)
            .args(&config.args)
            .env(&config.credential_env_var, credential.expose())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ToolError::transport(format!(
                    "Failed to spawn tool server '{}': {}",
                    config.command, e
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ToolError::transport("Failed to get stdin handle"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ToolError::transport("Failed to get stdout handle"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ToolError::transport("Failed to get stderr handle"))?;

        info!(
            session_id = %session_id,
            pid = child.id(),
            "Tool server spawned"
        );

        let session_id_for_stderr = session_id.clone();
        let stderr_handle = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if !line.trim().is_empty() {
                    debug!(session_id = %session_id_for_stderr, stderr = %line, "Tool server stderr");
                }
            }
        });

        Ok(Self {
            child: Mutex::new(Some(child)),
            io: Mutex::new(Some(SessionIo {
                stdin,
                stdout: BufReader::new(stdout),
            })),
            stderr: Mutex::new(Some(stderr_handle)),
            next_id: AtomicU64::new(1),
            session_id,
        })
    }

    /// Send `initialize` and the `initialized` notification
    pub async fn handshake(&self, client_name: &str) -> Result<(), ToolError> {
        let params = InitializeParams {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: json!({}),
            client_info: ClientInfo {
                name: client_name.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };
        let params = serde_json::to_value(params)
            .map_err(|e| ToolError::transport(format!("Failed to encode handshake: {}", e)))?;

        let server_info = self
            .request(METHOD_INITIALIZE, params)
            .await
            .map_err(|e| match e {
                RequestError::Transport(detail) => ToolError::transport(detail),
                RequestError::Remote(err) => ToolError::transport(format!(
                    "Server rejected initialize ({}): {}",
                    err.code, err.message
                )),
            })?;

        self.notify(METHOD_INITIALIZED).await?;

        let server = server_info
            .get("serverInfo")
            .cloned()
            .unwrap_or(Value::Null);
        info!(
            session_id = %self.session_id,
            server = %server,
            "Tool session initialized"
        );
        Ok(())
    }

    /// Send a notification (no response expected)
    async fn notify(&self, method: &str) -> Result<(), ToolError> {
        let mut io_guard = self.io.lock().await;
        let io = io_guard
            .as_mut()
            .ok_or_else(|| ToolError::transport("Session is closed"))?;
        write_line(&mut io.stdin, &RpcRequest::notification(method))
            .await
            .map_err(ToolError::transport)
    }

    /// Send a request and wait for the response with the matching ID
    async fn request(&self, method: &str, params: Value) -> Result<Value, RequestError> {
        let mut io_guard = self.io.lock().await;
        let io = io_guard
            .as_mut()
            .ok_or_else(|| RequestError::Transport("Session is closed".to_string()))?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(session_id = %self.session_id, id, method, "Sending tool server request");
        write_line(&mut io.stdin, &RpcRequest::call(id, method, params))
            .await
            .map_err(RequestError::Transport)?;

        loop {
            let mut line = String::new();
            let bytes_read = io
                .stdout
                .read_line(&mut line)
                .await
                .map_err(|e| RequestError::Transport(format!("Failed to read response: {}", e)))?;

            if bytes_read == 0 {
                return Err(RequestError::Transport(self.describe_exit().await));
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let message: RpcMessage = match serde_json::from_str(trimmed) {
                Ok(message) => message,
                Err(_) => {
                    debug!(session_id = %self.session_id, line = %trimmed, "Skipping non-JSON output");
                    continue;
                }
            };

            if message.answers(id) {
                if let Some(err) = message.error {
                    return Err(RequestError::Remote(err));
                }
                return Ok(message.result.unwrap_or(Value::Null));
            }

            if message.is_request() {
                // Servers may probe us while we wait
                let peer_id = message.id.clone().unwrap_or(Value::Null);
                let reply = match message.method.as_deref() {
                    Some(METHOD_PING) => RpcResponse::success(peer_id, json!({})),
                    Some(other) => RpcResponse::failure(
                        peer_id,
                        METHOD_NOT_FOUND,
                        format!("Method not supported by client: {}", other),
                    ),
                    None => continue,
                };
                write_line(&mut io.stdin, &reply)
                    .await
                    .map_err(RequestError::Transport)?;
                continue;
            }

            debug!(
                session_id = %self.session_id,
                method = ?message.method,
                "Skipping unrelated message"
            );
        }
    }

    /// Explain why stdout reached EOF
    async fn describe_exit(&self) -> String {
        let mut child_guard = self.child.lock().await;
        match child_guard.as_mut().map(|child| child.try_wait()) {
            Some(Ok(Some(status))) => {
                error!(session_id = %self.session_id, exit_status = ?status, "Tool server exited");
                format!("Tool server exited with status {:?}", status)
            }
            _ => "EOF while reading response (tool server may have exited)".to_string(),
        }
    }
}

#[async_trait]
impl ToolSession for ProcessSession {
    async fn invoke(
        &self,
        tool_name: &str,
        arguments: ToolArguments,
    ) -> Result<CallToolResult, ToolError> {
        let params = serde_json::to_value(CallToolParams {
            name: tool_name.to_string(),
            arguments,
        })
        .map_err(|e| ToolError::transport(format!("Failed to encode arguments: {}", e)))?;

        let raw = self
            .request(METHOD_TOOLS_CALL, params)
            .await
            .map_err(|e| match e {
                RequestError::Transport(detail) => ToolError::transport(detail),
                RequestError::Remote(err) => ToolError::execution(tool_name, err.message),
            })?;

        let result: CallToolResult = serde_json::from_value(raw).map_err(|e| {
            ToolError::transport(format!("Malformed result from '{}': {}", tool_name, e))
        })?;

        if result.is_error {
            let detail = result.text();
            debug!(session_id = %self.session_id, tool = tool_name, detail = %detail, "Tool reported error");
            return Err(ToolError::execution(tool_name, detail));
        }

        Ok(result)
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError> {
        let raw = self
            .request(METHOD_TOOLS_LIST, json!({}))
            .await
            .map_err(|e| match e {
                RequestError::Transport(detail) => ToolError::transport(detail),
                RequestError::Remote(err) => ToolError::execution(METHOD_TOOLS_LIST, err.message),
            })?;

        let listing: ListToolsResult = serde_json::from_value(raw)
            .map_err(|e| ToolError::transport(format!("Malformed tools/list result: {}", e)))?;
        Ok(listing.tools)
    }

    async fn close(&self) -> Result<(), ToolError> {
        // Dropping stdin signals EOF so the server can exit on its own
        drop(self.io.lock().await.take());

        let child = self.child.lock().await.take();
        if let Some(mut child) = child {
            match timeout(GRACEFUL_EXIT, child.wait()).await {
                Ok(Ok(status)) => {
                    debug!(session_id = %self.session_id, exit_status = ?status, "Tool server exited");
                }
                _ => {
                    warn!(session_id = %self.session_id, "Tool server did not exit, killing it");
                    child.kill().await.map_err(|e| {
                        ToolError::transport(format!("Failed to kill tool server: {}", e))
                    })?;
                }
            }
            info!(session_id = %self.session_id, "Tool session closed");
        }

        if let Some(handle) = self.stderr.lock().await.take() {
            handle.abort();
        }
        Ok(())
    }
}

impl Drop for ProcessSession {
    fn drop(&mut self) {
        // Can't await in Drop; start_kill is synchronous
        if let Ok(mut child_guard) = self.child.try_lock() {
            if let Some(mut child) = child_guard.take() {
                let _ = child.start_kill();
            }
        }
        if let Ok(mut stderr_guard) = self.stderr.try_lock() {
            if let Some(handle) = stderr_guard.take() {
                handle.abort();
            }
        }
    }
}

/// Serialize a message and write it as one line
async fn write_line<T: Serialize>(stdin: &mut ChildStdin, message: &T) -> Result<(), String> {
    let mut payload =
        serde_json::to_vec(message).map_err(|e| format!("Failed to serialize message: {}", e))?;
    payload.push(b'\n');
    stdin
        .write_all(&payload)
        .await
        .map_err(|e| format!("Failed to write to stdin: {}", e))?;
    stdin
        .flush()
        .await
        .map_err(|e| format!("Failed to flush stdin: {}", e))
}
