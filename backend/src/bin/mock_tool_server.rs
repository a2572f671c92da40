//! Mock tool server
//!
//! Speaks the same newline-delimited JSON-RPC protocol as the real
//! repository tool server, backed by an in-memory store. Used by the
//! bridge integration tests.
//!
//! Flags:
//! * `--files <json>` - JSON object mapping `owner/repo/path` to content
//! * `--existing-repos <a,b>` - repository names that already exist
//! * `--token-env <VAR>` - variable holding the credential (default `GITHUB_PERSONAL_ACCESS_TOKEN`)
//! * `--base64` - return files as base64 envelopes
//! * `--exit-on-init` - exit instead of answering `initialize`
//! * `--crash-on <tool>` - exit when this tool is called
//! * `--ping` - ping the client before answering each tool call

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use std::env;
use std::io::{self, BufRead, Write};

struct Store {
    files: HashMap<String, String>,
    repos: HashSet<String>,
    token: Option<String>,
    base64: bool,
    exit_on_init: bool,
    crash_on: Option<String>,
    ping: bool,
    pings_sent: u64,
}

impl Store {
    fn from_args(args: &[String]) -> Self {
        let value_of = |flag: &str| {
            args.iter()
                .position(|a| a == flag)
                .and_then(|i| args.get(i + 1))
                .cloned()
        };
        let has = |flag: &str| args.iter().any(|a| a == flag);

        let files = value_of("--files")
            .and_then(|raw| serde_json::from_str::<HashMap<String, String>>(&raw).ok())
            .unwrap_or_default();
        let repos = value_of("--existing-repos")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect();
        let token_var =
            value_of("--token-env").unwrap_or_else(|| "GITHUB_PERSONAL_ACCESS_TOKEN".to_string());

        Self {
            files,
            repos,
            token: env::var(token_var).ok().filter(|t| !t.is_empty()),
            base64: has("--base64"),
            exit_on_init: has("--exit-on-init"),
            crash_on: value_of("--crash-on"),
            ping: has("--ping"),
            pings_sent: 0,
        }
    }

    fn call(&mut self, name: &str, args: &Map<String, Value>) -> Result<Value, Value> {
        if self.crash_on.as_deref() == Some(name) {
            eprintln!("mock tool server: crashing on {}", name);
            std::process::exit(2);
        }
        if self.token.is_none() {
            return Ok(tool_error("Bad credentials"));
        }

        let arg = |key: &str| args.get(key).and_then(Value::as_str).unwrap_or_default();

        match name {
            "get_file_contents" => {
                let key = format!("{}/{}/{}", arg("owner"), arg("repo"), arg("path"));
                match self.files.get(&key) {
                    Some(content) if self.base64 => Ok(tool_text(
                        json!({
                            "name": arg("path"),
                            "path": arg("path"),
                            "encoding": "base64",
                            "content": STANDARD.encode(content),
                        })
                        .to_string(),
                    )),
                    Some(content) => Ok(tool_text(content.clone())),
                    None => Ok(tool_error(&format!("Not Found: {}", key))),
                }
            }
            "create_repository" => {
                let repo = arg("name").to_string();
                if !self.repos.insert(repo.clone()) {
                    return Ok(tool_error(
                        "Repository creation failed: name already exists on this account",
                    ));
                }
                Ok(tool_text(json!({ "full_name": repo, "private": args.get("private") }).to_string()))
            }
            "create_or_update_file" => {
                let repo = arg("repo");
                if !self.repos.contains(repo) {
                    return Ok(tool_error(&format!("Not Found: repository {}", repo)));
                }
                let key = format!("{}/{}/{}", arg("owner"), repo, arg("path"));
                self.files.insert(key.clone(), arg("content").to_string());
                eprintln!("mock tool server: wrote {} ({})", key, arg("message"));
                Ok(tool_text(json!({ "commit": { "message": arg("message") } }).to_string()))
            }
            other => Err(json!({ "code": -32602, "message": format!("Unknown tool: {}", other) })),
        }
    }
}

fn tool_text(text: String) -> Value {
    json!({ "content": [{ "type": "text", "text": text }], "isError": false })
}

fn tool_error(text: &str) -> Value {
    json!({ "content": [{ "type": "text", "text": text }], "isError": true })
}

fn tools() -> Value {
    let names = ["get_file_contents", "create_repository", "create_or_update_file"];
    json!({
        "tools": names
            .iter()
            .map(|n| json!({ "name": n, "description": n, "inputSchema": { "type": "object" } }))
            .collect::<Vec<_>>()
    })
}

fn send(out: &mut impl Write, message: &Value) -> io::Result<()> {
    writeln!(out, "{}", message)?;
    out.flush()
}

fn main() -> io::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let mut store = Store::from_args(&args);
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    eprintln!("mock tool server running on stdio");
    // Real servers sometimes log to stdout; the client must skip this
    writeln!(stdout, "mock tool server ready")?;

    for line in stdin.lock().lines() {
        let line = line?;
        let Ok(message) = serde_json::from_str::<Value>(&line) else {
            continue;
        };
        let (Some(id), Some(method)) = (
            message.get("id").cloned(),
            message.get("method").and_then(Value::as_str),
        ) else {
            // Notifications and responses to our pings
            continue;
        };
        let params = message.get("params").cloned().unwrap_or(Value::Null);

        let reply = match method {
            "initialize" => {
                if store.exit_on_init {
                    eprintln!("mock tool server: exiting during initialize");
                    std::process::exit(1);
                }
                Ok(json!({
                    "protocolVersion": params.get("protocolVersion").cloned().unwrap_or(json!("2024-11-05")),
                    "capabilities": { "tools": {} },
                    "serverInfo": { "name": "mock-tool-server", "version": "0.1.0" }
                }))
            }
            "tools/list" => Ok(tools()),
            "tools/call" => {
                if store.ping {
                    store.pings_sent += 1;
                    send(
                        &mut stdout,
                        &json!({ "jsonrpc": "2.0", "id": format!("srv-{}", store.pings_sent), "method": "ping" }),
                    )?;
                    send(
                        &mut stdout,
                        &json!({ "jsonrpc": "2.0", "method": "notifications/message", "params": { "level": "info" } }),
                    )?;
                }
                let name = params.get("name").and_then(Value::as_str).unwrap_or_default();
                let empty = Map::new();
                let args = params
                    .get("arguments")
                    .and_then(Value::as_object)
                    .unwrap_or(&empty);
                store.call(name, args)
            }
            other => Err(json!({ "code": -32601, "message": format!("Method not found: {}", other) })),
        };

        let response = match reply {
            Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
            Err(error) => json!({ "jsonrpc": "2.0", "id": id, "error": error }),
        };
        send(&mut stdout, &response)?;
    }

    Ok(())
}
