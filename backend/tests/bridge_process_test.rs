//! Tests for the process-backed tool session
//!
//! These spawn the `mock_tool_server` binary built alongside the crate and
//! talk to it over real pipes.

use repo_transformer_backend::bridge::{
    Credential, ProcessLauncher, SessionLauncher, ToolArguments, ToolError, ToolErrorKind,
    ToolServerConfig, ToolSession,
};
use repo_transformer_backend::repository::{
    CreateOutcome, RepositoryClient, ToolNames, WriteOutcome,
};
use serde_json::json;

const TOKEN_ENV: &str = "MOCK_TOOL_TOKEN";

fn launcher(extra_args: &[&str]) -> ProcessLauncher {
    let mut args = vec!["--token-env".to_string(), TOKEN_ENV.to_string()];
    args.extend(extra_args.iter().map(|a| a.to_string()));
    ProcessLauncher::new(ToolServerConfig {
        command: env!("CARGO_BIN_EXE_mock_tool_server").to_string(),
        args,
        credential_env_var: TOKEN_ENV.to_string(),
        handshake_timeout_secs: 10,
        ..Default::default()
    })
}

fn files(entries: &[(&str, &str)]) -> String {
    let map: serde_json::Map<String, serde_json::Value> = entries
        .iter()
        .map(|(k, v)| (k.to_string(), json!(v)))
        .collect();
    serde_json::Value::Object(map).to_string()
}

fn arguments(value: serde_json::Value) -> ToolArguments {
    value.as_object().cloned().unwrap_or_default()
}

#[tokio::test]
async fn test_handshake_and_list_tools() {
    let session = launcher(&[])
        .open_session(&Credential::new("ghp_test"))
        .await
        .expect("handshake should succeed");

    let tools = session.list_tools().await.unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    assert!(names.contains(&"get_file_contents"));
    assert!(names.contains(&"create_repository"));
    assert!(names.contains(&"create_or_update_file"));

    session.close().await.unwrap();
}

#[tokio::test]
async fn test_invoke_round_trip_through_repository_client() {
    let file_map = files(&[("alice/widgets/app.py", "print(1)")]);
    let session = launcher(&["--files", &file_map])
        .open_session(&Credential::new("ghp_test"))
        .await
        .unwrap();
    let tools = ToolNames::default();
    let client = RepositoryClient::new(session.as_ref(), &tools);

    assert_eq!(
        client.fetch_file("alice", "widgets", "app.py").await.as_deref(),
        Some("print(1)")
    );
    assert!(client.fetch_file("alice", "widgets", "main.py").await.is_none());

    assert_eq!(
        client.create_repository("widgets-java", "desc", true).await,
        CreateOutcome::Created
    );
    assert!(matches!(
        client.create_repository("widgets-java", "desc", true).await,
        CreateOutcome::AlreadyExists(_)
    ));

    let written = client
        .write_file(
            "alice",
            "widgets-java",
            "src/main/java/com/app/App.java",
            "public class App {}",
            "AI Agent: Added App.java",
            "main",
        )
        .await;
    assert_eq!(written, WriteOutcome::Written);

    // Writing twice to the same path overwrites
    client
        .write_file(
            "alice",
            "widgets-java",
            "src/main/java/com/app/App.java",
            "public class App { }",
            "AI Agent: Added App.java",
            "main",
        )
        .await;
    assert_eq!(
        client
            .fetch_file("alice", "widgets-java", "src/main/java/com/app/App.java")
            .await
            .as_deref(),
        Some("public class App { }")
    );

    session.close().await.unwrap();
}

#[tokio::test]
async fn test_base64_envelope_is_decoded() {
    let file_map = files(&[("alice/widgets/Dockerfile", "FROM python:3.12\n")]);
    let session = launcher(&["--files", &file_map, "--base64"])
        .open_session(&Credential::new("ghp_test"))
        .await
        .unwrap();
    let tools = ToolNames::default();
    let client = RepositoryClient::new(session.as_ref(), &tools);

    assert_eq!(
        client.fetch_file("alice", "widgets", "Dockerfile").await.as_deref(),
        Some("FROM python:3.12\n")
    );
    session.close().await.unwrap();
}

#[tokio::test]
async fn test_tool_error_is_execution_failure() {
    let session = launcher(&[])
        .open_session(&Credential::new("ghp_test"))
        .await
        .unwrap();

    let err = session
        .invoke(
            "get_file_contents",
            arguments(json!({"owner": "a", "repo": "b", "path": "missing.py"})),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ToolErrorKind::ExecutionFailed);
    assert!(err.detail().contains("Not Found"));

    // JSON-RPC error objects are execution failures too
    let err = session
        .invoke("no_such_tool", ToolArguments::new())
        .await
        .unwrap_err();
    assert_eq!(err, ToolError::execution("no_such_tool", "Unknown tool: no_such_tool"));

    session.close().await.unwrap();
}

#[tokio::test]
async fn test_credential_is_injected_into_environment() {
    // Without the credential the server rejects every call
    let session = launcher(&["--files", &files(&[("a/b/app.py", "x")])])
        .open_session(&Credential::new(""))
        .await
        .unwrap();
    let err = session
        .invoke(
            "get_file_contents",
            arguments(json!({"owner": "a", "repo": "b", "path": "app.py"})),
        )
        .await
        .unwrap_err();
    assert!(err.detail().contains("Bad credentials"));
    session.close().await.unwrap();
}

#[tokio::test]
async fn test_server_pings_are_answered() {
    let file_map = files(&[("alice/widgets/app.py", "print(1)")]);
    let session = launcher(&["--files", &file_map, "--ping"])
        .open_session(&Credential::new("ghp_test"))
        .await
        .unwrap();

    for _ in 0..3 {
        let result = session
            .invoke(
                "get_file_contents",
                arguments(json!({"owner": "alice", "repo": "widgets", "path": "app.py"})),
            )
            .await
            .unwrap();
        assert_eq!(result.text(), "print(1)");
    }
    session.close().await.unwrap();
}

#[tokio::test]
async fn test_server_exit_during_handshake_is_transport_failure() {
    let result = launcher(&["--exit-on-init"])
        .open_session(&Credential::new("ghp_test"))
        .await;
    match result {
        Err(err) => assert_eq!(err.kind(), ToolErrorKind::TransportFailed),
        Ok(_) => panic!("Expected handshake failure"),
    }
}

#[tokio::test]
async fn test_server_crash_mid_call_is_transport_failure() {
    let session = launcher(&["--crash-on", "create_repository"])
        .open_session(&Credential::new("ghp_test"))
        .await
        .unwrap();

    let err = session
        .invoke("create_repository", arguments(json!({"name": "x"})))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ToolErrorKind::TransportFailed);

    // The session stays unusable but closing still succeeds
    let err = session
        .invoke("create_repository", arguments(json!({"name": "y"})))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ToolErrorKind::TransportFailed);
    session.close().await.unwrap();
}

#[tokio::test]
async fn test_close_is_idempotent_and_invoke_after_close_fails() {
    let session = launcher(&[])
        .open_session(&Credential::new("ghp_test"))
        .await
        .unwrap();

    session.close().await.unwrap();
    session.close().await.unwrap();

    let err = session.list_tools().await.unwrap_err();
    assert_eq!(err.kind(), ToolErrorKind::TransportFailed);
}

#[tokio::test]
async fn test_concurrent_invocations_are_serialized() {
    let file_map = files(&[
        ("alice/widgets/app.py", "print(1)"),
        ("alice/widgets/main.py", "run()"),
        ("alice/widgets/index.js", "console.log(1)"),
    ]);
    let session = launcher(&["--files", &file_map])
        .open_session(&Credential::new("ghp_test"))
        .await
        .unwrap();
    let tools = ToolNames::default();
    let client = RepositoryClient::new(session.as_ref(), &tools);

    let paths = ["app.py", "main.py", "index.js", "missing.txt"];
    let results =
        futures_util::future::join_all(paths.iter().map(|p| client.fetch_file("alice", "widgets", p)))
            .await;

    assert_eq!(results[0].as_deref(), Some("print(1)"));
    assert_eq!(results[1].as_deref(), Some("run()"));
    assert_eq!(results[2].as_deref(), Some("console.log(1)"));
    assert!(results[3].is_none());
    session.close().await.unwrap();
}
