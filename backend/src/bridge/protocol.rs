//! Tool bridge wire types
//!
//! JSON-RPC 2.0 messages exchanged with the tool server over the child's
//! stdin/stdout. Each message is one JSON document on its own line.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON-RPC version tag
pub const JSONRPC_VERSION: &str = "2.0";

/// Protocol revision announced during the handshake
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Handshake request
pub const METHOD_INITIALIZE: &str = "initialize";

/// Notification sent once the handshake response has been received
pub const METHOD_INITIALIZED: &str = "notifications/initialized";

/// Tool discovery
pub const METHOD_TOOLS_LIST: &str = "tools/list";

/// Tool invocation
pub const METHOD_TOOLS_CALL: &str = "tools/call";

/// Liveness probe a server may send to the client
pub const METHOD_PING: &str = "ping";

/// JSON-RPC "method not found" error code
pub const METHOD_NOT_FOUND: i64 = -32601;

/// Key-value arguments passed to a tool
pub type ToolArguments = Map<String, Value>;

/// Request (or notification, when `id` is absent) sent to the tool server
#[derive(Debug, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Always [`JSONRPC_VERSION`]
    pub jsonrpc: String,
    /// Request ID; absent for notifications
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// Method name
    pub method: String,
    /// Method parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl RpcRequest {
    /// Build a request that expects a response
    pub fn call(id: u64, method: &str, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id),
            method: method.to_string(),
            params: Some(params),
        }
    }

    /// Build a notification (no response expected)
    pub fn notification(method: &str) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: None,
            method: method.to_string(),
            params: None,
        }
    }
}

/// Response sent back to the peer (used for server-initiated requests)
#[derive(Debug, Serialize, Deserialize)]
pub struct RpcResponse {
    /// Always [`JSONRPC_VERSION`]
    pub jsonrpc: String,
    /// ID of the request being answered
    pub id: Value,
    /// Success payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    /// Successful response
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Error response
    pub fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

/// Any message read from the peer
///
/// Responses, notifications and requests share one loose shape; use
/// [`RpcMessage::answers`] and [`RpcMessage::is_request`] to tell them apart.
#[derive(Debug, Deserialize)]
pub struct RpcMessage {
    /// Request or response ID
    #[serde(default)]
    pub id: Option<Value>,
    /// Present on requests and notifications
    #[serde(default)]
    pub method: Option<String>,
    /// Present on requests and notifications
    #[serde(default)]
    pub params: Option<Value>,
    /// Present on successful responses
    #[serde(default)]
    pub result: Option<Value>,
    /// Present on failed responses
    #[serde(default)]
    pub error: Option<RpcError>,
}

impl RpcMessage {
    /// True when this message is the response to request `id`
    pub fn answers(&self, id: u64) -> bool {
        self.method.is_none() && self.id.as_ref().and_then(Value::as_u64) == Some(id)
    }

    /// True when the peer is asking us something and expects a reply
    pub fn is_request(&self) -> bool {
        self.method.is_some() && self.id.is_some()
    }
}

/// JSON-RPC error object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcError {
    /// Error code
    pub code: i64,
    /// Human-readable message
    pub message: String,
    /// Optional extra data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Client identity sent during the handshake
#[derive(Debug, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Client name
    pub name: String,
    /// Client version
    pub version: String,
}

/// Parameters of the `initialize` request
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol revision the client speaks
    pub protocol_version: String,
    /// Client capabilities (none are advertised)
    pub capabilities: Value,
    /// Client identity
    pub client_info: ClientInfo,
}

/// Parameters of a `tools/call` request
#[derive(Debug, Serialize, Deserialize)]
pub struct CallToolParams {
    /// Tool name
    pub name: String,
    /// Tool arguments
    #[serde(default)]
    pub arguments: ToolArguments,
}

/// Result of a `tools/call` request
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    /// Content items returned by the tool
    #[serde(default)]
    pub content: Vec<ContentItem>,
    /// Set by the server when the tool itself failed
    #[serde(default)]
    pub is_error: bool,
}

impl CallToolResult {
    /// Result holding a single text item
    pub fn from_text(text: impl Into<String>, is_error: bool) -> Self {
        Self {
            content: vec![ContentItem::text(text)],
            is_error,
        }
    }

    /// All text items joined with newlines
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|item| item.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// One content item of a tool result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentItem {
    /// Item type (e.g. "text")
    #[serde(rename = "type")]
    pub kind: String,
    /// Text payload, for text items
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ContentItem {
    /// Text content item
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            text: Some(text.into()),
        }
    }
}

/// Tool advertised by the server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    /// Tool name
    pub name: String,
    /// Tool description
    #[serde(default)]
    pub description: Option<String>,
    /// JSON schema of the tool arguments
    #[serde(default)]
    pub input_schema: Value,
}

/// Result of a `tools/list` request
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ListToolsResult {
    /// Advertised tools
    #[serde(default)]
    pub tools: Vec<ToolDescriptor>,
}
