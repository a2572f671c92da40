//! Tool session contract
//!
//! A session is one live connection to a tool server, opened with a
//! credential and closed exactly once by whoever opened it.

use crate::bridge::error::ToolError;
use crate::bridge::protocol::{CallToolResult, ToolArguments, ToolDescriptor};
use async_trait::async_trait;
use std::fmt;

/// Secret handed to the tool server (e.g. a personal access token)
///
/// `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a secret value
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw secret
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// True when no secret was supplied
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// One live connection to a tool server
#[async_trait]
pub trait ToolSession: Send + Sync {
    /// Invoke a named tool and wait for its result
    ///
    /// # Errors
    /// * `ToolError::ExecutionFailed` if the server reports the call failed
    /// * `ToolError::TransportFailed` if the connection is gone
    async fn invoke(
        &self,
        tool_name: &str,
        arguments: ToolArguments,
    ) -> Result<CallToolResult, ToolError>;

    /// List the tools the server advertises
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError>;

    /// Shut the session down
    ///
    /// Calling this more than once is a no-op.
    async fn close(&self) -> Result<(), ToolError>;
}

/// Opens sessions against a tool server
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    /// Start a server with the credential injected and complete the handshake
    async fn open_session(&self, credential: &Credential)
        -> Result<Box<dyn ToolSession>, ToolError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_debug_is_redacted() {
        let credential = Credential::new("ghp_secret");
        let debug = format!("{:?}", credential);
        assert!(!debug.contains("ghp_secret"));
        assert_eq!(credential.expose(), "ghp_secret");
    }

    #[test]
    fn test_credential_blank_is_empty() {
        assert!(Credential::new("  ").is_empty());
        assert!(!Credential::new("token").is_empty());
    }
}
