//! Tool bridge module
//!
//! Manages the lifecycle of an external tool-execution server and exposes
//! named tool invocations over a single session. The session is a trait so
//! that any transport honoring the same contract (child process, in-process
//! fake) can stand in for the real server.

pub mod error;
pub mod process;
pub mod protocol;
pub mod session;

pub use error::{ToolError, ToolErrorKind};
pub use process::{ProcessLauncher, ProcessSession, ToolServerConfig};
pub use protocol::{CallToolResult, ToolArguments, ToolDescriptor};
pub use session::{Credential, SessionLauncher, ToolSession};
