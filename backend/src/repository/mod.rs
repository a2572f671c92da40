//! Repository client module
//!
//! Typed repository operations (fetch, create, write) layered over a tool
//! session. Each operation interprets tool errors the way its caller needs.

pub mod client;

pub use client::{CreateOutcome, RepositoryClient, ToolNames, WriteOutcome};
