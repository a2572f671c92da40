//! Repository Transformer Backend Library
//!
//! This library exposes modules for testing and external use.
//! The main binary is in `src/main.rs`.

pub mod api;
pub mod bridge;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod path_mapper;
pub mod repository;
pub mod sanitizer;
/// Shared application state for HTTP handlers
pub mod state;
pub mod transform;
