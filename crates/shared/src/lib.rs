//! Shared infrastructure for the MyAnimeList client workspace.
//!
//! This crate provides the ambient pieces the client library builds on:
//! - Configuration management (TOML)
//! - Logging infrastructure

pub mod config;
pub mod logging;

// Re-export commonly used types
pub use config::{ClientConfig, Config};
pub use logging::LogConfig;

/// Common result type using anyhow::Error
pub type Result<T> = anyhow::Result<T>;
