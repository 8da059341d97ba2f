//! Error handling module
//!
//! Defines the dispatch error type with exit codes and usage snapshots

pub mod types;

pub use types::*;

/// Result alias used throughout the crate
pub type Result<T, E = CliError> = std::result::Result<T, E>;
