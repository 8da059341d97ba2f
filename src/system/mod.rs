//! System abstraction for environment, terminal and filesystem operations
//!
//! This module provides a unified trait for all external system interactions,
//! allowing dispatch, prompting and file parameters to be tested with mock
//! implementations.

use std::env::VarError;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

pub mod mock;
pub mod real;

pub use mock::MockSystem;
pub use real::RealSystem;

/// Unified trait for system operations (environment + terminal + filesystem)
///
/// # Implementations
/// - `RealSystem`: Production implementation using `std::env`, `std::io` and `std::fs`
/// - `MockSystem`: Test implementation using in-memory storage and scripted input
pub trait System: Send + Sync {
    // ==================== Environment Operations ====================

    /// Get an environment variable
    fn env_var(&self, key: &str) -> Result<String, VarError>;

    /// Get the current working directory
    fn current_dir(&self) -> io::Result<PathBuf>;

    /// Get the user's home directory
    fn home_dir(&self) -> Option<PathBuf>;

    // ==================== Terminal Operations ====================

    /// Write text to standard output, without adding a newline
    fn echo(&self, text: &str);

    /// Write text to standard error, without adding a newline
    fn echo_err(&self, text: &str);

    /// Read one line from standard input, without its line terminator
    ///
    /// Returns `Ok(None)` at end of input.
    fn read_line(&self) -> io::Result<Option<String>>;

    /// Read one line without echoing it to the terminal
    ///
    /// Returns `Ok(None)` at end of input.
    fn read_hidden_line(&self) -> io::Result<Option<String>>;

    /// Standard input as a stream (the `-` file name when reading)
    fn stdin(&self) -> Box<dyn Read>;

    /// Standard output as a stream (the `-` file name when writing)
    fn stdout(&self) -> Box<dyn Write>;

    // ==================== Filesystem Operations ====================

    /// Read entire file contents as a string
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Check if a path exists
    fn exists(&self, path: &Path) -> bool;

    /// Check if a path points to a file
    fn is_file(&self, path: &Path) -> bool;

    /// Check if a path points to a directory
    fn is_dir(&self, path: &Path) -> bool;

    /// Check if an existing path may be written to
    fn is_writable(&self, path: &Path) -> bool;

    /// Canonicalize a path (resolve to absolute path)
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;

    /// Open a file for reading (returns a readable stream)
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read>>;

    /// Create or truncate a file for writing (returns a writable stream)
    fn create(&self, path: &Path) -> io::Result<Box<dyn Write>>;

    /// Open a file for appending, creating it when missing
    fn append(&self, path: &Path) -> io::Result<Box<dyn Write>>;
}
