//! Error types for audit operations

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for audit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while emitting or reading audit events
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to create log file
    #[error("Failed to create audit log: {path}")]
    CreateFailed { path: PathBuf },

    /// Log entry is invalid or corrupted
    #[error("Invalid audit entry at line {line}: {reason}")]
    InvalidEntry { line: usize, reason: String },

    /// Invalid event kind
    #[error("Invalid event kind: {0}")]
    InvalidEventKind(String),

    /// A sink's internal lock was poisoned by a panicking writer
    #[error("Audit sink unavailable: {0}")]
    SinkUnavailable(String),
}

impl Error {
    pub fn create_failed<P: Into<PathBuf>>(path: P) -> Self {
        Error::CreateFailed { path: path.into() }
    }

    pub fn invalid_entry(line: usize, reason: &str) -> Self {
        Error::InvalidEntry {
            line,
            reason: reason.to_string(),
        }
    }

    pub fn invalid_event_kind<S: Into<String>>(kind: S) -> Self {
        Error::InvalidEventKind(kind.into())
    }
}
