//! Error types for ledger operations

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors that can occur while verifying artifacts or persisting digests
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Reading a single artifact failed
    ///
    /// Scoped to one artifact: callers convert it into a failed status
    /// for that artifact and carry on with the rest of the cycle.
    #[error("Failed to read artifact {artifact_id}: {source}")]
    Artifact {
        artifact_id: String,
        #[source]
        source: io::Error,
    },

    /// The backup store itself could not be listed
    #[error("Backup store unavailable at {path}: {source}")]
    BackupStore {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The ledger store could not be read or written
    #[error("Ledger store error: {0}")]
    Store(String),

    /// I/O error on the ledger document
    #[error("Ledger I/O error: {0}")]
    Io(#[from] io::Error),

    /// The ledger document is not valid JSON
    #[error("Ledger document is corrupt: {0}")]
    Json(#[from] serde_json::Error),
}

impl LedgerError {
    /// Create an artifact read error
    pub fn artifact<S: Into<String>>(artifact_id: S, source: io::Error) -> Self {
        LedgerError::Artifact {
            artifact_id: artifact_id.into(),
            source,
        }
    }

    /// Create a store error
    pub fn store<S: Into<String>>(message: S) -> Self {
        LedgerError::Store(message.into())
    }

    /// Whether this error means the ledger itself cannot be trusted to record
    /// new digests. Fatal errors abort an orchestration run; artifact errors
    /// do not.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LedgerError::Store(_) | LedgerError::Io(_) | LedgerError::Json(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_error_is_not_fatal() {
        let err = LedgerError::artifact(
            "db_backup_20250101.bak",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("db_backup_20250101.bak"));
    }

    #[test]
    fn test_store_errors_are_fatal() {
        assert!(LedgerError::store("read-only filesystem").is_fatal());
        assert!(LedgerError::Io(io::Error::other("disk full")).is_fatal());
    }

    #[test]
    fn test_backup_store_error_message() {
        let err = LedgerError::BackupStore {
            path: PathBuf::from("/srv/backups"),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("/srv/backups"));
    }
}
