/*!
 * Error types for Bulwark
 */

use bulwark_core_ledger::LedgerError;
use bulwark_sentinel::{ConfigError, OrchestrationError, SupervisorError};
use std::fmt;
use std::io;

pub type Result<T> = std::result::Result<T, BulwarkError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_PARTIAL: i32 = 1;
pub const EXIT_FATAL: i32 = 2;
pub const EXIT_INTEGRITY: i32 = 3;

#[derive(Debug)]
pub enum BulwarkError {
    /// Configuration error (config file, registry, policy)
    Config(String),

    /// Integrity ledger or backup store unavailable
    Ledger(LedgerError),

    /// One or more artifacts failed digest comparison
    IntegrityMismatch { count: usize },

    /// Some artifacts were invalid or some restores failed
    Partial(String),

    /// A restoration run is already active
    AlreadyRunning,

    /// Monitoring lifecycle error
    Supervisor(SupervisorError),

    /// Audit log could not be opened
    AuditLog(String),

    /// I/O error
    Io(io::Error),
}

impl BulwarkError {
    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            BulwarkError::Config(_)
            | BulwarkError::Ledger(_)
            | BulwarkError::Supervisor(_)
            | BulwarkError::AuditLog(_)
            | BulwarkError::Io(_) => EXIT_FATAL,
            BulwarkError::IntegrityMismatch { .. } => EXIT_INTEGRITY,
            BulwarkError::Partial(_) | BulwarkError::AlreadyRunning => EXIT_PARTIAL,
        }
    }
}

impl fmt::Display for BulwarkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BulwarkError::Config(msg) => write!(f, "Configuration error: {}", msg),
            BulwarkError::Ledger(err) => write!(f, "Ledger error: {}", err),
            BulwarkError::IntegrityMismatch { count } => {
                write!(f, "{} backup(s) failed integrity verification", count)
            }
            BulwarkError::Partial(msg) => write!(f, "{}", msg),
            BulwarkError::AlreadyRunning => {
                write!(f, "A restoration run is already in progress")
            }
            BulwarkError::Supervisor(err) => write!(f, "Monitoring error: {}", err),
            BulwarkError::AuditLog(msg) => write!(f, "Audit log error: {}", msg),
            BulwarkError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for BulwarkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BulwarkError::Ledger(err) => Some(err),
            BulwarkError::Supervisor(err) => Some(err),
            BulwarkError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for BulwarkError {
    fn from(err: io::Error) -> Self {
        BulwarkError::Io(err)
    }
}

impl From<LedgerError> for BulwarkError {
    fn from(err: LedgerError) -> Self {
        BulwarkError::Ledger(err)
    }
}

impl From<ConfigError> for BulwarkError {
    fn from(err: ConfigError) -> Self {
        BulwarkError::Config(err.to_string())
    }
}

impl From<SupervisorError> for BulwarkError {
    fn from(err: SupervisorError) -> Self {
        BulwarkError::Supervisor(err)
    }
}

impl From<OrchestrationError> for BulwarkError {
    fn from(err: OrchestrationError) -> Self {
        match err {
            OrchestrationError::AlreadyRunning => BulwarkError::AlreadyRunning,
            OrchestrationError::Ledger(e) => BulwarkError::Ledger(e),
        }
    }
}

impl From<bulwark_core_audit::Error> for BulwarkError {
    fn from(err: bulwark_core_audit::Error) -> Self {
        BulwarkError::AuditLog(err.to_string())
    }
}
