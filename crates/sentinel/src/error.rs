//! Error types for the restoration engine

use bulwark_core_ledger::{IntegrityError, LedgerError};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Why a single service restore failed
///
/// These are per-service outcomes: they end up inside a
/// [`RestorationResult`](crate::RestorationResult) and never abort a run.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RestoreError {
    /// The artifact failed (or could not undergo) integrity verification
    ///
    /// `cause` is set when verification completed and rejected the artifact.
    #[error("Invalid backup {artifact_id}: {reason}")]
    InvalidBackup {
        artifact_id: String,
        reason: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cause: Option<IntegrityError>,
    },

    /// Staging or committing the restore failed
    #[error("Write failure restoring {service_id}: {reason}")]
    WriteFailure { service_id: String, reason: String },

    /// The restore did not finish within the configured bound
    #[error("Restore of {service_id} timed out after {timeout:?}")]
    Timeout {
        service_id: String,
        timeout: Duration,
    },
}

impl RestoreError {
    /// True when the backup was rejected because its content changed
    pub fn is_mismatch(&self) -> bool {
        matches!(
            self,
            RestoreError::InvalidBackup {
                cause: Some(IntegrityError::Mismatch { .. }),
                ..
            }
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RestoreError::InvalidBackup { .. } => "invalid_backup",
            RestoreError::WriteFailure { .. } => "write_failure",
            RestoreError::Timeout { .. } => "timeout",
        }
    }
}

/// Errors that end an orchestration run as a whole
#[derive(Error, Debug)]
pub enum OrchestrationError {
    /// Another run holds the orchestration gate; re-trigger later
    #[error("An orchestration run is already in progress")]
    AlreadyRunning,

    /// The integrity ledger cannot be read or written
    #[error("Orchestration aborted, ledger unavailable: {0}")]
    Ledger(#[from] LedgerError),
}

/// Supervisor lifecycle errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SupervisorError {
    #[error("Monitoring is already running")]
    AlreadyMonitoring,

    #[error("Monitoring interval must be greater than zero")]
    InvalidInterval,
}

/// Registry and policy configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No registry document at the configured location; callers usually
    /// recover by falling back to the built-in registry.
    #[error("Service registry not found: {0}")]
    MissingRegistry(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Unsupported registry format: {0} (expected .json or .toml)")]
    UnsupportedFormat(PathBuf),

    #[error("Invalid service registry: {0}")]
    InvalidRegistry(String),

    #[error("Invalid restore policy: {0}")]
    InvalidPolicy(String),
}
