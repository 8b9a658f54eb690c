//! Audit event schema
//!
//! One event is produced per validation outcome and per restoration result.
//! Events are flat so they stay readable as JSON Lines and easy to grep.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// What produced the event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// An artifact was checked against the integrity ledger
    Validation,
    /// A service restore finished (successfully or not)
    Restoration,
    /// An orchestration run was skipped or aborted as a whole
    Orchestration,
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::Validation => "validation",
            EventKind::Restoration => "restoration",
            EventKind::Orchestration => "orchestration",
        }
    }
}

impl FromStr for EventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "validation" => Ok(EventKind::Validation),
            "restoration" => Ok(EventKind::Restoration),
            "orchestration" => Ok(EventKind::Orchestration),
            _ => Err(Error::invalid_event_kind(s)),
        }
    }
}

/// Severity attached to an event so sinks can route operator-actionable ones
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// A single audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Timestamp (UTC)
    pub ts: DateTime<Utc>,

    pub kind: EventKind,

    /// Artifact id for validation events, service id for restoration events
    pub subject: String,

    /// Machine-readable outcome, e.g. `verified`, `mismatch`, `restored`
    pub outcome: String,

    pub severity: Severity,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Restore mode (`partial` / `full`) for restoration events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    /// Artifact a restoration was sourced from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<String>,
}

impl AuditEvent {
    pub fn new<S: Into<String>, O: Into<String>>(
        kind: EventKind,
        subject: S,
        outcome: O,
        severity: Severity,
    ) -> Self {
        Self {
            ts: Utc::now(),
            kind,
            subject: subject.into(),
            outcome: outcome.into(),
            severity,
            message: None,
            mode: None,
            artifact: None,
        }
    }

    pub fn validation<S: Into<String>, O: Into<String>>(
        artifact_id: S,
        outcome: O,
        severity: Severity,
    ) -> Self {
        Self::new(EventKind::Validation, artifact_id, outcome, severity)
    }

    pub fn restoration<S: Into<String>, O: Into<String>>(
        service_id: S,
        outcome: O,
        severity: Severity,
    ) -> Self {
        Self::new(EventKind::Restoration, service_id, outcome, severity)
    }

    pub fn with_message<S: Into<String>>(mut self, message: S) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_mode<S: Into<String>>(mut self, mode: S) -> Self {
        self.mode = Some(mode.into());
        self
    }

    pub fn with_artifact<S: Into<String>>(mut self, artifact: S) -> Self {
        self.artifact = Some(artifact.into());
        self
    }
}
