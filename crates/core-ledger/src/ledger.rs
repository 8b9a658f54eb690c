//! Trust-on-first-use integrity ledger
//!
//! The first digest observed for an artifact id becomes the reference. Every
//! later verification compares against it; a difference is reported as
//! [`VerifyOutcome::Mismatch`] and the reference is left as it was, so a
//! tampered or corrupted artifact can never quietly become the new baseline.

use crate::backup::BackupStore;
use crate::digest::{compute_digest, Digest};
use crate::error::{LedgerError, Result};
use crate::store::LedgerStore;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Result of checking one artifact against the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VerifyOutcome {
    /// Digest matches the recorded one
    Verified { digest: Digest },

    /// First sighting; the digest has been recorded as the reference
    Registered { digest: Digest },

    /// Digest differs from the recorded reference
    Mismatch { expected: Digest, actual: Digest },

    /// Artifact is not present in the backup store
    NotFound,
}

impl VerifyOutcome {
    /// Whether the artifact may be used as a restore source
    pub fn is_valid(&self) -> bool {
        matches!(
            self,
            VerifyOutcome::Verified { .. } | VerifyOutcome::Registered { .. }
        )
    }

    pub fn kind(&self) -> StatusKind {
        match self {
            VerifyOutcome::Verified { .. } => StatusKind::Verified,
            VerifyOutcome::Registered { .. } => StatusKind::Registered,
            VerifyOutcome::Mismatch { .. } => StatusKind::Mismatch,
            VerifyOutcome::NotFound => StatusKind::NotFound,
        }
    }

    pub fn message(&self) -> String {
        match self {
            VerifyOutcome::Verified { .. } => "Integrity verified".to_string(),
            VerifyOutcome::Registered { .. } => "New backup registered".to_string(),
            VerifyOutcome::Mismatch { expected, actual } => format!(
                "Hash mismatch: expected {}, got {}",
                expected.short(),
                actual.short()
            ),
            VerifyOutcome::NotFound => "Backup not found".to_string(),
        }
    }

    /// The integrity error this outcome represents, if any
    pub fn to_error(&self, artifact_id: &str) -> Option<IntegrityError> {
        match self {
            VerifyOutcome::Mismatch { expected, actual } => Some(IntegrityError::Mismatch {
                artifact_id: artifact_id.to_string(),
                expected: expected.clone(),
                actual: actual.clone(),
            }),
            VerifyOutcome::NotFound => Some(IntegrityError::NotFound {
                artifact_id: artifact_id.to_string(),
            }),
            _ => None,
        }
    }
}

/// Integrity failures that make an artifact unusable
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityError {
    #[error("Backup not found: {artifact_id}")]
    NotFound { artifact_id: String },

    #[error("Hash mismatch for {artifact_id}: expected {expected}, got {actual}")]
    Mismatch {
        artifact_id: String,
        expected: Digest,
        actual: Digest,
    },
}

/// Coarse status classification, shared by snapshots and audit events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Verified,
    Registered,
    Mismatch,
    NotFound,
    /// The artifact could not be checked (I/O or ledger failure)
    Error,
}

impl StatusKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusKind::Verified => "verified",
            StatusKind::Registered => "registered",
            StatusKind::Mismatch => "mismatch",
            StatusKind::NotFound => "not_found",
            StatusKind::Error => "error",
        }
    }
}

/// Per-artifact entry of a validation snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityStatus {
    pub artifact_id: String,
    pub valid: bool,
    pub outcome: StatusKind,
    pub message: String,
    pub checked_at: DateTime<Utc>,
}

impl IntegrityStatus {
    fn from_outcome(artifact_id: &str, outcome: &VerifyOutcome) -> Self {
        Self {
            artifact_id: artifact_id.to_string(),
            valid: outcome.is_valid(),
            outcome: outcome.kind(),
            message: outcome.message(),
            checked_at: Utc::now(),
        }
    }

    fn from_error(artifact_id: &str, err: &LedgerError) -> Self {
        Self {
            artifact_id: artifact_id.to_string(),
            valid: false,
            outcome: StatusKind::Error,
            message: err.to_string(),
            checked_at: Utc::now(),
        }
    }
}

/// Counters for one validation cycle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationStats {
    pub verified: usize,
    pub registered: usize,
    pub mismatched: usize,
    pub missing: usize,
    pub errored: usize,
    pub duration: Option<Duration>,
}

impl ValidationStats {
    fn record(&mut self, kind: StatusKind) {
        match kind {
            StatusKind::Verified => self.verified += 1,
            StatusKind::Registered => self.registered += 1,
            StatusKind::Mismatch => self.mismatched += 1,
            StatusKind::NotFound => self.missing += 1,
            StatusKind::Error => self.errored += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.verified + self.registered + self.mismatched + self.missing + self.errored
    }

    pub fn valid(&self) -> usize {
        self.verified + self.registered
    }

    /// Share of artifacts usable as restore sources (1.0 for an empty store)
    pub fn health_ratio(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            1.0
        } else {
            self.valid() as f64 / total as f64
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Validation: {} artifacts | {} verified | {} registered | {} mismatched | {} missing | {} errors ({:.1}% valid)",
            self.total(),
            self.verified,
            self.registered,
            self.mismatched,
            self.missing,
            self.errored,
            self.health_ratio() * 100.0
        )
    }
}

/// Full snapshot produced by one validation cycle
///
/// Built from scratch every cycle; nothing carries over between cycles.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub statuses: IndexMap<String, IntegrityStatus>,
    pub stats: ValidationStats,
}

impl ValidationReport {
    pub fn invalid(&self) -> impl Iterator<Item = &IntegrityStatus> {
        self.statuses.values().filter(|s| !s.valid)
    }

    pub fn has_mismatch(&self) -> bool {
        self.stats.mismatched > 0
    }
}

/// Verifies backup artifacts against a persisted digest ledger
pub struct IntegrityLedger {
    backups: Arc<dyn BackupStore>,
    store: Arc<dyn LedgerStore>,

    /// Serializes lookup-compare-register so concurrent verifications of
    /// the same artifact cannot both register a digest.
    registration: Mutex<()>,
}

impl IntegrityLedger {
    pub fn new(backups: Arc<dyn BackupStore>, store: Arc<dyn LedgerStore>) -> Self {
        Self {
            backups,
            store,
            registration: Mutex::new(()),
        }
    }

    pub fn backups(&self) -> &Arc<dyn BackupStore> {
        &self.backups
    }

    /// Digest currently recorded for an artifact
    pub async fn known_digest(&self, artifact_id: &str) -> Result<Option<Digest>> {
        let _guard = self.registration.lock().await;
        self.store.get(artifact_id).await
    }

    /// Verify one artifact, registering it on first sight
    pub async fn verify(&self, artifact_id: &str) -> Result<VerifyOutcome> {
        if !self.backups.exists(artifact_id).await? {
            debug!("Artifact {} not present in backup store", artifact_id);
            return Ok(VerifyOutcome::NotFound);
        }

        // Hashing happens outside the lock: it is the slow part and only reads.
        let mut reader = self.backups.open(artifact_id).await?;
        let actual = compute_digest(&mut reader)
            .await
            .map_err(|e| LedgerError::artifact(artifact_id, e))?;

        let _guard = self.registration.lock().await;
        match self.store.get(artifact_id).await? {
            Some(expected) if expected == actual => Ok(VerifyOutcome::Verified { digest: actual }),
            Some(expected) => {
                error!(
                    "Integrity mismatch for {}: expected {}, got {}",
                    artifact_id,
                    expected.short(),
                    actual.short()
                );
                Ok(VerifyOutcome::Mismatch { expected, actual })
            }
            None => {
                self.store.set(artifact_id, &actual).await?;
                info!(
                    "Registered new backup {} ({})",
                    artifact_id,
                    actual.short()
                );
                Ok(VerifyOutcome::Registered { digest: actual })
            }
        }
    }

    /// Verify every artifact in the backup store
    ///
    /// Failures on individual artifacts are recorded in the snapshot; only a
    /// failure to list the store fails the whole cycle.
    pub async fn full_validation_cycle(&self) -> Result<ValidationReport> {
        let started = Instant::now();
        let artifacts = self.backups.list().await?;
        info!(
            "Starting integrity validation of {} artifacts",
            artifacts.len()
        );

        let mut report = ValidationReport::default();
        for artifact_id in artifacts {
            let status = match self.verify(&artifact_id).await {
                Ok(outcome) => {
                    let status = IntegrityStatus::from_outcome(&artifact_id, &outcome);
                    if status.valid {
                        debug!("✓ {}: {}", artifact_id, status.message);
                    } else {
                        warn!("✗ {}: {}", artifact_id, status.message);
                    }
                    status
                }
                Err(e) => {
                    warn!("✗ {}: {}", artifact_id, e);
                    IntegrityStatus::from_error(&artifact_id, &e)
                }
            };
            report.stats.record(status.outcome);
            report.statuses.insert(artifact_id, status);
        }

        report.stats.duration = Some(started.elapsed());
        info!("{}", report.stats.summary());
        if report.has_mismatch() {
            error!(
                "{} artifacts failed digest comparison and need operator review",
                report.stats.mismatched
            );
        }

        Ok(report)
    }
}
