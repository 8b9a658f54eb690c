//! Restoration Metrics
//!
//! Tracks statistics for a single orchestration run.

use crate::error::RestoreError;
use crate::priority::RestoreMode;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Statistics from a single orchestration run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RestorationStats {
    /// Restores attempted (services reached before early exit)
    pub attempted: usize,

    pub succeeded: usize,

    pub failed: usize,

    /// Failures caused by an unusable artifact
    pub invalid_backups: usize,

    pub write_failures: usize,

    pub timeouts: usize,

    /// Services skipped by early exit
    pub deferred: usize,

    /// Successful partial restores
    pub partial: usize,

    /// Successful full restores
    pub full: usize,

    pub duration: Option<Duration>,
}

impl RestorationStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculate the restore success rate (0.0 - 1.0)
    pub fn success_rate(&self) -> f64 {
        if self.attempted == 0 {
            1.0
        } else {
            self.succeeded as f64 / self.attempted as f64
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Restoration: {}/{} succeeded ({:.1}%) | {} partial | {} full | {} invalid backups | {} write failures | {} timeouts | {} deferred",
            self.succeeded,
            self.attempted,
            self.success_rate() * 100.0,
            self.partial,
            self.full,
            self.invalid_backups,
            self.write_failures,
            self.timeouts,
            self.deferred
        )
    }
}

/// Accumulates stats while a run is in progress
#[derive(Debug, Clone)]
pub struct RestorationStatsBuilder {
    stats: RestorationStats,
    start_time: Instant,
}

impl RestorationStatsBuilder {
    pub fn new() -> Self {
        Self {
            stats: RestorationStats::new(),
            start_time: Instant::now(),
        }
    }

    pub fn record_success(&mut self, mode: RestoreMode) {
        self.stats.attempted += 1;
        self.stats.succeeded += 1;
        match mode {
            RestoreMode::Partial => self.stats.partial += 1,
            RestoreMode::Full => self.stats.full += 1,
        }
    }

    pub fn record_failure(&mut self, failure: &RestoreError) {
        self.stats.attempted += 1;
        self.stats.failed += 1;
        match failure {
            RestoreError::InvalidBackup { .. } => self.stats.invalid_backups += 1,
            RestoreError::WriteFailure { .. } => self.stats.write_failures += 1,
            RestoreError::Timeout { .. } => self.stats.timeouts += 1,
        }
    }

    pub fn record_deferred(&mut self, count: usize) {
        self.stats.deferred += count;
    }

    pub fn finish(mut self) -> RestorationStats {
        self.stats.duration = Some(self.start_time.elapsed());
        self.stats
    }

    pub fn stats(&self) -> &RestorationStats {
        &self.stats
    }
}

impl Default for RestorationStatsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
