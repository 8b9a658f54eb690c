//! Restore Policy
//!
//! Knobs for how the orchestrator ranks services and how much it restores.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Restoration policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestorePolicy {
    /// A service whose demand is below `demand_threshold * partial_factor`
    /// gets a partial restore; at or above it, a full restore.
    ///
    /// **Default:** 1.5
    pub partial_factor: f64,

    /// Lower bound for `demand / threshold` when computing effective
    /// priority, so an idle service ranks as low urgency instead of
    /// dividing by (almost) zero.
    ///
    /// **Default:** 0.1
    pub demand_ratio_floor: f64,

    /// Upper bound for a single service restore, in seconds
    ///
    /// **Default:** 300
    pub restore_timeout_s: u64,

    /// Bytes applied by a partial restore (leading slice of the artifact)
    ///
    /// **Default:** 64 MiB
    pub partial_bytes: u64,
}

impl Default for RestorePolicy {
    fn default() -> Self {
        Self {
            partial_factor: 1.5,
            demand_ratio_floor: 0.1,
            restore_timeout_s: 300,
            partial_bytes: 64 * 1024 * 1024,
        }
    }
}

impl RestorePolicy {
    pub fn restore_timeout(&self) -> Duration {
        Duration::from_secs(self.restore_timeout_s)
    }

    pub fn with_restore_timeout(mut self, timeout: Duration) -> Self {
        self.restore_timeout_s = timeout.as_secs().max(1);
        self
    }

    pub fn with_partial_bytes(mut self, partial_bytes: u64) -> Self {
        self.partial_bytes = partial_bytes;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.partial_factor.is_finite() || self.partial_factor <= 0.0 {
            return Err(ConfigError::InvalidPolicy(
                "partial_factor must be a positive number".to_string(),
            ));
        }

        if !self.demand_ratio_floor.is_finite() || self.demand_ratio_floor <= 0.0 {
            return Err(ConfigError::InvalidPolicy(
                "demand_ratio_floor must be a positive number".to_string(),
            ));
        }

        if self.restore_timeout_s == 0 {
            return Err(ConfigError::InvalidPolicy(
                "restore_timeout_s must be greater than 0".to_string(),
            ));
        }

        if self.partial_bytes == 0 {
            return Err(ConfigError::InvalidPolicy(
                "partial_bytes must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
