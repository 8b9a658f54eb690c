/*!
 * Configuration types for Bulwark
 */

use bulwark_sentinel::RestorePolicy;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{BulwarkError, Result};

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "bulwark.toml";

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulwarkConfig {
    /// Directory holding backup artifacts
    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,

    /// Root of the production targets (`<production_dir>/<service>/...`)
    #[serde(default = "default_production_dir")]
    pub production_dir: PathBuf,

    /// Integrity ledger document
    #[serde(default = "default_ledger_path")]
    pub ledger_path: PathBuf,

    /// Service registry document (.json or .toml)
    #[serde(default = "default_registry_path")]
    pub registry_path: PathBuf,

    /// Seconds between monitoring ticks
    #[serde(default = "default_monitor_interval")]
    pub monitor_interval_secs: u64,

    /// An incident is reported while this file exists
    #[serde(default)]
    pub incident_flag: Option<PathBuf>,

    /// Append-only JSON Lines audit log (None = tracing only)
    #[serde(default)]
    pub audit_log_path: Option<PathBuf>,

    /// Log level for diagnostic output
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log file path (None = stderr)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Enable verbose logging (shorthand for log_level = debug)
    #[serde(default)]
    pub verbose: bool,

    #[serde(default)]
    pub policy: RestorePolicy,

    /// Static demand per service id; services not listed read as idle
    #[serde(default)]
    pub demand: IndexMap<String, f64>,
}

impl Default for BulwarkConfig {
    fn default() -> Self {
        Self {
            backup_dir: default_backup_dir(),
            production_dir: default_production_dir(),
            ledger_path: default_ledger_path(),
            registry_path: default_registry_path(),
            monitor_interval_secs: default_monitor_interval(),
            incident_flag: None,
            audit_log_path: None,
            log_level: LogLevel::Info,
            log_file: None,
            verbose: false,
            policy: RestorePolicy::default(),
            demand: IndexMap::new(),
        }
    }
}

/// Logging level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Convert to tracing Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from("backups")
}

fn default_production_dir() -> PathBuf {
    PathBuf::from("production")
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("hash_db.json")
}

fn default_registry_path() -> PathBuf {
    PathBuf::from("critical_services.json")
}

fn default_monitor_interval() -> u64 {
    60
}

impl BulwarkConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            BulwarkError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&contents).map_err(|e| {
            BulwarkError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Explicit path if given, else `bulwark.toml` when present, else defaults
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.is_file() {
                    Self::from_file(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| BulwarkError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.monitor_interval_secs == 0 {
            return Err(BulwarkError::Config(
                "monitor_interval_secs must be greater than 0".to_string(),
            ));
        }

        self.policy
            .validate()
            .map_err(|e| BulwarkError::Config(e.to_string()))?;

        if let Some((id, value)) = self
            .demand
            .iter()
            .find(|(_, v)| !v.is_finite() || **v < 0.0)
        {
            return Err(BulwarkError::Config(format!(
                "demand for {} must be a non-negative number, got {}",
                id, value
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = BulwarkConfig::default();
        assert_eq!(config.backup_dir, PathBuf::from("backups"));
        assert_eq!(config.production_dir, PathBuf::from("production"));
        assert_eq!(config.ledger_path, PathBuf::from("hash_db.json"));
        assert_eq!(config.registry_path, PathBuf::from("critical_services.json"));
        assert_eq!(config.monitor_interval(), Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: BulwarkConfig = toml::from_str(
            r#"
            backup_dir = "/srv/backups"
            incident_flag = "/run/bulwark/incident"

            [policy]
            restore_timeout_s = 30

            [demand]
            servicio_db = 150.0
            servicio_api = 65.0
            "#,
        )
        .unwrap();

        assert_eq!(config.backup_dir, PathBuf::from("/srv/backups"));
        assert_eq!(config.ledger_path, PathBuf::from("hash_db.json"));
        assert_eq!(config.policy.restore_timeout_s, 30);
        assert_eq!(config.policy.partial_factor, 1.5);
        assert_eq!(
            config.demand.keys().collect::<Vec<_>>(),
            vec!["servicio_db", "servicio_api"]
        );
    }

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bulwark.toml");

        let mut config = BulwarkConfig::default();
        config.audit_log_path = Some(PathBuf::from("audit.jsonl"));
        config.demand.insert("servicio_web".to_string(), 30.0);
        config.to_file(&path).unwrap();

        assert_eq!(BulwarkConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_validation_failures() {
        let mut config = BulwarkConfig::default();
        config.monitor_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = BulwarkConfig::default();
        config.policy.partial_factor = -1.0;
        assert!(config.validate().is_err());

        let mut config = BulwarkConfig::default();
        config.demand.insert("servicio_db".to_string(), f64::NAN);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempdir().unwrap();
        let err = BulwarkConfig::discover(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, BulwarkError::Config(_)));
    }
}
