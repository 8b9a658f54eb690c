/*!
 * Signal sources wired from configuration
 *
 * Demand comes from the `[demand]` table of the config file. An incident is
 * signalled by the presence of a flag file, so an operator (or an external
 * monitor) can raise one with `touch` and clear it with `rm`.
 */

use async_trait::async_trait;
use bulwark_sentinel::{AlwaysIncident, IncidentDetector, NeverIncident, StaticDemand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::BulwarkConfig;

/// Demand table built from the config file; unlisted services read as idle
pub fn static_demand_source(config: &BulwarkConfig) -> StaticDemand {
    StaticDemand::from_table(
        config
            .demand
            .iter()
            .map(|(id, demand)| (id.clone(), *demand)),
    )
}

/// Reports an incident while a flag file exists
#[derive(Debug, Clone)]
pub struct FlagFileDetector {
    path: PathBuf,
}

impl FlagFileDetector {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl IncidentDetector for FlagFileDetector {
    async fn detect(&self) -> bool {
        match tokio::fs::try_exists(&self.path).await {
            Ok(true) => {
                debug!("Incident flag present at {}", self.path.display());
                true
            }
            Ok(false) => false,
            Err(e) => {
                warn!(
                    "Cannot check incident flag {}: {}",
                    self.path.display(),
                    e
                );
                false
            }
        }
    }
}

/// Pick the incident detector for a run
///
/// `assume_incident` wins over the configured flag file. Without either,
/// no incident is ever reported.
pub fn incident_detector(
    config: &BulwarkConfig,
    assume_incident: bool,
) -> Arc<dyn IncidentDetector> {
    if assume_incident {
        return Arc::new(AlwaysIncident);
    }

    match config.incident_flag {
        Some(ref path) => Arc::new(FlagFileDetector::new(path.clone())),
        None => Arc::new(NeverIncident),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulwark_sentinel::DemandSource;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_flag_file_toggles_incident() {
        let dir = tempdir().unwrap();
        let flag = dir.path().join("incident");
        let detector = FlagFileDetector::new(&flag);

        assert!(!detector.detect().await);

        std::fs::write(&flag, b"").unwrap();
        assert!(detector.detect().await);

        std::fs::remove_file(&flag).unwrap();
        assert!(!detector.detect().await);
    }

    #[tokio::test]
    async fn test_static_demand_from_config() {
        let mut config = BulwarkConfig::default();
        config.demand.insert("servicio_db".to_string(), 150.0);

        let demand = static_demand_source(&config);
        assert_eq!(demand.sample("servicio_db").await.unwrap(), 150.0);
        assert_eq!(demand.sample("servicio_web").await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn test_detector_selection() {
        let dir = tempdir().unwrap();
        let flag = dir.path().join("incident");

        let config = BulwarkConfig::default();
        assert!(!incident_detector(&config, false).detect().await);
        assert!(incident_detector(&config, true).detect().await);

        let config = BulwarkConfig {
            incident_flag: Some(flag.clone()),
            ..Default::default()
        };
        assert!(!incident_detector(&config, false).detect().await);
        std::fs::write(&flag, b"").unwrap();
        assert!(incident_detector(&config, false).detect().await);
    }
}
