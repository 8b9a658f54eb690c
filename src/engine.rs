/*!
 * Wires configuration into a running ledger, orchestrator and supervisor
 */

use bulwark_core_audit::{EventSink, FanoutSink, JsonlSink, TracingSink};
use bulwark_core_ledger::{IntegrityLedger, JsonFileLedger, LocalBackupStore};
use bulwark_sentinel::{
    IncidentDetector, LocalTargetStore, ResilienceSupervisor, RestoreOrchestrator,
    ServiceRegistry,
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::BulwarkConfig;
use crate::error::Result;
use crate::sources::static_demand_source;

/// Fully assembled engine for one CLI invocation
pub struct Engine {
    pub ledger: Arc<IntegrityLedger>,
    pub supervisor: Arc<ResilienceSupervisor>,
}

impl Engine {
    pub fn from_config(
        config: &BulwarkConfig,
        detector: Arc<dyn IncidentDetector>,
    ) -> Result<Self> {
        let sink = build_sink(config)?;
        Self::with_sink(config, detector, sink)
    }

    pub fn with_sink(
        config: &BulwarkConfig,
        detector: Arc<dyn IncidentDetector>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        let registry = ServiceRegistry::load_or_builtin(&config.registry_path)?;

        let ledger = Arc::new(IntegrityLedger::new(
            Arc::new(LocalBackupStore::new(&config.backup_dir)),
            Arc::new(JsonFileLedger::new(&config.ledger_path)),
        ));

        let orchestrator = RestoreOrchestrator::new(
            Arc::new(registry),
            ledger.clone(),
            Arc::new(LocalTargetStore::new(&config.production_dir)),
            Arc::new(static_demand_source(config)),
            config.policy.clone(),
        )?
        .with_sink(sink.clone());

        let supervisor =
            ResilienceSupervisor::new(ledger.clone(), Arc::new(orchestrator), detector)
                .with_sink(sink);

        debug!(
            "Engine ready: backups={} production={} ledger={}",
            config.backup_dir.display(),
            config.production_dir.display(),
            config.ledger_path.display()
        );

        Ok(Self {
            ledger,
            supervisor: Arc::new(supervisor),
        })
    }

    pub fn orchestrator(&self) -> &Arc<RestoreOrchestrator> {
        self.supervisor.orchestrator()
    }
}

/// Tracing always; the JSON Lines audit log as well when configured
pub fn build_sink(config: &BulwarkConfig) -> Result<Arc<dyn EventSink>> {
    match config.audit_log_path {
        Some(ref path) => {
            let file_sink = JsonlSink::new(path)?;
            info!("Audit events appended to {}", path.display());
            Ok(Arc::new(
                FanoutSink::new()
                    .with(Arc::new(file_sink))
                    .with(Arc::new(TracingSink)),
            ))
        }
        None => Ok(Arc::new(TracingSink)),
    }
}
