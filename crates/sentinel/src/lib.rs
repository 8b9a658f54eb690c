//! Bulwark Sentinel: priority-driven restoration and resilience monitoring
//!
//! The Sentinel keeps watch over a pool of backup artifacts and, when an
//! incident is signaled, brings services back in the order that matters
//! most right now: static criticality weighted by live overload.
//!
//! # Architecture: The Monitoring Tick
//!
//! ```text
//! ┌─────────────┐
//! │  Validate   │──> Verify every artifact against the integrity ledger
//! └──────┬──────┘
//!        │
//!        v
//! ┌─────────────┐
//! │  Detect     │──> Ask the IncidentDetector
//! └──────┬──────┘
//!        │ incident
//!        v
//! ┌─────────────┐
//! │  Rank       │──> priority / max(0.1, demand / threshold)
//! └──────┬──────┘
//!        │
//!        v
//! ┌─────────────┐
//! │  Restore    │──> verify, stage, rename; stop early once enough is back
//! └──────┬──────┘
//!        │
//!        └────> next tick
//! ```
//!
//! # Example
//!
//! ```no_run
//! use bulwark_core_ledger::{IntegrityLedger, JsonFileLedger, LocalBackupStore};
//! use bulwark_sentinel::{
//!     AlwaysIncident, LocalTargetStore, ResilienceSupervisor, RestoreOrchestrator,
//!     RestorePolicy, ServiceRegistry, StaticDemand,
//! };
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let ledger = Arc::new(IntegrityLedger::new(
//!     Arc::new(LocalBackupStore::new("backups")),
//!     Arc::new(JsonFileLedger::new("hash_db.json")),
//! ));
//!
//! let orchestrator = RestoreOrchestrator::new(
//!     Arc::new(ServiceRegistry::builtin()),
//!     ledger.clone(),
//!     Arc::new(LocalTargetStore::new("production")),
//!     Arc::new(StaticDemand::from_table([("servicio_db", 150.0)])),
//!     RestorePolicy::default(),
//! )?;
//!
//! let supervisor =
//!     ResilienceSupervisor::new(ledger, Arc::new(orchestrator), Arc::new(AlwaysIncident));
//! supervisor.start_monitoring(Duration::from_secs(60))?;
//! // ...
//! supervisor.stop_monitoring().await;
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod policy;
pub mod priority;
pub mod registry;
pub mod signals;
pub mod supervisor;
pub mod target;

pub use error::{ConfigError, OrchestrationError, RestoreError, SupervisorError};
pub use metrics::{RestorationStats, RestorationStatsBuilder};
pub use orchestrator::{
    artifact_id_for, RestorationReport, RestorationResult, RestoreOrchestrator, Trigger,
};
pub use policy::RestorePolicy;
pub use priority::{
    compute_priority_order, rank_services, DemandSnapshot, RankedService, RestoreMode,
    DEFAULT_DEMAND_RATIO_FLOOR,
};
pub use registry::{ServiceDescriptor, ServiceRegistry};
pub use signals::{AlwaysIncident, DemandSource, IncidentDetector, NeverIncident, StaticDemand};
pub use supervisor::{ResilienceSupervisor, RestorationOutcome, TickReport};
pub use target::{LocalTargetStore, Staged, TargetStore};
