//! Restore Orchestrator
//!
//! One run:
//!
//! 1. Sample demand once for every registered service
//! 2. Rank services (see [`crate::priority`])
//! 3. For each service in order: verify today's artifact, pick a mode,
//!    restore it through the [`TargetStore`]
//! 4. Stop early once a restore succeeds for a service that is not
//!    overloaded; everything after it is reported as deferred
//!
//! At most one run is active per orchestrator. A second caller is turned
//! away with [`OrchestrationError::AlreadyRunning`] instead of queueing.

use crate::audit::{emit_or_warn, orchestration_event, restoration_event};
use crate::error::{ConfigError, OrchestrationError, RestoreError};
use crate::metrics::{RestorationStats, RestorationStatsBuilder};
use crate::policy::RestorePolicy;
use crate::priority::{rank_services, DemandSnapshot, RankedService, RestoreMode};
use crate::registry::ServiceRegistry;
use crate::signals::DemandSource;
use crate::target::{Staged, TargetStore};
use bulwark_core_audit::{EventSink, TracingSink};
use bulwark_core_ledger::{IntegrityError, IntegrityLedger, LedgerError};
use chrono::{DateTime, Local, NaiveDate, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// What started a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    /// Incident detected by the monitoring loop
    Scheduled,
    /// Operator request
    Manual,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Scheduled => write!(f, "scheduled"),
            Trigger::Manual => write!(f, "manual"),
        }
    }
}

/// Outcome of restoring one service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestorationResult {
    pub service_id: String,
    pub artifact_id: String,
    pub success: bool,
    pub message: String,
    pub mode: RestoreMode,
    pub bytes_restored: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<RestoreError>,
}

impl RestorationResult {
    fn restored(service_id: &str, artifact_id: &str, mode: RestoreMode, bytes: u64) -> Self {
        Self {
            service_id: service_id.to_string(),
            artifact_id: artifact_id.to_string(),
            success: true,
            message: "Restore succeeded".to_string(),
            mode,
            bytes_restored: bytes,
            failure: None,
        }
    }

    pub(crate) fn failed(
        service_id: &str,
        artifact_id: &str,
        mode: RestoreMode,
        failure: RestoreError,
    ) -> Self {
        Self {
            service_id: service_id.to_string(),
            artifact_id: artifact_id.to_string(),
            success: false,
            message: failure.to_string(),
            mode,
            bytes_restored: 0,
            failure: Some(failure),
        }
    }
}

fn write_failure(
    service_id: &str,
    artifact_id: &str,
    mode: RestoreMode,
    reason: String,
) -> RestorationResult {
    RestorationResult::failed(
        service_id,
        artifact_id,
        mode,
        RestoreError::WriteFailure {
            service_id: service_id.to_string(),
            reason,
        },
    )
}

/// Everything one orchestration run did, in the order it did it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestorationReport {
    pub trigger: Trigger,

    /// Date used to derive artifact ids
    pub date: NaiveDate,

    /// Ranked services, most urgent first
    pub order: Vec<RankedService>,

    pub demand: DemandSnapshot,

    /// Results in execution order
    pub results: IndexMap<String, RestorationResult>,

    /// Services not attempted because of early exit
    pub deferred: Vec<String>,

    pub stats: RestorationStats,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RestorationReport {
    pub fn order_ids(&self) -> Vec<&str> {
        self.order.iter().map(|s| s.id.as_str()).collect()
    }

    pub fn all_succeeded(&self) -> bool {
        self.results.values().all(|r| r.success)
    }

    pub fn failures(&self) -> impl Iterator<Item = &RestorationResult> {
        self.results.values().filter(|r| !r.success)
    }
}

/// `{service_id}_backup_{YYYYMMDD}.bak`
pub fn artifact_id_for(service_id: &str, date: NaiveDate) -> String {
    format!("{}_backup_{}.bak", service_id, date.format("%Y%m%d"))
}

/// Priority-driven restoration engine
pub struct RestoreOrchestrator {
    registry: Arc<ServiceRegistry>,
    ledger: Arc<IntegrityLedger>,
    target: Arc<dyn TargetStore>,
    demand: Arc<dyn DemandSource>,
    policy: RestorePolicy,
    sink: Arc<dyn EventSink>,

    /// Held for the duration of a run; acquired with `try_lock` only
    gate: Mutex<()>,
}

impl RestoreOrchestrator {
    pub fn new(
        registry: Arc<ServiceRegistry>,
        ledger: Arc<IntegrityLedger>,
        target: Arc<dyn TargetStore>,
        demand: Arc<dyn DemandSource>,
        policy: RestorePolicy,
    ) -> Result<Self, ConfigError> {
        policy.validate()?;

        Ok(Self {
            registry,
            ledger,
            target,
            demand,
            policy,
            sink: Arc::new(TracingSink),
            gate: Mutex::new(()),
        })
    }

    /// Replace the default tracing sink
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &Arc<IntegrityLedger> {
        &self.ledger
    }

    pub fn policy(&self) -> &RestorePolicy {
        &self.policy
    }

    /// Whether a run currently holds the gate
    pub fn is_running(&self) -> bool {
        self.gate.try_lock().is_err()
    }

    /// Read demand for every registered service
    ///
    /// A failed, negative or non-finite sample is logged and read as zero.
    pub async fn sample_demand(&self) -> DemandSnapshot {
        let mut snapshot = DemandSnapshot::new();
        for id in self.registry.ids() {
            let demand = match self.demand.sample(id).await {
                Ok(value) if value.is_finite() && value >= 0.0 => value,
                Ok(value) => {
                    warn!("Ignoring invalid demand sample {} for {}", value, id);
                    0.0
                }
                Err(e) => {
                    warn!("Demand sample for {} failed, assuming idle: {:#}", id, e);
                    0.0
                }
            };
            snapshot.insert(id, demand);
        }
        snapshot
    }

    /// Rank services against a fresh demand sample
    pub async fn priority_order(&self) -> (DemandSnapshot, Vec<RankedService>) {
        let demand = self.sample_demand().await;
        let ranked = rank_services(&self.registry, &demand, self.policy.demand_ratio_floor);
        (demand, ranked)
    }

    /// Verify and restore one service
    ///
    /// Verification and staging are bounded by the policy's restore timeout.
    /// Publishing the staged bytes is not, so a target that changed is never
    /// reported as timed out.
    ///
    /// Per-service failures come back as an unsuccessful result. Only a
    /// ledger store failure is returned as an error.
    pub async fn restore_one(
        &self,
        service_id: &str,
        artifact_id: &str,
        mode: RestoreMode,
    ) -> Result<RestorationResult, LedgerError> {
        let timeout = self.policy.restore_timeout();
        info!(
            "Restoring {} from {} ({})",
            service_id, artifact_id, mode
        );

        let staged = match tokio::time::timeout(timeout, self.stage(service_id, artifact_id, mode))
            .await
        {
            Ok(staged) => staged?,
            Err(_) => {
                warn!(
                    "⏱️  Restore of {} exceeded {:?}, abandoned",
                    service_id, timeout
                );
                return Ok(RestorationResult::failed(
                    service_id,
                    artifact_id,
                    mode,
                    RestoreError::Timeout {
                        service_id: service_id.to_string(),
                        timeout,
                    },
                ));
            }
        };
        let staged = match staged {
            Ok(staged) => staged,
            Err(rejected) => return Ok(rejected),
        };

        match self.target.publish(staged).await {
            Ok(bytes) => {
                debug!("Restored {} bytes for {}", bytes, service_id);
                Ok(RestorationResult::restored(service_id, artifact_id, mode, bytes))
            }
            Err(e) => {
                error!("Write failure restoring {}: {}", service_id, e);
                Ok(write_failure(service_id, artifact_id, mode, e.to_string()))
            }
        }
    }

    /// Verify the artifact and stage its bytes, or produce the failed result
    async fn stage(
        &self,
        service_id: &str,
        artifact_id: &str,
        mode: RestoreMode,
    ) -> Result<Result<Staged, RestorationResult>, LedgerError> {
        let invalid = |reason: String, cause: Option<IntegrityError>| {
            RestorationResult::failed(
                service_id,
                artifact_id,
                mode,
                RestoreError::InvalidBackup {
                    artifact_id: artifact_id.to_string(),
                    reason,
                    cause,
                },
            )
        };

        let outcome = match self.ledger.verify(artifact_id).await {
            Ok(outcome) => outcome,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => return Ok(Err(invalid(e.to_string(), None))),
        };
        if !outcome.is_valid() {
            let cause = outcome.to_error(artifact_id);
            if matches!(cause, Some(IntegrityError::Mismatch { .. })) {
                error!(
                    "🚨 Refusing to restore {} from tampered {}: {}",
                    service_id,
                    artifact_id,
                    outcome.message()
                );
            } else {
                warn!(
                    "Refusing to restore {} from {}: {}",
                    service_id,
                    artifact_id,
                    outcome.message()
                );
            }
            return Ok(Err(invalid(outcome.message(), cause)));
        }

        let source = match self.ledger.backups().open(artifact_id).await {
            Ok(source) => source,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                return Ok(Err(write_failure(
                    service_id,
                    artifact_id,
                    mode,
                    e.to_string(),
                )))
            }
        };

        let limit = match mode {
            RestoreMode::Partial => Some(self.policy.partial_bytes),
            RestoreMode::Full => None,
        };

        match self.target.stage(service_id, mode, source, limit).await {
            Ok(staged) => Ok(Ok(staged)),
            Err(e) => {
                error!("Write failure staging {}: {}", service_id, e);
                Ok(Err(write_failure(
                    service_id,
                    artifact_id,
                    mode,
                    e.to_string(),
                )))
            }
        }
    }

    /// Run one orchestration pass using today's local date for artifact ids
    pub async fn orchestrate(
        &self,
        trigger: Trigger,
    ) -> Result<RestorationReport, OrchestrationError> {
        self.orchestrate_for_date(trigger, Local::now().date_naive())
            .await
    }

    /// Run one orchestration pass for the artifacts of a given date
    pub async fn orchestrate_for_date(
        &self,
        trigger: Trigger,
        date: NaiveDate,
    ) -> Result<RestorationReport, OrchestrationError> {
        let Ok(_guard) = self.gate.try_lock() else {
            warn!("Orchestration ({}) rejected: a run is already active", trigger);
            return Err(OrchestrationError::AlreadyRunning);
        };

        let started_at = Utc::now();
        let mut stats = RestorationStatsBuilder::new();

        info!("🚑 Orchestration started ({})", trigger);
        let (demand, order) = self.priority_order().await;
        info!(
            "Priority order: {}",
            order
                .iter()
                .map(|s| s.id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let mut results = IndexMap::new();
        let mut deferred = Vec::new();

        for (position, service) in order.iter().enumerate() {
            let artifact_id = artifact_id_for(&service.id, date);
            let mode = RestoreMode::select(
                service.current_demand,
                service.demand_threshold,
                self.policy.partial_factor,
            );

            let result = match self.restore_one(&service.id, &artifact_id, mode).await {
                Ok(result) => result,
                Err(e) => {
                    error!(
                        "🚨 Orchestration aborted at {}: ledger unavailable: {}",
                        service.id, e
                    );
                    emit_or_warn(
                        self.sink.as_ref(),
                        &orchestration_event(&service.id, "aborted", e.to_string()),
                    );
                    return Err(OrchestrationError::Ledger(e));
                }
            };

            emit_or_warn(self.sink.as_ref(), &restoration_event(&result));
            match &result.failure {
                None => {
                    info!("✅ {} restored ({})", service.id, mode);
                    stats.record_success(mode);
                }
                Some(failure) => {
                    warn!("❌ {} not restored: {}", service.id, failure);
                    stats.record_failure(failure);
                }
            }

            let stop = result.success && service.current_demand < service.demand_threshold;
            results.insert(service.id.clone(), result);

            if stop {
                deferred = order[position + 1..]
                    .iter()
                    .map(|s| s.id.clone())
                    .collect();
                if !deferred.is_empty() {
                    info!(
                        "{} is below its demand threshold, deferring: {}",
                        service.id,
                        deferred.join(", ")
                    );
                }
                break;
            }
        }

        stats.record_deferred(deferred.len());
        let stats = stats.finish();
        info!("📊 {}", stats.summary());

        Ok(RestorationReport {
            trigger,
            date,
            order,
            demand,
            results,
            deferred,
            stats,
            started_at,
            finished_at: Utc::now(),
        })
    }
}
