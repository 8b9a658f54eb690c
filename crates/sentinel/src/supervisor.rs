//! Resilience Supervisor: the monitoring loop
//!
//! Each tick runs three steps in order:
//!
//! ```text
//! validate every artifact ──> ask the incident detector ──> orchestrate (if incident)
//! ```
//!
//! The loop lives in one tokio task. Stopping cancels a token and waits for
//! that task; a tick already in progress finishes the step it is on and
//! skips the rest. Manual triggers go through the same orchestrator, so they
//! share its single-run gate with the loop.

use crate::audit::{emit_or_warn, validation_event};
use crate::error::{OrchestrationError, SupervisorError};
use crate::orchestrator::{RestorationReport, RestoreOrchestrator, Trigger};
use crate::signals::IncidentDetector;
use bulwark_core_audit::{EventSink, TracingSink};
use bulwark_core_ledger::{IntegrityLedger, LedgerError, ValidationReport};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Detector bound for ticks run outside the monitoring loop
pub const DEFAULT_DETECT_TIMEOUT: Duration = Duration::from_secs(60);

/// What the restoration step of a tick did
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum RestorationOutcome {
    /// No incident, nothing to do
    NotTriggered,
    Completed(RestorationReport),
    /// Another run (usually a manual trigger) held the gate
    Rejected,
    /// The run hit a fatal ledger error
    Aborted(String),
    /// Monitoring stopped before the restoration step
    Cancelled,
}

/// Result of one monitoring tick; replaced by the next tick
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub validation: Result<ValidationReport, String>,
    pub incident: bool,
    pub restoration: RestorationOutcome,
}

/// Occupies the slot from start until the loop task has exited
struct Monitor {
    cancel: CancellationToken,
    /// Fires when the loop future completes or is dropped
    finished: CancellationToken,
    task: JoinHandle<()>,
}

impl Monitor {
    fn is_alive(&self) -> bool {
        !self.task.is_finished() && !self.finished.is_cancelled()
    }
}

struct Inner {
    ledger: Arc<IntegrityLedger>,
    orchestrator: Arc<RestoreOrchestrator>,
    detector: Arc<dyn IncidentDetector>,
    sink: Arc<dyn EventSink>,
    ticks: AtomicU64,
    reports: watch::Sender<Option<Arc<TickReport>>>,
}

/// Owns the monitoring loop and the manual trigger
pub struct ResilienceSupervisor {
    inner: Arc<Inner>,
    detect_timeout: Option<Duration>,
    monitor: Mutex<Option<Monitor>>,
}

impl ResilienceSupervisor {
    pub fn new(
        ledger: Arc<IntegrityLedger>,
        orchestrator: Arc<RestoreOrchestrator>,
        detector: Arc<dyn IncidentDetector>,
    ) -> Self {
        let (reports, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                ledger,
                orchestrator,
                detector,
                sink: Arc::new(TracingSink),
                ticks: AtomicU64::new(0),
                reports,
            }),
            detect_timeout: None,
            monitor: Mutex::new(None),
        }
    }

    /// Sink for validation events. Set before [`start_monitoring`](Self::start_monitoring).
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.sink = sink;
        }
        self
    }

    /// Bound for the incident detector; defaults to the tick interval
    pub fn with_detect_timeout(mut self, timeout: Duration) -> Self {
        self.detect_timeout = Some(timeout);
        self
    }

    pub fn orchestrator(&self) -> &Arc<RestoreOrchestrator> {
        &self.inner.orchestrator
    }

    /// Spawn the monitoring loop; the first tick runs immediately
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_monitoring(&self, interval: Duration) -> Result<(), SupervisorError> {
        if interval.is_zero() {
            return Err(SupervisorError::InvalidInterval);
        }

        // A loop that is still finishing its last tick after a stop request
        // keeps the slot
        let mut monitor = self.monitor.lock().unwrap_or_else(|e| e.into_inner());
        if monitor.as_ref().is_some_and(Monitor::is_alive) {
            return Err(SupervisorError::AlreadyMonitoring);
        }

        let cancel = CancellationToken::new();
        let finished = CancellationToken::new();
        let inner = self.inner.clone();
        let detect_timeout = self.detect_timeout.unwrap_or(interval);
        let task = tokio::spawn({
            let cancel = cancel.clone();
            let finished = finished.clone();
            async move {
                let _finished = finished.drop_guard();
                monitor_loop(inner, interval, detect_timeout, cancel).await;
            }
        });

        info!("🔍 Resilience monitoring started (interval: {:?})", interval);
        *monitor = Some(Monitor {
            cancel,
            finished,
            task,
        });
        Ok(())
    }

    /// Stop the loop and wait for it to exit
    ///
    /// Until the loop has exited, [`start_monitoring`](Self::start_monitoring)
    /// keeps returning [`SupervisorError::AlreadyMonitoring`]. Returns `false`
    /// when monitoring was not running.
    pub async fn stop_monitoring(&self) -> bool {
        let finished = {
            let monitor = self.monitor.lock().unwrap_or_else(|e| e.into_inner());
            let Some(monitor) = monitor.as_ref() else {
                return false;
            };
            monitor.cancel.cancel();
            monitor.finished.clone()
        };

        finished.cancelled().await;

        let monitor = self
            .monitor
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take_if(|m| m.finished.is_cancelled());
        if let Some(monitor) = monitor {
            if let Err(e) = monitor.task.await {
                error!("Monitoring task ended abnormally: {}", e);
            }
            info!("⏹️  Resilience monitoring stopped");
        }
        true
    }

    /// `false` once a stop has been requested, even while the last tick
    /// is still finishing
    pub fn is_monitoring(&self) -> bool {
        self.monitor
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|m| m.is_alive() && !m.cancel.is_cancelled())
    }

    /// Run one tick outside the loop and publish its report
    pub async fn run_tick(&self) -> Arc<TickReport> {
        let timeout = self.detect_timeout.unwrap_or(DEFAULT_DETECT_TIMEOUT);
        self.inner.run_tick(timeout, None).await
    }

    /// Operator-requested restoration; shares the gate with the loop
    pub async fn manual_trigger(&self) -> Result<RestorationReport, OrchestrationError> {
        info!("Manual restoration requested");
        self.inner.orchestrator.orchestrate(Trigger::Manual).await
    }

    /// Run a validation cycle and emit one event per artifact
    pub async fn validate(&self) -> Result<ValidationReport, LedgerError> {
        self.inner.validate().await
    }

    /// Receive every future tick report
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<TickReport>>> {
        self.inner.reports.subscribe()
    }

    pub fn last_report(&self) -> Option<Arc<TickReport>> {
        self.inner.reports.borrow().clone()
    }
}

impl Inner {
    async fn validate(&self) -> Result<ValidationReport, LedgerError> {
        let report = self.ledger.full_validation_cycle().await?;
        for status in report.statuses.values() {
            emit_or_warn(self.sink.as_ref(), &validation_event(status));
        }
        Ok(report)
    }

    async fn run_tick(
        &self,
        detect_timeout: Duration,
        cancel: Option<&CancellationToken>,
    ) -> Arc<TickReport> {
        let tick = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        let cancelled = || cancel.is_some_and(CancellationToken::is_cancelled);

        let validation = self.validate().await.map_err(|e| {
            error!("Validation cycle failed: {}", e);
            e.to_string()
        });

        let (incident, restoration) = if cancelled() {
            (false, RestorationOutcome::Cancelled)
        } else {
            let incident = match tokio::time::timeout(detect_timeout, self.detector.detect()).await
            {
                Ok(incident) => incident,
                Err(_) => {
                    warn!(
                        "Incident detector did not answer within {:?}, assuming no incident",
                        detect_timeout
                    );
                    false
                }
            };

            let restoration = if cancelled() {
                RestorationOutcome::Cancelled
            } else if incident {
                warn!("🚨 Incident detected, starting restoration");
                self.orchestrate().await
            } else {
                RestorationOutcome::NotTriggered
            };
            (incident, restoration)
        };

        let report = Arc::new(TickReport {
            tick,
            validation,
            incident,
            restoration,
        });
        self.reports.send_replace(Some(report.clone()));
        report
    }

    async fn orchestrate(&self) -> RestorationOutcome {
        match self.orchestrator.orchestrate(Trigger::Scheduled).await {
            Ok(report) => RestorationOutcome::Completed(report),
            Err(OrchestrationError::AlreadyRunning) => {
                warn!("Restoration skipped this tick: another run is active");
                RestorationOutcome::Rejected
            }
            Err(e) => {
                error!("Restoration aborted: {}", e);
                RestorationOutcome::Aborted(e.to_string())
            }
        }
    }
}

async fn monitor_loop(
    inner: Arc<Inner>,
    interval: Duration,
    detect_timeout: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        inner.run_tick(detect_timeout, Some(&cancel)).await;
    }
}
