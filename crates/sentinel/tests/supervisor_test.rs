use async_trait::async_trait;
use bulwark_core_audit::{EventKind, MemorySink, Severity};
use bulwark_core_ledger::{
    Digest, IntegrityLedger, LedgerError, LedgerStore, MemoryBackupStore, MemoryLedger,
};
use bulwark_sentinel::{
    artifact_id_for, AlwaysIncident, IncidentDetector, LocalTargetStore, NeverIncident,
    ResilienceSupervisor, RestorationOutcome, RestoreOrchestrator, RestorePolicy,
    ServiceRegistry, StaticDemand, SupervisorError, Trigger,
};
use chrono::Local;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::{tempdir, TempDir};
use tokio::sync::Notify;

struct Harness {
    backups: Arc<MemoryBackupStore>,
    production: TempDir,
    sink: Arc<MemorySink>,
    supervisor: Arc<ResilienceSupervisor>,
}

fn harness(store: Arc<dyn LedgerStore>, detector: Arc<dyn IncidentDetector>) -> Harness {
    let backups = Arc::new(MemoryBackupStore::new());
    let today = Local::now().date_naive();
    for id in ServiceRegistry::builtin().ids() {
        backups.put(artifact_id_for(id, today), id.as_bytes().to_vec());
    }

    let ledger = Arc::new(IntegrityLedger::new(backups.clone(), store));
    let production = tempdir().unwrap();
    let sink = Arc::new(MemorySink::new());

    let orchestrator = RestoreOrchestrator::new(
        Arc::new(ServiceRegistry::builtin()),
        ledger.clone(),
        Arc::new(LocalTargetStore::new(production.path())),
        Arc::new(StaticDemand::new()),
        RestorePolicy::default(),
    )
    .unwrap()
    .with_sink(sink.clone());

    let supervisor = ResilienceSupervisor::new(ledger, Arc::new(orchestrator), detector)
        .with_sink(sink.clone());

    Harness {
        backups,
        production,
        sink,
        supervisor: Arc::new(supervisor),
    }
}

#[tokio::test]
async fn test_tick_with_incident_restores_and_emits_events() {
    let h = harness(Arc::new(MemoryLedger::new()), Arc::new(AlwaysIncident));

    let report = h.supervisor.run_tick().await;
    assert!(report.incident);
    assert_eq!(report.validation.as_ref().unwrap().stats.registered, 3);

    let RestorationOutcome::Completed(restoration) = &report.restoration else {
        panic!("expected a completed restoration, got {:?}", report.restoration);
    };
    // All services idle: the most critical one is restored, the rest deferred
    assert_eq!(restoration.results.len(), 1);
    assert!(restoration.results["servicio_db"].success);
    assert_eq!(restoration.deferred.len(), 2);
    assert!(h
        .production
        .path()
        .join("servicio_db")
        .join("partial_restore")
        .exists());

    let events = h.sink.events();
    let validations = events
        .iter()
        .filter(|e| e.kind == EventKind::Validation)
        .count();
    assert_eq!(validations, 3);
    assert!(events.iter().any(|e| e.kind == EventKind::Restoration));
}

#[tokio::test]
async fn test_mismatch_is_emitted_as_critical() {
    let h = harness(Arc::new(MemoryLedger::new()), Arc::new(NeverIncident));
    h.supervisor.validate().await.unwrap();

    let artifact = artifact_id_for("servicio_api", Local::now().date_naive());
    h.backups.put(artifact.clone(), b"tampered".to_vec());
    h.sink.clear();

    let report = h.supervisor.validate().await.unwrap();
    assert!(report.has_mismatch());

    let critical: Vec<_> = h
        .sink
        .events()
        .into_iter()
        .filter(|e| e.severity == Severity::Critical)
        .collect();
    assert_eq!(critical.len(), 1);
    assert_eq!(critical[0].subject, artifact);
    assert_eq!(critical[0].outcome, "mismatch");
}

#[tokio::test]
async fn test_start_twice_is_rejected() {
    let h = harness(Arc::new(MemoryLedger::new()), Arc::new(NeverIncident));

    h.supervisor
        .start_monitoring(Duration::from_secs(3600))
        .unwrap();
    assert!(h.supervisor.is_monitoring());
    assert_eq!(
        h.supervisor.start_monitoring(Duration::from_secs(3600)),
        Err(SupervisorError::AlreadyMonitoring)
    );

    assert!(h.supervisor.stop_monitoring().await);
    assert!(!h.supervisor.is_monitoring());
    assert!(!h.supervisor.stop_monitoring().await);

    // Restart after a clean stop is allowed
    h.supervisor.start_monitoring(Duration::from_secs(3600)).unwrap();
    assert!(h.supervisor.stop_monitoring().await);
}

#[tokio::test]
async fn test_manual_restore_of_tampered_backup_is_critical() {
    let h = harness(Arc::new(MemoryLedger::new()), Arc::new(NeverIncident));
    h.supervisor.validate().await.unwrap();

    let artifact = artifact_id_for("servicio_db", Local::now().date_naive());
    h.backups.put(artifact.clone(), b"tampered".to_vec());
    h.sink.clear();

    let report = h.supervisor.manual_trigger().await.unwrap();
    let db = &report.results["servicio_db"];
    assert!(!db.success);
    assert!(db.failure.as_ref().is_some_and(|f| f.is_mismatch()));
    assert!(!h.production.path().join("servicio_db").exists());

    let critical: Vec<_> = h
        .sink
        .events()
        .into_iter()
        .filter(|e| e.severity == Severity::Critical)
        .collect();
    assert_eq!(critical.len(), 1);
    assert_eq!(critical[0].kind, EventKind::Restoration);
    assert_eq!(critical[0].subject, "servicio_db");
    assert_eq!(critical[0].outcome, "mismatch");
    assert_eq!(critical[0].artifact.as_deref(), Some(artifact.as_str()));
}

/// Detector that parks until the test lets it answer
#[derive(Default)]
struct ParkedDetector {
    entered: Notify,
    release: Notify,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

#[async_trait]
impl IncidentDetector for ParkedDetector {
    async fn detect(&self) -> bool {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.entered.notify_one();
        self.release.notified().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        true
    }
}

/// Yield until a stop request is visible to the supervisor
async fn wait_for_stop_request(supervisor: &ResilienceSupervisor) {
    while supervisor.is_monitoring() {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_stop_lets_inflight_tick_finish_and_skips_restoration() {
    let detector = Arc::new(ParkedDetector::default());
    let h = harness(Arc::new(MemoryLedger::new()), detector.clone());
    let mut reports = h.supervisor.subscribe();

    h.supervisor.start_monitoring(Duration::from_secs(10)).unwrap();
    detector.entered.notified().await;

    let stopper = tokio::spawn({
        let supervisor = h.supervisor.clone();
        async move { supervisor.stop_monitoring().await }
    });
    wait_for_stop_request(&h.supervisor).await;
    detector.release.notify_one();

    assert!(stopper.await.unwrap());
    reports.changed().await.unwrap();

    let report = h.supervisor.last_report().unwrap();
    assert_eq!(report.tick, 1);
    assert!(report.incident);
    assert!(matches!(report.restoration, RestorationOutcome::Cancelled));
    assert!(!h.production.path().join("servicio_db").exists());
}

#[tokio::test]
async fn test_start_while_stopping_is_rejected() {
    let detector = Arc::new(ParkedDetector::default());
    let h = harness(Arc::new(MemoryLedger::new()), detector.clone());

    h.supervisor.start_monitoring(Duration::from_secs(10)).unwrap();
    detector.entered.notified().await;

    let stopper = tokio::spawn({
        let supervisor = h.supervisor.clone();
        async move { supervisor.stop_monitoring().await }
    });
    wait_for_stop_request(&h.supervisor).await;

    // The first loop is still inside tick 1
    assert_eq!(
        h.supervisor.start_monitoring(Duration::from_secs(10)),
        Err(SupervisorError::AlreadyMonitoring)
    );

    detector.release.notify_one();
    assert!(stopper.await.unwrap());

    // Once the loop has exited a new one may start
    h.supervisor.start_monitoring(Duration::from_secs(10)).unwrap();
    detector.entered.notified().await;
    detector.release.notify_one();
    assert!(h.supervisor.stop_monitoring().await);

    assert_eq!(detector.max_in_flight.load(Ordering::SeqCst), 1);
}

/// Reads work, writes are refused
struct ReadOnlyLedger;

#[async_trait]
impl LedgerStore for ReadOnlyLedger {
    async fn get(&self, _artifact_id: &str) -> bulwark_core_ledger::Result<Option<Digest>> {
        Ok(None)
    }

    async fn set(&self, _artifact_id: &str, _digest: &Digest) -> bulwark_core_ledger::Result<()> {
        Err(LedgerError::store("ledger is read-only"))
    }

    async fn list(&self) -> bulwark_core_ledger::Result<Vec<String>> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_loop_survives_aborted_runs() {
    let h = harness(Arc::new(ReadOnlyLedger), Arc::new(AlwaysIncident));
    let mut reports = h.supervisor.subscribe();

    h.supervisor
        .start_monitoring(Duration::from_millis(20))
        .unwrap();

    let mut seen = Vec::new();
    while seen.len() < 2 {
        reports.changed().await.unwrap();
        let report = reports.borrow_and_update().clone().unwrap();
        seen.push(report);
    }
    h.supervisor.stop_monitoring().await;

    for report in &seen {
        assert!(matches!(report.restoration, RestorationOutcome::Aborted(_)));
        // Validation records the failed registrations per artifact
        assert_eq!(report.validation.as_ref().unwrap().stats.errored, 3);
    }
    assert!(seen[1].tick > seen[0].tick);
}

#[tokio::test]
async fn test_manual_trigger_runs_without_incident() {
    let h = harness(Arc::new(MemoryLedger::new()), Arc::new(NeverIncident));

    let tick = h.supervisor.run_tick().await;
    assert!(matches!(tick.restoration, RestorationOutcome::NotTriggered));
    assert!(!h.production.path().join("servicio_db").exists());

    let report = h.supervisor.manual_trigger().await.unwrap();
    assert_eq!(report.trigger, Trigger::Manual);
    assert!(report.results["servicio_db"].success);
    assert!(!h.supervisor.orchestrator().is_running());
}
