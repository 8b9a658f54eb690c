//! Mapping from engine outcomes to audit events

use crate::orchestrator::RestorationResult;
use bulwark_core_audit::{AuditEvent, EventKind, EventSink, Severity};
use bulwark_core_ledger::{IntegrityStatus, StatusKind};
use tracing::warn;

/// Mismatches need an operator; missing or unreadable artifacts are warnings
pub fn validation_event(status: &IntegrityStatus) -> AuditEvent {
    let severity = match status.outcome {
        StatusKind::Mismatch => Severity::Critical,
        StatusKind::NotFound | StatusKind::Error => Severity::Warning,
        StatusKind::Verified | StatusKind::Registered => Severity::Info,
    };

    let mut event = AuditEvent::validation(
        status.artifact_id.as_str(),
        status.outcome.as_str(),
        severity,
    )
    .with_message(status.message.as_str());
    event.ts = status.checked_at;
    event
}

/// A backup found tampered during a restore is as critical as one found by
/// a validation cycle
pub fn restoration_event(result: &RestorationResult) -> AuditEvent {
    let (outcome, severity) = match &result.failure {
        None => ("restored", Severity::Info),
        Some(failure) if failure.is_mismatch() => {
            (StatusKind::Mismatch.as_str(), Severity::Critical)
        }
        Some(failure) => (failure.kind(), Severity::Warning),
    };

    AuditEvent::restoration(result.service_id.as_str(), outcome, severity)
        .with_message(result.message.as_str())
        .with_mode(result.mode.as_str())
        .with_artifact(result.artifact_id.as_str())
}

pub fn orchestration_event(subject: &str, outcome: &str, message: String) -> AuditEvent {
    AuditEvent::new(EventKind::Orchestration, subject, outcome, Severity::Critical)
        .with_message(message)
}

/// Emit, logging instead of failing when the sink is unavailable
pub fn emit_or_warn(sink: &dyn EventSink, event: &AuditEvent) {
    if let Err(e) = sink.emit(event) {
        warn!(
            "Failed to emit {} event for {}: {}",
            event.kind.as_str(),
            event.subject,
            e
        );
    }
}
