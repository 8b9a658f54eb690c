//! Audit sinks
//!
//! A sink receives every [`AuditEvent`] the engine produces. Transport is
//! up to the sink: an append-only JSON Lines file, the `tracing` pipeline,
//! an in-memory buffer for tests, or several of those at once.

use crate::error::{Error, Result};
use crate::event::{AuditEvent, Severity};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Destination for audit events
///
/// Emitting must not block for long; callers treat a failed emit as a
/// warning and keep going.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &AuditEvent) -> Result<()>;
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn emit(&self, event: &AuditEvent) -> Result<()> {
        (**self).emit(event)
    }
}

/// Append-only JSON Lines audit log
///
/// # Thread Safety
/// The writer is guarded by a mutex; the sink can be shared across tasks.
///
/// # Example
/// ```no_run
/// use bulwark_core_audit::{AuditEvent, EventSink, JsonlSink, Severity};
///
/// let sink = JsonlSink::new("audit.jsonl").unwrap();
/// sink.emit(&AuditEvent::validation("db.bak", "verified", Severity::Info)).unwrap();
/// ```
pub struct JsonlSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl JsonlSink {
    /// Open or create the log file in append mode
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|_| Error::create_failed(&path))?;

        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSink for JsonlSink {
    fn emit(&self, event: &AuditEvent) -> Result<()> {
        let json = serde_json::to_string(event)?;

        let mut writer = self
            .writer
            .lock()
            .map_err(|_| Error::SinkUnavailable(self.path.display().to_string()))?;
        writeln!(writer, "{}", json)?;
        writer.flush()?; // Always flush for durability

        Ok(())
    }
}

/// Forwards events into the `tracing` pipeline as structured fields
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &AuditEvent) -> Result<()> {
        let kind = event.kind.as_str();
        let message = event.message.as_deref().unwrap_or("");
        let mode = event.mode.as_deref().unwrap_or("");
        match event.severity {
            Severity::Info => tracing::info!(
                target: "bulwark::audit",
                kind,
                subject = %event.subject,
                outcome = %event.outcome,
                mode,
                "{}",
                message
            ),
            Severity::Warning => tracing::warn!(
                target: "bulwark::audit",
                kind,
                subject = %event.subject,
                outcome = %event.outcome,
                mode,
                "{}",
                message
            ),
            Severity::Critical => tracing::error!(
                target: "bulwark::audit",
                kind,
                subject = %event.subject,
                outcome = %event.outcome,
                mode,
                "{}",
                message
            ),
        }
        Ok(())
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &AuditEvent) -> Result<()> {
        self.events
            .lock()
            .map_err(|_| Error::SinkUnavailable("memory sink".to_string()))?
            .push(event.clone());
        Ok(())
    }
}

/// Emits to every inner sink; the first failure is returned after all
/// sinks have been tried.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl EventSink for FanoutSink {
    fn emit(&self, event: &AuditEvent) -> Result<()> {
        let mut first_err = None;
        for sink in &self.sinks {
            if let Err(e) = sink.emit(event) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

/// Parse audit events from a JSON Lines file
pub fn parse_audit_log<P: AsRef<Path>>(path: P) -> Result<Vec<AuditEvent>> {
    let contents = std::fs::read_to_string(path)?;
    let mut events = Vec::new();

    for (line_num, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let event: AuditEvent = serde_json::from_str(line)
            .map_err(|e| Error::invalid_entry(line_num + 1, &e.to_string()))?;

        events.push(event);
    }

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn test_jsonl_sink_creation() {
        let temp_file = NamedTempFile::new().unwrap();
        let sink = JsonlSink::new(temp_file.path()).unwrap();
        assert_eq!(sink.path(), temp_file.path());
    }

    #[test]
    fn test_jsonl_sink_round_trip() {
        let temp_file = NamedTempFile::new().unwrap();
        let sink = JsonlSink::new(temp_file.path()).unwrap();

        sink.emit(&AuditEvent::validation("db.bak", "registered", Severity::Info))
            .unwrap();
        sink.emit(
            &AuditEvent::restoration("servicio_db", "restored", Severity::Info).with_mode("full"),
        )
        .unwrap();

        let events = parse_audit_log(temp_file.path()).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EventKind::Validation);
        assert_eq!(events[0].outcome, "registered");
        assert_eq!(events[1].subject, "servicio_db");
        assert_eq!(events[1].mode.as_deref(), Some("full"));
    }

    #[test]
    fn test_jsonl_sink_appends_across_instances() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("audit.jsonl");

        JsonlSink::new(&path)
            .unwrap()
            .emit(&AuditEvent::validation("a.bak", "verified", Severity::Info))
            .unwrap();
        JsonlSink::new(&path)
            .unwrap()
            .emit(&AuditEvent::validation("a.bak", "mismatch", Severity::Critical))
            .unwrap();

        let events = parse_audit_log(&path).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].severity, Severity::Critical);
    }

    #[test]
    fn test_parse_skips_empty_lines() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(
            temp_file.path(),
            "{\"ts\":\"2025-10-18T12:00:00Z\",\"kind\":\"validation\",\"subject\":\"a.bak\",\"outcome\":\"verified\",\"severity\":\"info\"}\n\n\n",
        )
        .unwrap();

        let events = parse_audit_log(temp_file.path()).unwrap();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_parse_reports_bad_line() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), "{oops}\n").unwrap();

        let err = parse_audit_log(temp_file.path()).unwrap_err();
        assert!(matches!(err, Error::InvalidEntry { line: 1, .. }));
    }

    #[test]
    fn test_memory_and_fanout() {
        let a = Arc::new(MemorySink::new());
        let b = Arc::new(MemorySink::new());
        let fanout = FanoutSink::new()
            .with(a.clone())
            .with(b.clone())
            .with(Arc::new(TracingSink));
        assert_eq!(fanout.len(), 3);

        fanout
            .emit(&AuditEvent::validation("x.bak", "not_found", Severity::Warning))
            .unwrap();

        assert_eq!(a.events().len(), 1);
        assert_eq!(b.events()[0].subject, "x.bak");

        a.clear();
        assert!(a.events().is_empty());
    }
}
