//! Audit events and sinks for Bulwark
//!
//! Every integrity check and every restore produces one structured
//! [`AuditEvent`]. Events go to an [`EventSink`]; the engine never cares
//! what the sink does with them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  Validation cycle / Orchestrator    │
//! └──────────────┬──────────────────────┘
//!                │ emit(AuditEvent)
//!                ▼
//! ┌─────────────────────────────────────┐
//! │           FanoutSink                │
//! └───────┬─────────────────┬───────────┘
//!         ▼                 ▼
//! ┌───────────────┐  ┌───────────────┐
//! │  JsonlSink    │  │  TracingSink  │
//! │ audit.jsonl   │  │ (subscriber)  │
//! └───────────────┘  └───────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use bulwark_core_audit::{AuditEvent, EventSink, JsonlSink, Severity};
//!
//! let sink = JsonlSink::new("audit.jsonl").unwrap();
//! sink.emit(
//!     &AuditEvent::restoration("servicio_db", "restored", Severity::Info).with_mode("full"),
//! )
//! .unwrap();
//! ```

pub mod error;
pub mod event;
pub mod sink;

pub use error::{Error, Result};
pub use event::{AuditEvent, EventKind, Severity};
pub use sink::{parse_audit_log, EventSink, FanoutSink, JsonlSink, MemorySink, TracingSink};
