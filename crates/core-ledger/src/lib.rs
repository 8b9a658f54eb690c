//! Bulwark Core Ledger: trust-on-first-use integrity for backup artifacts
//!
//! Every artifact in a backup store is hashed (SHA-256, streamed) and checked
//! against a persisted ledger of known-good digests. Unknown artifacts are
//! registered on first sight; known artifacts must match their reference.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   list / open    ┌──────────────────┐
//! │   BackupStore    │ ◄─────────────── │ IntegrityLedger  │
//! │ (local dir, mem) │                  │  verify()        │
//! └──────────────────┘                  │  full_validation │
//!                                       │  _cycle()        │
//! ┌──────────────────┐   get / set      └────────┬─────────┘
//! │   LedgerStore    │ ◄────────────────────────┘
//! │ (JSON file, mem) │
//! └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use bulwark_core_ledger::{IntegrityLedger, JsonFileLedger, LocalBackupStore, VerifyOutcome};
//! use std::sync::Arc;
//!
//! # async fn example() -> bulwark_core_ledger::Result<()> {
//! let ledger = IntegrityLedger::new(
//!     Arc::new(LocalBackupStore::new("backups")),
//!     Arc::new(JsonFileLedger::new("hash_db.json")),
//! );
//!
//! match ledger.verify("servicio_db_backup_20250101.bak").await? {
//!     VerifyOutcome::Verified { .. } | VerifyOutcome::Registered { .. } => {}
//!     VerifyOutcome::Mismatch { expected, actual } => {
//!         eprintln!("tampered: expected {expected}, got {actual}");
//!     }
//!     VerifyOutcome::NotFound => eprintln!("missing"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod backup;
pub mod digest;
pub mod error;
pub mod ledger;
pub mod store;

pub use backup::{ArtifactReader, BackupStore, LocalBackupStore, MemoryBackupStore};
pub use digest::{compute_digest, Digest, StreamingHasher, DIGEST_CHUNK_SIZE};
pub use error::{LedgerError, Result};
pub use ledger::{
    IntegrityError, IntegrityLedger, IntegrityStatus, StatusKind, ValidationReport,
    ValidationStats, VerifyOutcome,
};
pub use store::{JsonFileLedger, LedgerStore, MemoryLedger};
