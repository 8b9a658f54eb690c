//! Ledger persistence backends
//!
//! The ledger only needs a tiny key-value surface: look up one artifact's
//! digest, record one artifact's digest, enumerate known artifacts. Anything
//! that offers those three operations can back an [`IntegrityLedger`].
//!
//! [`IntegrityLedger`]: crate::IntegrityLedger

use crate::digest::Digest;
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use indexmap::IndexMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Durable artifact id -> digest record
///
/// `set` must behave as a read-modify-write of a single key: entries for
/// other artifacts are never disturbed.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn get(&self, artifact_id: &str) -> Result<Option<Digest>>;

    async fn set(&self, artifact_id: &str, digest: &Digest) -> Result<()>;

    async fn list(&self) -> Result<Vec<String>>;
}

/// Ledger kept as a single JSON object on disk (`{"artifact": "digest", ...}`)
///
/// Every `set` reloads the document, changes one key, writes the result to a
/// sibling temp file and renames it over the original, so a crash mid-write
/// leaves the previous document intact.
pub struct JsonFileLedger {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonFileLedger {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<IndexMap<String, Digest>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(IndexMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(IndexMap::new()),
            Err(e) => Err(LedgerError::Io(e)),
        }
    }

    async fn persist(&self, entries: &IndexMap<String, Digest>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut tmp_name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .ok_or_else(|| {
                LedgerError::store(format!("invalid ledger path: {}", self.path.display()))
            })?;
        tmp_name.push(".tmp");
        let tmp_path = self.path.with_file_name(tmp_name);

        let json = serde_json::to_vec_pretty(entries)?;
        tokio::fs::write(&tmp_path, &json).await?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(LedgerError::Io(e));
        }

        debug!(
            "Ledger persisted: {} entries -> {}",
            entries.len(),
            self.path.display()
        );
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for JsonFileLedger {
    async fn get(&self, artifact_id: &str) -> Result<Option<Digest>> {
        Ok(self.load().await?.shift_remove(artifact_id))
    }

    async fn set(&self, artifact_id: &str, digest: &Digest) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load().await?;
        entries.insert(artifact_id.to_string(), digest.clone());
        self.persist(&entries).await
    }

    async fn list(&self) -> Result<Vec<String>> {
        Ok(self.load().await?.into_keys().collect())
    }
}

/// In-process ledger, useful for tests and dry runs
#[derive(Default)]
pub struct MemoryLedger {
    entries: Mutex<IndexMap<String, Digest>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, IndexMap<String, Digest>>> {
        self.entries
            .lock()
            .map_err(|_| LedgerError::store("memory ledger lock poisoned"))
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn get(&self, artifact_id: &str) -> Result<Option<Digest>> {
        Ok(self.entries()?.get(artifact_id).cloned())
    }

    async fn set(&self, artifact_id: &str, digest: &Digest) -> Result<()> {
        self.entries()?
            .insert(artifact_id.to_string(), digest.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>> {
        Ok(self.entries()?.keys().cloned().collect())
    }
}
