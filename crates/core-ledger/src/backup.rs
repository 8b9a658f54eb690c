//! Backup store abstraction
//!
//! A backup store is a flat, listable collection of artifacts addressed by
//! id. This crate never discovers or produces artifacts; it only reads them.

use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use indexmap::{IndexMap, IndexSet};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::io::AsyncRead;

/// Byte stream over one artifact
pub type ArtifactReader = Box<dyn AsyncRead + Send + Unpin>;

#[async_trait]
pub trait BackupStore: Send + Sync {
    /// Ids of every artifact currently in the store, in a stable order
    async fn list(&self) -> Result<Vec<String>>;

    async fn exists(&self, artifact_id: &str) -> Result<bool>;

    /// Open an artifact for streaming
    async fn open(&self, artifact_id: &str) -> Result<ArtifactReader>;
}

/// Artifacts stored as regular files directly inside one directory
#[derive(Debug, Clone)]
pub struct LocalBackupStore {
    root: PathBuf,
}

impl LocalBackupStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an id to a path, refusing anything that would escape the root.
    fn resolve(&self, artifact_id: &str) -> Option<PathBuf> {
        let valid = !artifact_id.is_empty()
            && artifact_id != "."
            && artifact_id != ".."
            && !artifact_id.contains(['/', '\\']);
        valid.then(|| self.root.join(artifact_id))
    }
}

#[async_trait]
impl BackupStore for LocalBackupStore {
    async fn list(&self) -> Result<Vec<String>> {
        let store_err = |source| LedgerError::BackupStore {
            path: self.root.clone(),
            source,
        };

        let mut entries = tokio::fs::read_dir(&self.root).await.map_err(store_err)?;
        let mut ids = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(store_err)? {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            let file_type = entry.file_type().await.map_err(store_err)?;
            if file_type.is_file() {
                ids.push(name);
            }
        }

        ids.sort();
        Ok(ids)
    }

    async fn exists(&self, artifact_id: &str) -> Result<bool> {
        let Some(path) = self.resolve(artifact_id) else {
            return Ok(false);
        };
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(LedgerError::artifact(artifact_id, e)),
        }
    }

    async fn open(&self, artifact_id: &str) -> Result<ArtifactReader> {
        let path = self.resolve(artifact_id).ok_or_else(|| {
            LedgerError::artifact(
                artifact_id,
                io::Error::new(ErrorKind::InvalidInput, "invalid artifact id"),
            )
        })?;
        let file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| LedgerError::artifact(artifact_id, e))?;
        Ok(Box::new(file))
    }
}

/// In-memory backup store with fault injection, for tests and simulations
#[derive(Default)]
pub struct MemoryBackupStore {
    artifacts: Mutex<IndexMap<String, Vec<u8>>>,
    unreadable: Mutex<IndexSet<String>>,
}

impl MemoryBackupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an artifact's bytes
    pub fn put<S: Into<String>, B: Into<Vec<u8>>>(&self, artifact_id: S, bytes: B) {
        if let Ok(mut artifacts) = self.artifacts.lock() {
            artifacts.insert(artifact_id.into(), bytes.into());
        }
    }

    pub fn remove(&self, artifact_id: &str) {
        if let Ok(mut artifacts) = self.artifacts.lock() {
            artifacts.shift_remove(artifact_id);
        }
    }

    /// Make every subsequent `open` of this artifact fail with an I/O error
    pub fn make_unreadable<S: Into<String>>(&self, artifact_id: S) {
        if let Ok(mut unreadable) = self.unreadable.lock() {
            unreadable.insert(artifact_id.into());
        }
    }

    fn poisoned() -> LedgerError {
        LedgerError::store("memory backup store lock poisoned")
    }
}

#[async_trait]
impl BackupStore for MemoryBackupStore {
    async fn list(&self) -> Result<Vec<String>> {
        let artifacts = self.artifacts.lock().map_err(|_| Self::poisoned())?;
        Ok(artifacts.keys().cloned().collect())
    }

    async fn exists(&self, artifact_id: &str) -> Result<bool> {
        let artifacts = self.artifacts.lock().map_err(|_| Self::poisoned())?;
        Ok(artifacts.contains_key(artifact_id))
    }

    async fn open(&self, artifact_id: &str) -> Result<ArtifactReader> {
        let unreadable = self
            .unreadable
            .lock()
            .map_err(|_| Self::poisoned())?
            .contains(artifact_id);
        if unreadable {
            return Err(LedgerError::artifact(
                artifact_id,
                io::Error::other("injected read failure"),
            ));
        }

        let artifacts = self.artifacts.lock().map_err(|_| Self::poisoned())?;
        let bytes = artifacts.get(artifact_id).cloned().ok_or_else(|| {
            LedgerError::artifact(
                artifact_id,
                io::Error::new(ErrorKind::NotFound, "artifact not found"),
            )
        })?;
        Ok(Box::new(io::Cursor::new(bytes)))
    }
}
