//! Production targets
//!
//! A restore never writes the visible target in place. Bytes are staged
//! into a hidden file in the same directory and renamed over the target
//! once complete, so an observer sees either the old content or the new
//! content and never a torn write.

use crate::priority::RestoreMode;
use async_trait::async_trait;
use bulwark_core_ledger::ArtifactReader;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tracing::{debug, warn};

static STAGING_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Restored bytes that are durable but not yet visible
///
/// Dropping it without publishing discards the staged copy.
pub struct Staged {
    bytes: u64,
    file: Option<StagedFile>,
}

struct StagedFile {
    guard: StagingGuard,
    staging: PathBuf,
    target: PathBuf,
}

impl Staged {
    /// Staged result for stores with nothing left to do on publish
    pub fn new(bytes: u64) -> Self {
        Self { bytes, file: None }
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

/// Where restored bytes end up
///
/// A restore is split in two: [`stage`](TargetStore::stage) may be abandoned
/// at any await point, [`publish`](TargetStore::publish) is expected to run
/// to completion once called.
#[async_trait]
pub trait TargetStore: Send + Sync {
    /// Copy at most `limit` bytes (everything when `None`) from `source` into
    /// a location that is not yet visible as the target for
    /// `service_id`/`mode`.
    async fn stage(
        &self,
        service_id: &str,
        mode: RestoreMode,
        source: ArtifactReader,
        limit: Option<u64>,
    ) -> io::Result<Staged>;

    /// Replace the visible target with the staged bytes.
    ///
    /// Returns the number of bytes written.
    async fn publish(&self, staged: Staged) -> io::Result<u64> {
        Ok(staged.bytes)
    }

    /// Stage and publish in one go
    async fn commit(
        &self,
        service_id: &str,
        mode: RestoreMode,
        source: ArtifactReader,
        limit: Option<u64>,
    ) -> io::Result<u64> {
        let staged = self.stage(service_id, mode, source, limit).await?;
        self.publish(staged).await
    }
}

/// Target file name for a restore mode
pub fn target_file_name(mode: RestoreMode) -> &'static str {
    match mode {
        RestoreMode::Partial => "partial_restore",
        RestoreMode::Full => "full_restore",
    }
}

/// `<root>/<service>/{partial_restore,full_restore}` on the local filesystem
#[derive(Debug, Clone)]
pub struct LocalTargetStore {
    root: PathBuf,
}

impl LocalTargetStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Visible target path for a service and mode
    pub fn target_path(&self, service_id: &str, mode: RestoreMode) -> io::Result<PathBuf> {
        Ok(self.service_dir(service_id)?.join(target_file_name(mode)))
    }

    fn service_dir(&self, service_id: &str) -> io::Result<PathBuf> {
        if service_id.is_empty()
            || service_id == "."
            || service_id == ".."
            || service_id.contains(['/', '\\'])
        {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                format!("invalid service id: {service_id:?}"),
            ));
        }
        Ok(self.root.join(service_id))
    }
}

/// Removes the staging file unless disarmed after a successful rename.
///
/// Covers both early returns and a restore future dropped on timeout.
struct StagingGuard {
    path: Option<PathBuf>,
}

impl StagingGuard {
    fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    fn disarm(&mut self) {
        self.path = None;
    }
}

impl Drop for StagingGuard {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!("Removed abandoned staging file {}", path.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(
                    "Failed to remove staging file {}: {}",
                    path.display(),
                    e
                ),
            }
        }
    }
}

#[async_trait]
impl TargetStore for LocalTargetStore {
    async fn stage(
        &self,
        service_id: &str,
        mode: RestoreMode,
        source: ArtifactReader,
        limit: Option<u64>,
    ) -> io::Result<Staged> {
        let dir = self.service_dir(service_id)?;
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = target_file_name(mode);
        let target = dir.join(file_name);
        let staging = dir.join(format!(
            ".{}.{}.{}.staging",
            file_name,
            std::process::id(),
            STAGING_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        let guard = StagingGuard::new(staging.clone());
        let file = tokio::fs::File::create(&staging).await?;
        let mut writer = BufWriter::new(file);

        let written = match limit {
            Some(limit) => tokio::io::copy(&mut source.take(limit), &mut writer).await?,
            None => {
                let mut source = source;
                tokio::io::copy(&mut source, &mut writer).await?
            }
        };

        writer.flush().await?;
        let file = writer.into_inner();
        file.sync_all().await?;
        drop(file);

        debug!("Staged {} bytes for {} ({})", written, target.display(), mode);
        Ok(Staged {
            bytes: written,
            file: Some(StagedFile {
                guard,
                staging,
                target,
            }),
        })
    }

    async fn publish(&self, staged: Staged) -> io::Result<u64> {
        let Some(StagedFile {
            mut guard,
            staging,
            target,
        }) = staged.file
        else {
            return Ok(staged.bytes);
        };

        // Runs to completion even if this future is dropped
        let bytes = staged.bytes;
        tokio::task::spawn_blocking(move || -> io::Result<u64> {
            std::fs::rename(&staging, &target)?;
            guard.disarm();
            debug!("Committed {} bytes to {}", bytes, target.display());
            Ok(bytes)
        })
        .await
        .map_err(io::Error::other)?
    }
}
