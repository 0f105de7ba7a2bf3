//! Disk Quota Cleanup
//!
//! Keeps a storage directory under a byte quota by deleting the least
//! recently used files. Files under a path held in the [`FileLockRegistry`]
//! are never removed.

use log::{debug, info, warn};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::error::{CleanupError, CleanupResult};
use super::file_lock::{normalize, FileLockRegistry};

/// What one cleanup pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub scanned_files: usize,
    pub total_bytes: u64,
    pub removed_files: usize,
    pub freed_bytes: u64,
    pub skipped_locked: usize,
}

struct CachedFile {
    path: PathBuf,
    size: u64,
    last_used: SystemTime,
}

/// Quota enforcement for one storage root
#[derive(Debug, Clone)]
pub struct DiskSpaceCleaner {
    root: PathBuf,
    quota_bytes: u64,
    locks: FileLockRegistry,
}

impl DiskSpaceCleaner {
    pub fn new<P: Into<PathBuf>>(root: P, quota_bytes: u64, locks: FileLockRegistry) -> Self {
        Self {
            root: root.into(),
            quota_bytes,
            locks,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn quota_bytes(&self) -> u64 {
        self.quota_bytes
    }

    /// Total size of the files under the root
    pub fn used_bytes(&self) -> CleanupResult<u64> {
        Ok(self.scan()?.iter().map(|f| f.size).sum())
    }

    /// Remove least recently used unlocked files until usage fits the quota
    pub fn cleanup(&self) -> CleanupResult<CleanupReport> {
        let mut files = self.scan()?;
        let mut report = CleanupReport {
            scanned_files: files.len(),
            total_bytes: files.iter().map(|f| f.size).sum(),
            ..Default::default()
        };

        if report.total_bytes <= self.quota_bytes {
            debug!(
                "Disk cache {} uses {} of {} bytes, nothing to clean",
                self.root.display(),
                report.total_bytes,
                self.quota_bytes
            );
            return Ok(report);
        }

        files.sort_by_key(|f| f.last_used);
        let mut used = report.total_bytes;
        for file in files {
            if used <= self.quota_bytes {
                break;
            }
            match self.locks.remove_if_unlocked(&file.path) {
                Ok(false) => report.skipped_locked += 1,
                Ok(true) => {
                    used = used.saturating_sub(file.size);
                    report.removed_files += 1;
                    report.freed_bytes += file.size;
                    debug!("Removed cached file {}", file.path.display());
                }
                Err(e) => warn!("Cannot remove cached file {}: {}", file.path.display(), e),
            }
        }

        if used > self.quota_bytes {
            warn!(
                "Disk cache {} still uses {} bytes over a {} byte quota ({} locked files)",
                self.root.display(),
                used,
                self.quota_bytes,
                report.skipped_locked
            );
        }
        info!(
            "Disk cleanup freed {} bytes in {} files under {}",
            report.freed_bytes,
            report.removed_files,
            self.root.display()
        );
        Ok(report)
    }

    fn scan(&self) -> CleanupResult<Vec<CachedFile>> {
        if !self.root.is_dir() {
            return Err(CleanupError::MissingRoot { path: self.root.clone() });
        }
        let mut files = Vec::new();
        collect_files(&normalize(&self.root), &mut files)?;
        Ok(files)
    }

    /// Run [`cleanup`](Self::cleanup) every `interval` until `token` is cancelled
    pub fn spawn_periodic(self: Arc<Self>, interval: Duration, token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!("Periodic disk cleanup for {} stopped", self.root.display());
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        let cleaner = Arc::clone(&self);
                        match tokio::task::spawn_blocking(move || cleaner.cleanup()).await {
                            Ok(Ok(_)) => {}
                            Ok(Err(e)) => warn!("Disk cleanup failed: {}", e),
                            Err(e) => warn!("Disk cleanup failed: {}", CleanupError::from(e)),
                        }
                    }
                }
            }
        })
    }
}

fn collect_files(dir: &Path, files: &mut Vec<CachedFile>) -> CleanupResult<()> {
    let entries = fs::read_dir(dir).map_err(|e| CleanupError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| CleanupError::io(dir, e))?;
        let path = entry.path();
        let metadata = entry.metadata().map_err(|e| CleanupError::io(&path, e))?;
        if metadata.is_dir() {
            collect_files(&path, files)?;
        } else if metadata.is_file() {
            // latest of access and modification time
            let last_used = [metadata.accessed().ok(), metadata.modified().ok()]
                .into_iter()
                .flatten()
                .max()
                .unwrap_or(SystemTime::UNIX_EPOCH);
            files.push(CachedFile {
                path,
                size: metadata.len(),
                last_used,
            });
        }
    }
    Ok(())
}
