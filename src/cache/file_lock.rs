//! File Locks
//!
//! In-process registry of paths that are in use. A locked directory protects
//! everything beneath it from disk cleanup. Locks are counted, so the same
//! path may be locked by several holders at once.
//!
//! Paths are canonicalized before they are stored or compared, so `./store`,
//! `store` and its absolute form all name the same lock.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Shared registry of locked paths
#[derive(Debug, Clone, Default)]
pub struct FileLockRegistry {
    locked: Arc<Mutex<HashMap<PathBuf, usize>>>,
}

impl FileLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock `path` until the returned guard is dropped
    pub fn lock<P: AsRef<Path>>(&self, path: P) -> FileLock {
        let path = normalize(path.as_ref());
        *self.locked.lock().entry(path.clone()).or_insert(0) += 1;
        FileLock {
            path,
            registry: self.clone(),
        }
    }

    /// Whether `path` or one of its ancestors is locked
    pub fn is_locked<P: AsRef<Path>>(&self, path: P) -> bool {
        let path = normalize(path.as_ref());
        let locked = self.locked.lock();
        is_covered(&locked, &path)
    }

    /// Delete the file at `path` unless it is locked. The registry stays
    /// locked for the whole call, so no lock can be taken in between.
    pub fn remove_if_unlocked<P: AsRef<Path>>(&self, path: P) -> io::Result<bool> {
        let path = normalize(path.as_ref());
        let locked = self.locked.lock();
        if is_covered(&locked, &path) {
            return Ok(false);
        }
        fs::remove_file(&path)?;
        Ok(true)
    }

    pub fn locked_count(&self) -> usize {
        self.locked.lock().len()
    }

    fn unlock(&self, path: &Path) {
        let mut locked = self.locked.lock();
        if let Some(count) = locked.get_mut(path) {
            *count -= 1;
            if *count == 0 {
                locked.remove(path);
            }
        }
    }
}

fn is_covered(locked: &HashMap<PathBuf, usize>, path: &Path) -> bool {
    path.ancestors().any(|p| locked.contains_key(p))
}

/// Canonical form of `path`; paths that do not exist yet are made absolute
pub(crate) fn normalize(path: &Path) -> PathBuf {
    if let Ok(canonical) = fs::canonicalize(path) {
        return canonical;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => normalize(parent).join(name),
        _ if path.is_absolute() => path.to_path_buf(),
        _ => std::env::current_dir().map(|dir| dir.join(path)).unwrap_or_else(|_| path.to_path_buf()),
    }
}

/// Guard holding a path lock
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
    registry: FileLockRegistry,
}

impl FileLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        self.registry.unlock(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_covers_descendants() {
        let registry = FileLockRegistry::new();
        let lock = registry.lock("/cache/plugins/foo");

        assert!(registry.is_locked("/cache/plugins/foo"));
        assert!(registry.is_locked("/cache/plugins/foo/lib/a.class"));
        assert!(!registry.is_locked("/cache/plugins/bar"));

        drop(lock);
        assert!(!registry.is_locked("/cache/plugins/foo"));
    }

    #[test]
    fn test_locks_are_counted() {
        let registry = FileLockRegistry::new();
        let first = registry.lock("/cache/a");
        let second = registry.lock("/cache/a");
        assert_eq!(registry.locked_count(), 1);

        drop(first);
        assert!(registry.is_locked("/cache/a"));
        drop(second);
        assert!(!registry.is_locked("/cache/a"));
        assert_eq!(registry.locked_count(), 0);
    }

    #[test]
    fn test_equivalent_spellings_share_a_lock() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = dir.path().join("store");
        std::fs::create_dir_all(store.join("sub")).unwrap();
        std::fs::write(store.join("a.jar"), b"jar").unwrap();

        let registry = FileLockRegistry::new();
        let _lock = registry.lock(dir.path().join(".").join("store").join("a.jar"));
        assert!(registry.is_locked(store.join("a.jar")));
        assert!(registry.is_locked(store.join("sub").join("..").join("a.jar")));
        assert!(!registry.is_locked(store.join("b.jar")));
    }

    #[test]
    fn test_remove_if_unlocked() {
        let dir = tempfile::TempDir::new().unwrap();
        let locked_file = dir.path().join("locked.jar");
        let free_file = dir.path().join("free.jar");
        std::fs::write(&locked_file, b"1").unwrap();
        std::fs::write(&free_file, b"2").unwrap();

        let registry = FileLockRegistry::new();
        let _lock = registry.lock(&locked_file);
        assert!(!registry.remove_if_unlocked(&locked_file).unwrap());
        assert!(registry.remove_if_unlocked(&free_file).unwrap());
        assert!(locked_file.exists());
        assert!(!free_file.exists());
    }
}
