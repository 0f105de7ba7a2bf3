use std::fs::{self, File, FileTimes};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use crate::cache::{CleanupError, DiskSpaceCleaner, FileLockRegistry};

/// Write `size` bytes and backdate the file by `age_secs`
fn write_aged(path: &Path, size: usize, age_secs: u64) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, vec![0u8; size]).unwrap();
    let when = SystemTime::now() - Duration::from_secs(age_secs);
    let file = File::options().write(true).open(path).unwrap();
    file.set_times(FileTimes::new().set_accessed(when).set_modified(when)).unwrap();
}

#[test]
fn test_under_quota_removes_nothing() {
    let temp = TempDir::new().unwrap();
    write_aged(&temp.path().join("a.bin"), 100, 10);

    let cleaner = DiskSpaceCleaner::new(temp.path(), 1_000, FileLockRegistry::new());
    let report = cleaner.cleanup().unwrap();

    assert_eq!(report.scanned_files, 1);
    assert_eq!(report.total_bytes, 100);
    assert_eq!(report.removed_files, 0);
}

#[test]
fn test_removes_oldest_first_until_within_quota() {
    let temp = TempDir::new().unwrap();
    write_aged(&temp.path().join("old.bin"), 400, 3_000);
    write_aged(&temp.path().join("nested/middle.bin"), 400, 2_000);
    write_aged(&temp.path().join("new.bin"), 400, 1_000);

    let cleaner = DiskSpaceCleaner::new(temp.path(), 900, FileLockRegistry::new());
    let report = cleaner.cleanup().unwrap();

    assert_eq!(report.removed_files, 1);
    assert_eq!(report.freed_bytes, 400);
    assert!(!temp.path().join("old.bin").exists());
    assert!(temp.path().join("nested/middle.bin").exists());
    assert!(temp.path().join("new.bin").exists());
    assert_eq!(cleaner.used_bytes().unwrap(), 800);
}

#[test]
fn test_locked_files_survive() {
    let temp = TempDir::new().unwrap();
    write_aged(&temp.path().join("plugins/held/classes.bin"), 500, 5_000);
    write_aged(&temp.path().join("plugins/idle/classes.bin"), 500, 1_000);

    let locks = FileLockRegistry::new();
    let _lock = locks.lock(temp.path().join("plugins/held"));
    let cleaner = DiskSpaceCleaner::new(temp.path(), 600, locks);
    let report = cleaner.cleanup().unwrap();

    assert_eq!(report.skipped_locked, 1);
    assert_eq!(report.removed_files, 1);
    assert!(temp.path().join("plugins/held/classes.bin").exists());
    assert!(!temp.path().join("plugins/idle/classes.bin").exists());
}

#[test]
fn test_missing_root() {
    let temp = TempDir::new().unwrap();
    let cleaner = DiskSpaceCleaner::new(temp.path().join("absent"), 10, FileLockRegistry::new());
    assert!(matches!(cleaner.cleanup(), Err(CleanupError::MissingRoot { .. })));
}

#[tokio::test]
async fn test_periodic_cleanup_runs_until_cancelled() {
    let temp = TempDir::new().unwrap();
    write_aged(&temp.path().join("a.bin"), 300, 100);
    write_aged(&temp.path().join("b.bin"), 300, 50);

    let cleaner = Arc::new(DiskSpaceCleaner::new(temp.path(), 400, FileLockRegistry::new()));
    let token = CancellationToken::new();
    let handle = Arc::clone(&cleaner).spawn_periodic(Duration::from_millis(20), token.clone());

    let mut cleaned = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        if !temp.path().join("a.bin").exists() {
            cleaned = true;
            break;
        }
    }
    token.cancel();
    handle.await.unwrap();

    assert!(cleaned);
    assert!(temp.path().join("b.bin").exists());
}

#[test]
fn test_lock_spelled_differently_from_root_survives() {
    let temp = TempDir::new().unwrap();
    write_aged(&temp.path().join("store/a.jar"), 500, 5_000);
    write_aged(&temp.path().join("store/b.jar"), 500, 1_000);

    let locks = FileLockRegistry::new();
    let _lock = locks.lock(temp.path().join(".").join("store").join("a.jar"));
    let root = temp.path().join("store").join("..").join("store");
    let cleaner = DiskSpaceCleaner::new(root, 0, locks);
    let report = cleaner.cleanup().unwrap();

    assert_eq!(report.skipped_locked, 1);
    assert_eq!(report.removed_files, 1);
    assert!(temp.path().join("store/a.jar").exists());
    assert!(!temp.path().join("store/b.jar").exists());
}
