use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use crate::cache::{CacheResult, ProvideResult, ResourceCache, ResourceProvider};

/// Provider producing `key * 10`, counting creations and recording disposals
#[derive(Default)]
struct CountingProvider {
    created: AtomicUsize,
    disposed: Mutex<Vec<u32>>,
    delay: Option<Duration>,
}

impl ResourceProvider<u32, u32> for CountingProvider {
    fn provide(&self, key: &u32) -> ProvideResult<u32> {
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        match *key {
            0 => ProvideResult::NotFound("zero is never available".to_string()),
            13 => ProvideResult::Failed("unlucky".to_string()),
            _ => {
                self.created.fetch_add(1, Ordering::SeqCst);
                ProvideResult::Provided(key * 10)
            }
        }
    }

    fn dispose(&self, key: &u32, _resource: &u32) {
        self.disposed.lock().push(*key);
    }
}

fn found(result: CacheResult<u32, u32>) -> crate::cache::ScopedHandle<u32, u32> {
    match result {
        CacheResult::Found(handle) => handle,
        other => panic!("expected a cached resource, got {:?}", other),
    }
}

#[test]
fn test_concurrent_acquires_create_once() {
    let provider = Arc::new(CountingProvider {
        delay: Some(Duration::from_millis(50)),
        ..Default::default()
    });
    let cache = ResourceCache::new("test", 4, provider.clone() as Arc<dyn ResourceProvider<u32, u32>>);
    let barrier = Arc::new(Barrier::new(8));

    let threads: Vec<_> = (0..8)
        .map(|_| {
            let cache = cache.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let handle = found(cache.acquire(&7));
                let value = *handle;
                (value, handle.resource())
            })
        })
        .collect();

    let results: Vec<_> = threads.into_iter().map(|t| t.join().unwrap()).collect();
    assert_eq!(provider.created.load(Ordering::SeqCst), 1);
    assert!(results.iter().all(|(value, _)| *value == 70));
    let first = &results[0].1;
    assert!(results.iter().all(|(_, resource)| Arc::ptr_eq(resource, first)));

    let stats = cache.stats();
    assert_eq!(stats.creations, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 7);
    assert_eq!(cache.ref_count(&7), Some(0));
}

#[test]
fn test_held_entries_are_not_evicted() {
    let provider = Arc::new(CountingProvider::default());
    let cache = ResourceCache::new("test", 1, provider.clone() as Arc<dyn ResourceProvider<u32, u32>>);

    let first = found(cache.acquire(&1));
    let second = found(cache.acquire(&2));
    // Over capacity but both in use
    assert_eq!(cache.len(), 2);
    assert!(provider.disposed.lock().is_empty());

    assert_eq!(*first, 10);
    first.release();
    // Releasing makes 1 idle, and the cache is over capacity
    assert!(!cache.contains(&1));
    assert!(cache.contains(&2));
    assert_eq!(*provider.disposed.lock(), vec![1]);
    drop(second);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_evicts_least_recently_released() {
    let provider = Arc::new(CountingProvider::default());
    let cache = ResourceCache::new("test", 2, provider.clone() as Arc<dyn ResourceProvider<u32, u32>>);

    let a = found(cache.acquire(&1));
    let b = found(cache.acquire(&2));
    b.release();
    a.release();
    // 2 was released before 1
    let c = found(cache.acquire(&3));

    assert!(cache.contains(&1));
    assert!(!cache.contains(&2));
    assert!(cache.contains(&3));
    assert_eq!(*provider.disposed.lock(), vec![2]);
    assert_eq!(cache.stats().evictions, 1);
    drop(c);
}

#[test]
fn test_failures_are_not_cached() {
    let provider = Arc::new(CountingProvider::default());
    let cache = ResourceCache::new("test", 2, provider as Arc<dyn ResourceProvider<u32, u32>>);

    assert!(matches!(cache.acquire(&13), CacheResult::Failed(_)));
    assert!(matches!(cache.acquire(&13), CacheResult::Failed(_)));
    assert!(matches!(cache.acquire(&0), CacheResult::NotFound(_)));
    assert!(cache.is_empty());

    let stats = cache.stats();
    assert_eq!(stats.misses, 3);
    assert_eq!(stats.failures, 2);
    assert_eq!(stats.creations, 0);
}

#[test]
fn test_reacquire_hits_idle_entry() {
    let provider = Arc::new(CountingProvider::default());
    let cache = ResourceCache::new("test", 2, provider.clone() as Arc<dyn ResourceProvider<u32, u32>>);

    drop(found(cache.acquire(&5)));
    assert_eq!(cache.ref_count(&5), Some(0));

    let handle = found(cache.acquire(&5));
    let shared = handle.share();
    assert_eq!(cache.ref_count(&5), Some(2));
    assert_eq!(provider.created.load(Ordering::SeqCst), 1);

    drop(handle);
    drop(shared);
    assert_eq!(cache.ref_count(&5), Some(0));
    assert_eq!(cache.clear_idle(), 1);
    assert!(cache.is_empty());
}

#[test]
fn test_waiters_retry_after_failed_creation() {
    struct FlakyProvider {
        attempts: AtomicUsize,
    }

    impl ResourceProvider<u32, u32> for FlakyProvider {
        fn provide(&self, key: &u32) -> ProvideResult<u32> {
            thread::sleep(Duration::from_millis(30));
            if self.attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                ProvideResult::Failed("first attempt fails".to_string())
            } else {
                ProvideResult::Provided(*key)
            }
        }
    }

    let cache = ResourceCache::new(
        "flaky",
        2,
        Arc::new(FlakyProvider { attempts: AtomicUsize::new(0) }) as Arc<dyn ResourceProvider<u32, u32>>,
    );

    let first = {
        let cache = cache.clone();
        thread::spawn(move || matches!(cache.acquire(&1), CacheResult::Failed(_)))
    };
    thread::sleep(Duration::from_millis(5));
    let second = {
        let cache = cache.clone();
        thread::spawn(move || matches!(cache.acquire(&1), CacheResult::Found(_)))
    };

    assert!(first.join().unwrap());
    assert!(second.join().unwrap());
}
