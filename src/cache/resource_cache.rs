//! Bounded Resource Cache
//!
//! Reference-counted cache for resources that are expensive to produce
//! (extracted plugins, indexed host builds). At most one creation runs per
//! key; concurrent requesters of that key wait for it. Entries stay alive
//! while any [`ScopedHandle`] is held and become evictable once released,
//! least-recently-released first, when the cache is over capacity.

use log::{debug, warn};
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::ops::Deref;
use std::sync::Arc;

use super::statistics::{CacheStatistics, CacheStats};

/// Outcome of producing a resource
#[derive(Debug)]
pub enum ProvideResult<R> {
    Provided(R),
    NotFound(String),
    /// The resource exists but is structurally broken
    Invalid(String),
    Failed(String),
}

/// Produces and disposes cached resources
pub trait ResourceProvider<K, R>: Send + Sync {
    fn provide(&self, key: &K) -> ProvideResult<R>;

    /// Called once an evicted resource leaves the cache
    fn dispose(&self, _key: &K, _resource: &R) {}
}

/// Outcome of [`ResourceCache::acquire`]
pub enum CacheResult<K, R>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    Found(ScopedHandle<K, R>),
    NotFound(String),
    Invalid(String),
    Failed(String),
}

impl<K, R> fmt::Debug for CacheResult<K, R>
where
    K: Eq + Hash + Clone + Send + Sync + fmt::Debug + 'static,
    R: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheResult::Found(handle) => write!(f, "Found({:?})", handle.key()),
            CacheResult::NotFound(reason) => write!(f, "NotFound({})", reason),
            CacheResult::Invalid(reason) => write!(f, "Invalid({})", reason),
            CacheResult::Failed(reason) => write!(f, "Failed({})", reason),
        }
    }
}

struct Entry<R> {
    resource: Arc<R>,
    ref_count: usize,
    last_released: u64,
}

struct State<K, R> {
    entries: HashMap<K, Entry<R>>,
    in_flight: HashSet<K>,
    release_clock: u64,
}

struct Inner<K, R> {
    name: String,
    capacity: usize,
    provider: Arc<dyn ResourceProvider<K, R>>,
    state: Mutex<State<K, R>>,
    created: Condvar,
    statistics: CacheStatistics,
}

/// Shared, bounded, reference-counted cache
pub struct ResourceCache<K, R>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    inner: Arc<Inner<K, R>>,
}

impl<K, R> Clone for ResourceCache<K, R>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, R> ResourceCache<K, R>
where
    K: Eq + Hash + Clone + Send + Sync + fmt::Debug + 'static,
    R: Send + Sync + 'static,
{
    /// Create a cache that keeps at most `capacity` entries once they are released
    pub fn new<S: Into<String>>(name: S, capacity: usize, provider: Arc<dyn ResourceProvider<K, R>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                capacity,
                provider,
                state: Mutex::new(State {
                    entries: HashMap::new(),
                    in_flight: HashSet::new(),
                    release_clock: 0,
                }),
                created: Condvar::new(),
                statistics: CacheStatistics::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Get the resource for `key`, creating it if absent.
    ///
    /// Blocks while another caller is creating the same key. Failed creations
    /// are not remembered; the next acquire tries again.
    pub fn acquire(&self, key: &K) -> CacheResult<K, R> {
        let inner = &self.inner;
        {
            let mut state = inner.state.lock();
            loop {
                if let Some(entry) = state.entries.get_mut(key) {
                    entry.ref_count += 1;
                    let resource = Arc::clone(&entry.resource);
                    inner.statistics.record_hit();
                    return CacheResult::Found(self.handle(key.clone(), resource));
                }
                if state.in_flight.contains(key) {
                    inner.created.wait(&mut state);
                    continue;
                }
                break;
            }
            state.in_flight.insert(key.clone());
            inner.statistics.record_miss();
        }

        let mut creation = CreationGuard {
            inner,
            key: Some(key.clone()),
        };
        debug!("Cache '{}': creating {:?}", inner.name, key);

        match inner.provider.provide(key) {
            ProvideResult::Provided(resource) => {
                let resource = Arc::new(resource);
                let evicted = {
                    let mut state = inner.state.lock();
                    state.in_flight.remove(key);
                    state.entries.insert(
                        key.clone(),
                        Entry {
                            resource: Arc::clone(&resource),
                            ref_count: 1,
                            last_released: 0,
                        },
                    );
                    creation.key = None;
                    inner.created.notify_all();
                    inner.statistics.record_creation();
                    inner.evict_over_capacity(&mut state)
                };
                inner.dispose_all(evicted);
                CacheResult::Found(self.handle(key.clone(), resource))
            }
            ProvideResult::NotFound(reason) => CacheResult::NotFound(reason),
            ProvideResult::Invalid(reason) => {
                inner.statistics.record_failure();
                CacheResult::Invalid(reason)
            }
            ProvideResult::Failed(reason) => {
                warn!("Cache '{}': failed to create {:?}: {}", inner.name, key, reason);
                inner.statistics.record_failure();
                CacheResult::Failed(reason)
            }
        }
    }

    fn handle(&self, key: K, resource: Arc<R>) -> ScopedHandle<K, R> {
        ScopedHandle {
            key,
            resource,
            cache: Arc::clone(&self.inner),
            released: false,
        }
    }

    /// Number of entries currently held, in use or idle
    pub fn len(&self) -> usize {
        self.inner.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.state.lock().entries.contains_key(key)
    }

    /// Outstanding handles for `key`, `None` when not cached
    pub fn ref_count(&self, key: &K) -> Option<usize> {
        self.inner.state.lock().entries.get(key).map(|e| e.ref_count)
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.statistics.snapshot()
    }

    /// Drop every idle entry regardless of capacity
    pub fn clear_idle(&self) -> usize {
        let evicted = {
            let mut state = self.inner.state.lock();
            let idle: Vec<K> = state
                .entries
                .iter()
                .filter(|(_, entry)| entry.ref_count == 0)
                .map(|(key, _)| key.clone())
                .collect();
            idle.into_iter()
                .filter_map(|key| state.entries.remove(&key).map(|entry| (key, entry.resource)))
                .collect::<Vec<_>>()
        };
        let count = evicted.len();
        self.inner.statistics.record_evictions(count);
        self.inner.dispose_all(evicted);
        count
    }
}

impl<K, R> Inner<K, R>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    /// Remove idle entries, least recently released first, until within capacity
    fn evict_over_capacity(&self, state: &mut State<K, R>) -> Vec<(K, Arc<R>)> {
        let mut evicted = Vec::new();
        while state.entries.len() > self.capacity {
            let victim = state
                .entries
                .iter()
                .filter(|(_, entry)| entry.ref_count == 0)
                .min_by_key(|(_, entry)| entry.last_released)
                .map(|(key, _)| key.clone());
            let Some(victim) = victim else {
                break;
            };
            if let Some(entry) = state.entries.remove(&victim) {
                evicted.push((victim, entry.resource));
            }
        }
        self.statistics.record_evictions(evicted.len());
        evicted
    }

    fn dispose_all(&self, evicted: Vec<(K, Arc<R>)>) {
        for (key, resource) in evicted {
            self.provider.dispose(&key, &resource);
        }
    }

    fn release(&self, key: &K) {
        let evicted = {
            let mut state = self.state.lock();
            state.release_clock += 1;
            let clock = state.release_clock;
            match state.entries.get_mut(key) {
                Some(entry) => {
                    entry.ref_count = entry.ref_count.saturating_sub(1);
                    if entry.ref_count == 0 {
                        entry.last_released = clock;
                    }
                }
                None => return,
            }
            self.evict_over_capacity(&mut state)
        };
        self.dispose_all(evicted);
    }
}

/// Clears the in-flight marker if creation does not complete normally
struct CreationGuard<'a, K, R>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    inner: &'a Inner<K, R>,
    key: Option<K>,
}

impl<K, R> Drop for CreationGuard<'_, K, R>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            let mut state = self.inner.state.lock();
            state.in_flight.remove(&key);
            self.inner.created.notify_all();
        }
    }
}

/// Lease on a cached resource; released explicitly or on drop
pub struct ScopedHandle<K, R>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    key: K,
    resource: Arc<R>,
    cache: Arc<Inner<K, R>>,
    released: bool,
}

impl<K, R> ScopedHandle<K, R>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Shared pointer to the resource, usable after the handle is released
    pub fn resource(&self) -> Arc<R> {
        Arc::clone(&self.resource)
    }

    /// Take another lease on the same entry
    pub fn share(&self) -> Self {
        {
            let mut state = self.cache.state.lock();
            if let Some(entry) = state.entries.get_mut(&self.key) {
                entry.ref_count += 1;
            }
        }
        Self {
            key: self.key.clone(),
            resource: Arc::clone(&self.resource),
            cache: Arc::clone(&self.cache),
            released: false,
        }
    }

    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if !self.released {
            self.released = true;
            self.cache.release(&self.key);
        }
    }
}

impl<K, R> Deref for ScopedHandle<K, R>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    type Target = R;

    fn deref(&self) -> &R {
        &self.resource
    }
}

impl<K, R> Drop for ScopedHandle<K, R>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.release_once();
    }
}

impl<K, R> fmt::Debug for ScopedHandle<K, R>
where
    K: Eq + Hash + Clone + Send + Sync + fmt::Debug + 'static,
    R: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedHandle")
            .field("cache", &self.cache.name)
            .field("key", &self.key)
            .field("released", &self.released)
            .finish()
    }
}
