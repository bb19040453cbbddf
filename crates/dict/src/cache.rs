//! Process-wide dictionary cache with LRU eviction and TTL expiration.
//!
//! Entries are evicted least-recently-used first once either the entry count
//! or the aggregate size bound is exceeded. Every entry weighs 1, so the size
//! bound is an item-count bound too. Expired entries are dropped on access.

use std::{
    num::NonZeroUsize,
    sync::{Arc, OnceLock},
    time::{Duration, Instant},
};

use lru::LruCache;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::config::DictSettings;

pub const DEFAULT_MAX_ENTRIES: usize = 500;
pub const DEFAULT_MAX_SIZE: usize = 5000;
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

static GLOBAL_CACHE: OnceLock<Arc<DictCache>> = OnceLock::new();

/// Coordination record shared by every loader of one remote dictionary key.
#[derive(Debug, Default)]
pub struct RemoteRecord {
    pub(crate) loaded: bool,
    pub(crate) loading: bool,
    pub(crate) data: Option<Value>,
    pub(crate) callback: Vec<oneshot::Sender<Option<Value>>>,
}

impl RemoteRecord {
    pub(crate) fn started() -> Self {
        Self {
            loaded: false,
            loading: true,
            data: None,
            callback: Vec::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }
}

#[derive(Debug, Clone)]
pub enum CachedDict {
    /// Raw node list returned by a value lookup.
    Nodes(Value),
    /// Loading/loaded record of a remote dictionary fetch.
    Remote(Arc<Mutex<RemoteRecord>>),
}

struct CacheEntry {
    value: CachedDict,
    inserted_at: Instant,
    size: usize,
}

struct CacheState {
    entries: LruCache<String, CacheEntry>,
    total_size: usize,
}

pub struct DictCache {
    inner: Mutex<CacheState>,
    max_size: usize,
    ttl: Duration,
}

impl DictCache {
    pub fn new(max_entries: usize, max_size: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                total_size: 0,
            }),
            max_size: max_size.max(1),
            ttl,
        }
    }

    pub fn from_settings(settings: &DictSettings) -> Self {
        Self::new(
            settings.cache_max_entries,
            settings.cache_max_size,
            settings.ttl(),
        )
    }

    /// The cache shared by every dictionary service that was not given its own.
    pub fn global() -> Arc<DictCache> {
        Arc::clone(GLOBAL_CACHE.get_or_init(|| Arc::new(DictCache::default())))
    }

    pub fn get(&self, key: &str) -> Option<CachedDict> {
        let mut state = self.inner.lock();
        self.get_locked(&mut state, key)
    }

    pub fn set(&self, key: impl Into<String>, value: CachedDict) {
        let mut state = self.inner.lock();
        self.insert_locked(&mut state, key.into(), value);
    }

    /// Returns the live entry for `key`, or stores and returns `init()`.
    /// The boolean is true when the value was created by this call.
    pub fn get_or_insert_with(
        &self,
        key: &str,
        init: impl FnOnce() -> CachedDict,
    ) -> (CachedDict, bool) {
        let mut state = self.inner.lock();
        if let Some(existing) = self.get_locked(&mut state, key) {
            return (existing, false);
        }
        let value = init();
        self.insert_locked(&mut state, key.to_string(), value.clone());
        (value, true)
    }

    pub fn remove(&self, key: &str) -> Option<CachedDict> {
        let mut state = self.inner.lock();
        let entry = state.entries.pop(key)?;
        state.total_size -= entry.size;
        Some(entry.value)
    }

    pub fn clear(&self) {
        let mut state = self.inner.lock();
        state.entries.clear();
        state.total_size = 0;
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn get_locked(&self, state: &mut CacheState, key: &str) -> Option<CachedDict> {
        match state.entries.get(key) {
            None => return None,
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                return Some(entry.value.clone())
            }
            Some(_) => {}
        }
        if let Some(expired) = state.entries.pop(key) {
            state.total_size -= expired.size;
        }
        None
    }

    fn insert_locked(&self, state: &mut CacheState, key: String, value: CachedDict) {
        let entry = CacheEntry {
            size: entry_size(&value),
            value,
            inserted_at: Instant::now(),
        };
        state.total_size += entry.size;
        // `push` hands back either the replaced entry for this key or the evicted LRU entry.
        if let Some((_, displaced)) = state.entries.push(key, entry) {
            state.total_size -= displaced.size;
        }
        while state.total_size > self.max_size {
            let Some((_, evicted)) = state.entries.pop_lru() else {
                break;
            };
            state.total_size -= evicted.size;
        }
    }
}

fn entry_size(_value: &CachedDict) -> usize {
    1
}

impl Default for DictCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES, DEFAULT_MAX_SIZE, DEFAULT_TTL)
    }
}

impl std::fmt::Debug for DictCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DictCache")
            .field("len", &self.len())
            .field("max_size", &self.max_size)
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/cache_tests.rs"]
mod tests;
