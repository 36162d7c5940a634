//! Concurrent Cache Shell
//!
//! Thin mutex-guarded wrapper giving the LRU engine thread-safe
//! `add`/`get`. The engine is built lazily on the first write so an idle
//! group costs nothing; the lock is held across each whole LRU operation
//! to keep the recency invariants intact under contention.

use std::time::Duration;

use parking_lot::Mutex;

use crate::byteview::ByteView;
use crate::cache::lru::LruCache;

/// Mutex-guarded, lazily initialised LRU cache.
pub struct SyncCache {
    inner: Mutex<Option<LruCache>>,
    cache_bytes: u64,
    default_ttl: Duration,
}

impl SyncCache {
    /// Create an empty shell. No memory is reserved until the first `add`.
    pub fn new(cache_bytes: u64, default_ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(None),
            cache_bytes,
            default_ttl,
        }
    }

    /// Insert `value` under `key` with the shell's default TTL.
    pub fn add(&self, key: &str, value: ByteView) {
        let mut guard = self.inner.lock();
        let lru = guard
            .get_or_insert_with(|| LruCache::new(self.cache_bytes, None, self.default_ttl));
        let ttl = lru.default_ttl();
        lru.add(key, value, ttl);
    }

    /// Look up `key`, touching it on a fresh hit.
    pub fn get(&self, key: &str) -> Option<ByteView> {
        let mut guard = self.inner.lock();
        guard.as_mut()?.get(key)
    }

    /// Number of resident entries.
    pub fn len(&self) -> usize {
        self.inner.lock().as_ref().map_or(0, LruCache::len)
    }

    /// True when the shell holds no entries (including before first use).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes charged against the budget.
    pub fn used_bytes(&self) -> u64 {
        self.inner.lock().as_ref().map_or(0, LruCache::used_bytes)
    }
}

impl std::fmt::Debug for SyncCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncCache")
            .field("cache_bytes", &self.cache_bytes)
            .field("len", &self.len())
            .finish()
    }
}
