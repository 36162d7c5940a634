//! LRU Engine with Per-Entry TTL
//!
//! Byte-budgeted key/value store with recency ordering and lazy expiry.
//!
//! # Design
//!
//! - Recency list + index map for O(1) touch and evict
//! - The list is slab-backed: nodes live in a `Vec` and link to each other
//!   through stable indices, so no unsafe pointer chasing is needed
//! - Expiry is checked on read; eviction prefers expired entries so the
//!   live recency order survives while the budget allows it
//! - Every TTL gets a uniform random jitter so entries written together
//!   do not expire together

use std::collections::HashMap;
use std::time::{Duration, Instant};

use rand::Rng;
use tracing::debug;

use crate::byteview::ByteView;

/// Upper bound of the random addition to every TTL.
pub const TTL_JITTER: Duration = Duration::from_secs(60);

/// Sentinel index terminating the recency list.
const NIL: usize = usize::MAX;

/// Callback invoked exactly once per entry when it leaves the cache.
pub type EvictionHook = Box<dyn FnMut(&str, &ByteView) + Send>;

struct Node {
    key: String,
    value: ByteView,
    expire: Instant,
    prev: usize,
    next: usize,
}

/// LRU cache with per-entry expiry and a byte budget.
///
/// Not thread-safe by itself; see [`super::SyncCache`] for the
/// mutex-guarded shell.
pub struct LruCache {
    /// Byte budget. Zero disables the cap.
    max_bytes: u64,
    /// Σ (key length + value length) over resident entries
    used_bytes: u64,
    /// Slab of nodes; `None` slots are free
    nodes: Vec<Option<Node>>,
    /// Free slot indices available for reuse
    free: Vec<usize>,
    /// Most recently used entry
    head: usize,
    /// Least recently used entry
    tail: usize,
    /// key -> slab index
    index: HashMap<String, usize>,
    on_evicted: Option<EvictionHook>,
    default_ttl: Duration,
    jitter_bound: Duration,
}

impl LruCache {
    /// Create a cache with the given byte budget, optional eviction hook
    /// and baseline entry lifetime. `max_bytes == 0` disables the cap.
    pub fn new(max_bytes: u64, on_evicted: Option<EvictionHook>, default_ttl: Duration) -> Self {
        Self {
            max_bytes,
            used_bytes: 0,
            nodes: Vec::new(),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            index: HashMap::new(),
            on_evicted,
            default_ttl,
            jitter_bound: TTL_JITTER,
        }
    }

    /// Override the jitter bound. Zero disables jitter; tests use this to
    /// get deterministic expiry.
    pub fn with_ttl_jitter(mut self, bound: Duration) -> Self {
        self.jitter_bound = bound;
        self
    }

    /// Baseline TTL configured at construction.
    #[inline]
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Number of resident entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True when no entries are resident.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Bytes charged against the budget.
    #[inline]
    pub fn used_bytes(&self) -> u64 {
        self.used_bytes
    }

    /// Look up a key. A fresh hit is moved to the front of the recency
    /// list; an expired entry is removed on sight and reported as a miss.
    pub fn get(&mut self, key: &str) -> Option<ByteView> {
        let idx = *self.index.get(key)?;
        if self.node(idx).expire <= Instant::now() {
            debug!(key, "cache entry expired");
            self.remove_index(idx);
            return None;
        }
        self.move_to_front(idx);
        Some(self.node(idx).value.clone())
    }

    /// Insert or update an entry with the given TTL (plus jitter).
    ///
    /// Updating an existing key touches it, adjusts the byte accounting by
    /// the value-length delta and keeps whichever expiry is later, so a
    /// re-add never shortens an entry's remaining lifetime. Afterwards the
    /// cache evicts until it is back under budget.
    pub fn add(&mut self, key: &str, value: ByteView, ttl: Duration) {
        let candidate = Instant::now() + ttl + self.jitter();

        if let Some(&idx) = self.index.get(key) {
            self.move_to_front(idx);
            let new_len = value.len() as u64;
            let node = self.node_mut(idx);
            let old_len = node.value.len() as u64;
            node.value = value;
            if node.expire < candidate {
                node.expire = candidate;
            }
            self.used_bytes = self.used_bytes - old_len + new_len;
        } else {
            self.used_bytes += (key.len() + value.len()) as u64;
            let idx = self.alloc(Node {
                key: key.to_string(),
                value,
                expire: candidate,
                prev: NIL,
                next: NIL,
            });
            self.push_front(idx);
            self.index.insert(key.to_string(), idx);
        }

        while self.max_bytes > 0 && self.used_bytes > self.max_bytes {
            if !self.remove_oldest() {
                break;
            }
        }
    }

    /// Evict one entry: the least recently used *expired* entry if any
    /// exists, otherwise the absolute LRU tail. Returns whether an entry
    /// was removed.
    pub fn remove_oldest(&mut self) -> bool {
        let now = Instant::now();

        let mut idx = self.tail;
        while idx != NIL {
            let (expired, prev) = {
                let node = self.node(idx);
                (node.expire <= now, node.prev)
            };
            if expired {
                self.remove_index(idx);
                return true;
            }
            idx = prev;
        }

        if self.tail != NIL {
            self.remove_index(self.tail);
            return true;
        }
        false
    }

    fn jitter(&self) -> Duration {
        let bound = self.jitter_bound.as_secs();
        if bound == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs(rand::thread_rng().gen_range(0..bound))
    }

    fn alloc(&mut self, node: Node) -> usize {
        match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = Some(node);
                idx
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        }
    }

    fn node(&self, idx: usize) -> &Node {
        match &self.nodes[idx] {
            Some(node) => node,
            None => unreachable!("recency list points at a free slot"),
        }
    }

    fn node_mut(&mut self, idx: usize) -> &mut Node {
        match &mut self.nodes[idx] {
            Some(node) => node,
            None => unreachable!("recency list points at a free slot"),
        }
    }

    fn detach(&mut self, idx: usize) {
        let (prev, next) = {
            let node = self.node(idx);
            (node.prev, node.next)
        };
        if prev != NIL {
            self.node_mut(prev).next = next;
        } else {
            self.head = next;
        }
        if next != NIL {
            self.node_mut(next).prev = prev;
        } else {
            self.tail = prev;
        }
        let node = self.node_mut(idx);
        node.prev = NIL;
        node.next = NIL;
    }

    fn push_front(&mut self, idx: usize) {
        let old_head = self.head;
        {
            let node = self.node_mut(idx);
            node.prev = NIL;
            node.next = old_head;
        }
        if old_head != NIL {
            self.node_mut(old_head).prev = idx;
        }
        self.head = idx;
        if self.tail == NIL {
            self.tail = idx;
        }
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.head == idx {
            return;
        }
        self.detach(idx);
        self.push_front(idx);
    }

    fn remove_index(&mut self, idx: usize) {
        self.detach(idx);
        let node = match self.nodes[idx].take() {
            Some(node) => node,
            None => unreachable!("removing a free slot"),
        };
        self.free.push(idx);
        self.index.remove(&node.key);
        self.used_bytes -= (node.key.len() + node.value.len()) as u64;
        if let Some(hook) = self.on_evicted.as_mut() {
            hook(&node.key, &node.value);
        }
    }
}

impl Drop for LruCache {
    fn drop(&mut self) {
        // Teardown destroys every remaining entry; the hook fires once each.
        if let Some(mut hook) = self.on_evicted.take() {
            for node in self.nodes.iter().flatten() {
                hook(&node.key, &node.value);
            }
        }
    }
}

impl std::fmt::Debug for LruCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LruCache")
            .field("len", &self.len())
            .field("used_bytes", &self.used_bytes)
            .field("max_bytes", &self.max_bytes)
            .finish()
    }
}
