//! Consistent Hash Ring
//!
//! Maps keys to owning peers through virtual-node hashing. Each real peer
//! contributes `replicas` points on the ring so load spreads smoothly;
//! lookups binary-search the sorted ring and wrap around at the end.

use std::collections::HashMap;

/// Virtual nodes per real peer. Higher is smoother, larger.
pub const DEFAULT_REPLICAS: usize = 50;

/// Hash function mapping raw bytes to a ring position.
pub type HashFn = fn(&[u8]) -> u32;

fn crc32_ieee(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Consistent-hash ring over named peers.
///
/// Mutation is not safe concurrently with lookups; owners serialise
/// `add` behind their own lock (see `transport::ServerPool`).
pub struct HashRing {
    replicas: usize,
    hash: HashFn,
    /// Sorted virtual-node positions
    keys: Vec<u32>,
    /// Virtual-node position -> real peer name
    peers: HashMap<u32, String>,
}

impl HashRing {
    /// Create a ring with `replicas` virtual nodes per peer. A `None`
    /// hash function selects CRC32/IEEE.
    pub fn new(replicas: usize, hash: Option<HashFn>) -> Self {
        Self {
            replicas,
            hash: hash.unwrap_or(crc32_ieee),
            keys: Vec::new(),
            peers: HashMap::new(),
        }
    }

    /// True when no peers have been added.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Number of virtual nodes on the ring.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Add peers to the ring. Each peer lands on `replicas` positions
    /// hashed from `"{i}{peer}"`; the ring is re-sorted once afterwards.
    /// A position collision lets the later insertion win.
    pub fn add<I, S>(&mut self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for peer in peers {
            let peer = peer.into();
            for i in 0..self.replicas {
                let virtual_key = format!("{i}{peer}");
                let hash = (self.hash)(virtual_key.as_bytes());
                if self.peers.insert(hash, peer.clone()).is_none() {
                    self.keys.push(hash);
                }
            }
        }
        self.keys.sort_unstable();
    }

    /// Owner of `key`, or `None` on an empty ring.
    ///
    /// Deterministic for a fixed ring state and hash function: the first
    /// virtual node clockwise of the key's hash wins.
    pub fn get(&self, key: &str) -> Option<&str> {
        if self.keys.is_empty() {
            return None;
        }
        let hash = (self.hash)(key.as_bytes());
        let idx = self.keys.partition_point(|&pos| pos < hash);
        let pos = self.keys[idx % self.keys.len()];
        self.peers.get(&pos).map(String::as_str)
    }
}

impl std::fmt::Debug for HashRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashRing")
            .field("replicas", &self.replicas)
            .field("virtual_nodes", &self.keys.len())
            .finish()
    }
}
