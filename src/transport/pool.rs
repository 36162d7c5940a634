//! Server Pool - Ring-Backed Peer Selection
//!
//! Owns the consistent-hash ring and one HTTP client per peer. The pool
//! is the default [`PeerPicker`]: a key whose ring owner is this node
//! resolves to "no remote", everything else resolves to the owner's
//! client.
//!
//! Ring mutation is serialised behind the pool's lock; lookups read a
//! consistent snapshot, so `set_peers` may run while traffic flows.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::peers::{PeerGetter, PeerPicker};
use crate::ring::{HashRing, DEFAULT_REPLICAS};
use crate::transport::client::HttpPeer;

struct PoolState {
    ring: HashRing,
    clients: HashMap<String, Arc<HttpPeer>>,
}

/// Peer set of one cache node.
pub struct ServerPool {
    self_addr: String,
    state: RwLock<PoolState>,
}

impl ServerPool {
    /// Create a pool for the node listening on `self_addr` (`host:port`).
    pub fn new(self_addr: impl Into<String>) -> Self {
        Self {
            self_addr: self_addr.into(),
            state: RwLock::new(PoolState {
                ring: HashRing::new(DEFAULT_REPLICAS, None),
                clients: HashMap::new(),
            }),
        }
    }

    /// This node's own address.
    pub fn self_addr(&self) -> &str {
        &self.self_addr
    }

    /// Replace the peer set. The address list should cover the whole
    /// cluster including this node; a client is built for every remote
    /// address.
    pub fn set_peers<I, S>(&self, peers: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let peers: Vec<String> = peers.into_iter().map(Into::into).collect();

        let mut clients = HashMap::new();
        for peer in &peers {
            if *peer != self.self_addr {
                clients.insert(peer.clone(), Arc::new(HttpPeer::new(peer)?));
            }
        }

        let mut ring = HashRing::new(DEFAULT_REPLICAS, None);
        ring.add(peers.iter().cloned());

        let mut state = self.state.write();
        state.ring = ring;
        state.clients = clients;
        info!(self_addr = %self.self_addr, peers = peers.len(), "peer set updated");
        Ok(())
    }

    /// Ring owner for `key`, if any peers are configured.
    pub fn owner(&self, key: &str) -> Option<String> {
        self.state.read().ring.get(key).map(str::to_owned)
    }
}

impl PeerPicker for ServerPool {
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerGetter>> {
        let state = self.state.read();
        let owner = state.ring.get(key)?;

        if owner == self.self_addr {
            debug!(key, "key owned locally");
            return None;
        }

        match state.clients.get(owner) {
            Some(client) => {
                debug!(key, peer = owner, "picked remote peer");
                Some(Arc::clone(client) as Arc<dyn PeerGetter>)
            }
            None => {
                // An owner without a client means the peer list and ring
                // went out of sync; treat the key as locally owned.
                warn!(key, peer = owner, "ring owner has no client");
                None
            }
        }
    }
}

impl std::fmt::Debug for ServerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerPool")
            .field("self_addr", &self.self_addr)
            .field("peers", &self.state.read().clients.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_pool_picks_nobody() {
        let pool = ServerPool::new("127.0.0.1:9001");
        assert!(pool.owner("k").is_none());
        assert!(pool.pick_peer("k").is_none());
    }

    #[test]
    fn test_single_node_cluster_owns_everything() {
        let pool = ServerPool::new("127.0.0.1:9001");
        pool.set_peers(["127.0.0.1:9001"]).expect("set_peers");

        for i in 0..64 {
            assert!(pool.pick_peer(&format!("key-{i}")).is_none());
        }
    }

    #[test]
    fn test_remote_keys_resolve_to_clients() {
        let pool = ServerPool::new("127.0.0.1:9001");
        pool.set_peers(["127.0.0.1:9001", "127.0.0.1:9002", "127.0.0.1:9003"])
            .expect("set_peers");

        let mut remote = 0;
        let mut local = 0;
        for i in 0..300 {
            let key = format!("key-{i}");
            let owner = pool.owner(&key).expect("ring is non-empty");
            match pool.pick_peer(&key) {
                Some(_) => {
                    assert_ne!(owner, "127.0.0.1:9001");
                    remote += 1;
                }
                None => {
                    assert_eq!(owner, "127.0.0.1:9001");
                    local += 1;
                }
            }
        }
        // With 3 nodes and 300 keys both cases must occur.
        assert!(remote > 0, "no key resolved to a remote owner");
        assert!(local > 0, "no key resolved to the local node");
    }

    #[test]
    fn test_ownership_is_stable_across_pools() {
        // Two nodes of the same cluster must agree on every key's owner.
        let pool_a = ServerPool::new("127.0.0.1:9001");
        let pool_b = ServerPool::new("127.0.0.1:9002");
        let cluster = ["127.0.0.1:9001", "127.0.0.1:9002", "127.0.0.1:9003"];
        pool_a.set_peers(cluster).expect("set_peers");
        pool_b.set_peers(cluster).expect("set_peers");

        for i in 0..100 {
            let key = format!("object/{i}");
            assert_eq!(pool_a.owner(&key), pool_b.owner(&key));
        }
    }

    #[test]
    fn test_set_peers_replaces_previous_set() {
        let pool = ServerPool::new("127.0.0.1:9001");
        pool.set_peers(["127.0.0.1:9001", "127.0.0.1:9002"])
            .expect("set_peers");
        pool.set_peers(["127.0.0.1:9001"]).expect("set_peers");

        for i in 0..32 {
            assert!(pool.pick_peer(&format!("key-{i}")).is_none());
        }
    }
}
