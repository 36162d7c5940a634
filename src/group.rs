//! Cache Group - Namespace Orchestration
//!
//! A [`Group`] ties the pieces together for one cache namespace: lookups
//! walk hot cache, then main cache, then funnel misses through the
//! single-flight layer, which either fetches from the key's owning peer
//! or falls back to the local data source. Remote traffic per key is
//! tracked so frequently fetched remote values get promoted into the hot
//! cache and stop crossing the network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::byteview::ByteView;
use crate::cache::{SyncCache, DEFAULT_TTL, HOT_RATIO};
use crate::error::{Error, LoadError, Result};
use crate::metrics::{GroupMetrics, MetricsSnapshot};
use crate::peers::{Getter, PeerGetter, PeerPicker, Request};
use crate::singleflight::SingleFlight;

/// Remote fetches per minute that make a key "hot".
pub const HOT_QPS_THRESHOLD: i64 = 10;

/// Tuning knobs for a group.
#[derive(Debug, Clone)]
pub struct GroupConfig {
    /// Main cache byte budget
    pub cache_bytes: u64,
    /// Hot cache budget = `cache_bytes / hot_ratio`
    pub hot_ratio: u64,
    /// Promotion threshold in remote fetches per minute
    pub hot_qps_threshold: i64,
    /// Baseline entry TTL for both tiers
    pub default_ttl: Duration,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            cache_bytes: 64 * 1024 * 1024,
            hot_ratio: HOT_RATIO,
            hot_qps_threshold: HOT_QPS_THRESHOLD,
            default_ttl: DEFAULT_TTL,
        }
    }
}

/// Remote-traffic record for one key, kept until the key is promoted.
struct KeyStats {
    first_seen: Instant,
    remote_hits: AtomicI64,
}

impl KeyStats {
    fn new() -> Self {
        Self {
            first_seen: Instant::now(),
            remote_hits: AtomicI64::new(0),
        }
    }
}

/// A named cache namespace.
pub struct Group {
    name: String,
    getter: Arc<dyn Getter>,
    main_cache: SyncCache,
    hot_cache: SyncCache,
    peers: OnceLock<Arc<dyn PeerPicker>>,
    flight: SingleFlight<std::result::Result<ByteView, LoadError>>,
    key_stats: DashMap<String, KeyStats>,
    hot_qps_threshold: i64,
    metrics: GroupMetrics,
}

fn registry() -> &'static RwLock<HashMap<String, Arc<Group>>> {
    static REGISTRY: OnceLock<RwLock<HashMap<String, Arc<Group>>>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Look up a previously registered group by name.
pub fn get_group(name: &str) -> Option<Arc<Group>> {
    registry().read().get(name).cloned()
}

/// Test-only registry reset. Never compiled into production builds; tests
/// in this crate prefer unique group names because they share the process.
#[cfg(test)]
#[allow(dead_code)]
pub(crate) fn reset_registry() {
    registry().write().clear();
}

impl Group {
    /// Create and globally register a group with default tuning.
    ///
    /// # Panics
    ///
    /// Panics if a group named `name` already exists; registering the
    /// same namespace twice is a programming error.
    pub fn new(name: impl Into<String>, cache_bytes: u64, getter: Arc<dyn Getter>) -> Arc<Self> {
        Self::with_config(
            name,
            getter,
            GroupConfig {
                cache_bytes,
                ..GroupConfig::default()
            },
        )
    }

    /// Create and globally register a group with explicit tuning.
    ///
    /// # Panics
    ///
    /// Panics on duplicate registration, like [`Group::new`].
    pub fn with_config(
        name: impl Into<String>,
        getter: Arc<dyn Getter>,
        config: GroupConfig,
    ) -> Arc<Self> {
        let name = name.into();
        let hot_ratio = config.hot_ratio.max(1);
        let group = Arc::new(Self {
            main_cache: SyncCache::new(config.cache_bytes, config.default_ttl),
            hot_cache: SyncCache::new(config.cache_bytes / hot_ratio, config.default_ttl),
            getter,
            peers: OnceLock::new(),
            flight: SingleFlight::new(),
            key_stats: DashMap::new(),
            hot_qps_threshold: config.hot_qps_threshold,
            metrics: GroupMetrics::new(),
            name: name.clone(),
        });

        let mut groups = registry().write();
        if groups.contains_key(&name) {
            panic!("cache group {name:?} registered twice");
        }
        groups.insert(name.clone(), Arc::clone(&group));
        info!(group = %name, "cache group registered");
        group
    }

    /// Attach the peer-selection strategy.
    ///
    /// # Panics
    ///
    /// Panics when called a second time; rebinding peers at runtime is a
    /// programming error.
    pub fn register_peers(&self, picker: Arc<dyn PeerPicker>) {
        if self.peers.set(picker).is_err() {
            panic!("register_peers called more than once for group {:?}", self.name);
        }
    }

    /// Group name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Point-in-time counters for this group.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Look up `key`: hot cache, then main cache, then a deduplicated
    /// load from the owning peer or the local data source.
    pub async fn get(&self, key: &str) -> Result<ByteView> {
        if key.is_empty() {
            return Err(Error::EmptyKey);
        }

        if let Some(value) = self.hot_cache.get(key) {
            self.metrics.record_hot_hit();
            debug!(group = %self.name, key, "hot cache hit");
            return Ok(value);
        }

        if let Some(value) = self.main_cache.get(key) {
            self.metrics.record_main_hit();
            debug!(group = %self.name, key, "main cache hit");
            return Ok(value);
        }

        self.metrics.record_miss();
        self.load(key).await
    }

    /// Miss path. Concurrent callers for the same key collapse into one
    /// execution of [`Self::load_once`] and share its outcome, errors
    /// included.
    async fn load(&self, key: &str) -> Result<ByteView> {
        let result = self.flight.run(key, || self.load_once(key)).await;
        Ok(result?)
    }

    async fn load_once(&self, key: &str) -> std::result::Result<ByteView, LoadError> {
        if let Some(picker) = self.peers.get() {
            if let Some(peer) = picker.pick_peer(key) {
                match self.fetch_from_peer(peer.as_ref(), key).await {
                    Ok(value) => return Ok(value),
                    Err(err) => {
                        // Peer trouble is recoverable: log it and serve
                        // from the local source instead.
                        self.metrics.record_remote_error();
                        warn!(
                            group = %self.name, key, error = %err,
                            "peer fetch failed, falling back to local load"
                        );
                    }
                }
            }
        }
        self.load_locally(key).await
    }

    async fn fetch_from_peer(&self, peer: &dyn PeerGetter, key: &str) -> Result<ByteView> {
        let request = Request {
            group: self.name.clone(),
            key: key.to_string(),
        };
        let response = peer.get(&request).await?;
        self.metrics.record_remote_fetch();

        let value = ByteView::from(response.value);
        self.track_remote(key, &value);
        Ok(value)
    }

    /// Count a remote fetch for `key` and promote it into the hot cache
    /// once its windowed rate reaches the threshold. The window is the
    /// whole-minute age of the stats entry, so the rate is a coarse
    /// moving average rather than a sliding window.
    fn track_remote(&self, key: &str, value: &ByteView) {
        let promote = {
            let stats = self
                .key_stats
                .entry(key.to_string())
                .or_insert_with(KeyStats::new);
            let count = stats.remote_hits.fetch_add(1, Ordering::Relaxed) + 1;
            let minutes = (stats.first_seen.elapsed().as_secs_f64() / 60.0)
                .round()
                .max(1.0);
            count as f64 / minutes >= self.hot_qps_threshold as f64
        };

        if promote {
            self.hot_cache.add(key, value.clone());
            self.key_stats.remove(key);
            self.metrics.record_hot_promotion();
            info!(group = %self.name, key, "promoted to hot cache");
        }
    }

    async fn load_locally(&self, key: &str) -> std::result::Result<ByteView, LoadError> {
        let bytes = match self.getter.get(key).await {
            Ok(bytes) => bytes,
            Err(err) => {
                self.metrics.record_loader_error();
                return Err(LoadError::new(key, err));
            }
        };
        self.metrics.record_load();

        let value = ByteView::from(bytes);
        self.main_cache.add(key, value.clone());
        Ok(value)
    }
}

impl std::fmt::Debug for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group")
            .field("name", &self.name)
            .field("main_cache", &self.main_cache)
            .field("hot_cache", &self.hot_cache)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;

    use super::*;
    use crate::peers::Response;

    struct MapGetter {
        data: HashMap<&'static str, &'static str>,
        calls: AtomicUsize,
    }

    impl MapGetter {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                data: [("alice", "630"), ("bob", "589"), ("carol", "567")].into(),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Getter for MapGetter {
        async fn get(&self, key: &str) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.data
                .get(key)
                .map(|v| v.as_bytes().to_vec())
                .ok_or_else(|| {
                    Error::Io(std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        format!("{key} not in source"),
                    ))
                })
        }
    }

    struct StaticPeer {
        value: &'static [u8],
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PeerGetter for StaticPeer {
        async fn get(&self, _request: &Request) -> Result<Response> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Response {
                value: self.value.to_vec(),
            })
        }
    }

    struct FailingPeer;

    #[async_trait]
    impl PeerGetter for FailingPeer {
        async fn get(&self, request: &Request) -> Result<Response> {
            Err(Error::Peer {
                peer: "10.0.0.9:9001".into(),
                reason: format!("connection refused for {}", request.key),
            })
        }
    }

    /// Routes every key to the wrapped peer.
    struct AlwaysRemote(Arc<dyn PeerGetter>);

    impl PeerPicker for AlwaysRemote {
        fn pick_peer(&self, _key: &str) -> Option<Arc<dyn PeerGetter>> {
            Some(Arc::clone(&self.0))
        }
    }

    #[tokio::test]
    async fn test_empty_key_is_rejected() {
        let group = Group::new("t-empty-key", 1024, MapGetter::new());
        let err = group.get("").await.expect_err("empty key must fail");
        assert!(matches!(err, Error::EmptyKey));
    }

    #[tokio::test]
    async fn test_local_load_populates_main_cache() {
        let getter = MapGetter::new();
        let group = Group::new("t-local-load", 1024, Arc::clone(&getter) as Arc<dyn Getter>);

        let value = group.get("alice").await.expect("load should succeed");
        assert_eq!(value.as_slice(), b"630");
        assert_eq!(getter.calls(), 1);

        // Second read is served from the main cache without the loader.
        let value = group.get("alice").await.expect("cached read");
        assert_eq!(value.as_slice(), b"630");
        assert_eq!(getter.calls(), 1);
        assert_eq!(group.metrics().main_hits, 1);
    }

    #[tokio::test]
    async fn test_loader_error_surfaces_and_is_not_cached() {
        let getter = MapGetter::new();
        let group = Group::new("t-loader-err", 1024, Arc::clone(&getter) as Arc<dyn Getter>);

        let err = group.get("unknown").await.expect_err("loader should fail");
        assert!(matches!(err, Error::Loader(_)));

        // Negative results are not cached; the loader runs again.
        let _ = group.get("unknown").await.expect_err("still failing");
        assert_eq!(getter.calls(), 2);
    }

    #[tokio::test]
    async fn test_hot_promotion_after_qps_threshold() {
        let getter = MapGetter::new();
        let peer = Arc::new(StaticPeer {
            value: b"remote-value",
            calls: AtomicUsize::new(0),
        });
        let group = Group::with_config(
            "t-hot-promo",
            Arc::clone(&getter) as Arc<dyn Getter>,
            GroupConfig {
                cache_bytes: 1024,
                hot_qps_threshold: 2,
                ..GroupConfig::default()
            },
        );
        group.register_peers(Arc::new(AlwaysRemote(
            Arc::clone(&peer) as Arc<dyn PeerGetter>
        )));

        // First fetch: stats start at one, below the threshold.
        let v1 = group.get("x").await.expect("remote fetch");
        assert_eq!(v1.as_slice(), b"remote-value");
        assert_eq!(peer.calls.load(Ordering::SeqCst), 1);

        // Second fetch crosses the threshold and promotes.
        let v2 = group.get("x").await.expect("remote fetch");
        assert_eq!(v2.as_slice(), b"remote-value");
        assert_eq!(peer.calls.load(Ordering::SeqCst), 2);
        assert_eq!(group.metrics().hot_promotions, 1);
        assert!(!group.key_stats.contains_key("x"), "stats entry discarded");

        // Third read hits the hot cache; no further RPC, no loader.
        let v3 = group.get("x").await.expect("hot hit");
        assert_eq!(v3.as_slice(), b"remote-value");
        assert_eq!(peer.calls.load(Ordering::SeqCst), 2);
        assert_eq!(group.metrics().hot_hits, 1);
        assert_eq!(getter.calls(), 0);
    }

    #[tokio::test]
    async fn test_remote_values_do_not_enter_main_cache() {
        let getter = MapGetter::new();
        let peer = Arc::new(StaticPeer {
            value: b"remote",
            calls: AtomicUsize::new(0),
        });
        let group = Group::new("t-no-main-pollution", 1024, Arc::clone(&getter) as Arc<dyn Getter>);
        group.register_peers(Arc::new(AlwaysRemote(peer as Arc<dyn PeerGetter>)));

        let _ = group.get("alice").await.expect("remote fetch");
        assert_eq!(group.main_cache.len(), 0);
        assert_eq!(getter.calls(), 0);
    }

    #[tokio::test]
    async fn test_peer_failure_falls_back_to_loader() {
        let getter = MapGetter::new();
        let group = Group::new("t-peer-fallback", 1024, Arc::clone(&getter) as Arc<dyn Getter>);
        group.register_peers(Arc::new(AlwaysRemote(Arc::new(FailingPeer))));

        let value = group.get("bob").await.expect("fallback should succeed");
        assert_eq!(value.as_slice(), b"589");
        assert_eq!(getter.calls(), 1);
        assert_eq!(group.metrics().remote_errors, 1);

        // The fallback value went into the main cache.
        let value = group.get("bob").await.expect("cached read");
        assert_eq!(value.as_slice(), b"589");
        assert_eq!(getter.calls(), 1);
    }

    #[tokio::test]
    async fn test_get_group_lookup() {
        let group = Group::new("t-registry-lookup", 1024, MapGetter::new());
        let found = get_group("t-registry-lookup").expect("group should be registered");
        assert_eq!(found.name(), group.name());
        assert!(get_group("never-registered").is_none());
    }

    #[tokio::test]
    #[should_panic(expected = "registered twice")]
    async fn test_duplicate_registration_panics() {
        let _ = Group::new("t-dup", 1024, MapGetter::new());
        let _ = Group::new("t-dup", 1024, MapGetter::new());
    }

    #[tokio::test]
    #[should_panic(expected = "register_peers called more than once")]
    async fn test_duplicate_peer_registration_panics() {
        let group = Group::new("t-dup-peers", 1024, MapGetter::new());
        group.register_peers(Arc::new(AlwaysRemote(Arc::new(FailingPeer))));
        group.register_peers(Arc::new(AlwaysRemote(Arc::new(FailingPeer))));
    }
}
