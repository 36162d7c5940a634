//! Group Metrics Collection
//!
//! Cheap atomic counters for observing a cache group's behaviour: tier
//! hits, loader activity, remote traffic and hot promotions.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics collector owned by a cache group.
#[derive(Debug, Default)]
pub struct GroupMetrics {
    hot_hits: AtomicU64,
    main_hits: AtomicU64,
    misses: AtomicU64,

    loads: AtomicU64,
    loader_errors: AtomicU64,

    remote_fetches: AtomicU64,
    remote_errors: AtomicU64,
    hot_promotions: AtomicU64,
}

impl GroupMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hot_hit(&self) {
        self.hot_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_main_hit(&self) {
        self.main_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_load(&self) {
        self.loads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_loader_error(&self) {
        self.loader_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_remote_fetch(&self) {
        self.remote_fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_remote_error(&self) {
        self.remote_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_hot_promotion(&self) {
        self.hot_promotions.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            hot_hits: self.hot_hits.load(Ordering::Relaxed),
            main_hits: self.main_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            loader_errors: self.loader_errors.load(Ordering::Relaxed),
            remote_fetches: self.remote_fetches.load(Ordering::Relaxed),
            remote_errors: self.remote_errors.load(Ordering::Relaxed),
            hot_promotions: self.hot_promotions.load(Ordering::Relaxed),
        }
    }
}

/// Immutable snapshot of [`GroupMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub hot_hits: u64,
    pub main_hits: u64,
    pub misses: u64,
    pub loads: u64,
    pub loader_errors: u64,
    pub remote_fetches: u64,
    pub remote_errors: u64,
    pub hot_promotions: u64,
}

impl MetricsSnapshot {
    /// Hit ratio over all lookups, in `[0, 1]`.
    pub fn hit_ratio(&self) -> f64 {
        let hits = self.hot_hits + self.main_hits;
        let total = hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        hits as f64 / total as f64
    }
}
