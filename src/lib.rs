//! meshcache - Distributed Read-Through In-Memory Cache
//!
//! A cache library embedded into a fleet of application processes that
//! collectively front an expensive data source. Keys are partitioned
//! across the fleet with consistent hashing, so every key has one owning
//! node; any node answers any lookup by forwarding to the owner.
//! Concurrent misses for the same key collapse into a single source
//! fetch, and remote keys that stay busy get replicated into a local hot
//! cache to cut cross-node traffic.
//!
//! # Architecture
//!
//! ```text
//! Group.get(key)
//!    │
//!    ├─ hot cache hit ──────────────────────────▶ return
//!    ├─ main cache hit ─────────────────────────▶ return
//!    └─ miss ─▶ single-flight (one load per key)
//!                  │
//!                  ├─ ring owner is remote ─▶ HTTP fetch ─▶ QPS stats,
//!                  │        │ on error                      maybe promote
//!                  │        ▼                               to hot cache
//!                  └─ local loader ─▶ populate main cache ─▶ return
//! ```
//!
//! # Modules
//!
//! - [`byteview`] - immutable value type handed to callers
//! - [`cache`] - LRU engine with per-entry TTL + the mutex shell
//! - [`ring`] - consistent-hash ring for peer selection
//! - [`singleflight`] - duplicate-load suppression
//! - [`group`] - cache namespaces, registry, hot promotion
//! - [`peers`] - loader / peer contracts and the wire schema
//! - [`transport`] - HTTP peer server, client and server pool
//! - [`metrics`] - per-group counters
//! - [`error`] - error types
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use meshcache::{Group, GetterFn};
//!
//! # async fn example() -> meshcache::Result<()> {
//! let group = Group::new(
//!     "scores",
//!     64 * 1024 * 1024,
//!     Arc::new(GetterFn(|key: &str| {
//!         // hit the real data source here
//!         Ok(format!("value-of-{key}").into_bytes())
//!     })),
//! );
//!
//! let value = group.get("alice").await?;
//! println!("{}", value);
//! # Ok(())
//! # }
//! ```

pub mod byteview;
pub mod cache;
pub mod error;
pub mod group;
pub mod metrics;
pub mod peers;
pub mod ring;
pub mod singleflight;
pub mod transport;

// Re-export commonly used types
pub use byteview::ByteView;
pub use cache::{LruCache, SyncCache, DEFAULT_TTL, HOT_RATIO};
pub use error::{Error, LoadError, Result};
pub use group::{get_group, Group, GroupConfig, HOT_QPS_THRESHOLD};
pub use metrics::{GroupMetrics, MetricsSnapshot};
pub use peers::{Getter, GetterFn, PeerGetter, PeerPicker, Request, Response};
pub use ring::{HashRing, DEFAULT_REPLICAS};
pub use singleflight::SingleFlight;
pub use transport::{HttpPeer, ServerPool};
