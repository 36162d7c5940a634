//! Two-Tier In-Process Cache Storage
//!
//! The storage layer beneath a cache group: a byte-budgeted LRU engine
//! with per-entry TTL, and the mutex shell that makes it safe to share.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                    Cache Group                       │
//! ├──────────────────────────────────────────────────────┤
//! │  main cache (SyncCache)   │   hot cache (SyncCache)  │
//! │  budget B                 │   budget B / HOT_RATIO   │
//! │  ┌────────────────────┐   │   ┌────────────────────┐ │
//! │  │ LruCache           │   │   │ LruCache           │ │
//! │  │ recency list + TTL │   │   │ recency list + TTL │ │
//! │  └────────────────────┘   │   └────────────────────┘ │
//! └──────────────────────────────────────────────────────┘
//! ```

mod concurrent;
mod lru;

pub use concurrent::SyncCache;
pub use lru::{EvictionHook, LruCache, TTL_JITTER};

/// Hot cache budget = main cache budget / `HOT_RATIO`.
pub const HOT_RATIO: u64 = 8;

/// Baseline entry lifetime used when the embedder does not override it.
pub const DEFAULT_TTL: std::time::Duration = std::time::Duration::from_secs(60);
