//! HTTP Peer Transport
//!
//! The over-the-wire half of the cache mesh: an axum server exposing this
//! process's groups to its peers, a reqwest client for fetching from
//! remote owners, and the [`ServerPool`] that binds the consistent-hash
//! ring to concrete peer clients.
//!
//! # Architecture
//!
//! ```text
//!        Group.get(key)                    peer node
//!             │                                ▲
//!             ▼                                │
//!   ServerPool::pick_peer ──▶ HttpPeer ──▶ POST /_meshcache
//!        (hash ring)          (reqwest)     (axum router)
//! ```

mod client;
mod pool;
mod server;

pub use client::{HttpPeer, PEER_ENDPOINT, PEER_TIMEOUT};
pub use pool::ServerPool;
pub use server::{router, serve};
