//! HTTP Peer Client
//!
//! Fetches values from a remote owner over the peer protocol. Every call
//! carries a deadline so a dead peer stalls a lookup for at most
//! [`PEER_TIMEOUT`] before the group falls back to its local loader.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Error, Result};
use crate::peers::{PeerGetter, Request, Response};

/// Per-call deadline for peer fetches.
pub const PEER_TIMEOUT: Duration = Duration::from_secs(10);

/// Route the peer protocol is served on.
pub const PEER_ENDPOINT: &str = "/_meshcache";

/// Client for one remote peer, addressed as `host:port`.
pub struct HttpPeer {
    addr: String,
    http: reqwest::Client,
}

impl HttpPeer {
    /// Create a client for the peer at `addr` (`host:port`).
    pub fn new(addr: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(PEER_TIMEOUT).build()?;
        Ok(Self {
            addr: addr.into(),
            http,
        })
    }

    /// Address this client talks to.
    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl PeerGetter for HttpPeer {
    async fn get(&self, request: &Request) -> Result<Response> {
        let url = format!("http://{}{}", self.addr, PEER_ENDPOINT);
        debug!(peer = %self.addr, group = %request.group, key = %request.key, "peer fetch");

        let http_response = self.http.post(&url).json(request).send().await?;
        let status = http_response.status();
        if !status.is_success() {
            let body = http_response.text().await.unwrap_or_default();
            return Err(Error::Peer {
                peer: self.addr.clone(),
                reason: format!("{status}: {body}"),
            });
        }

        let response = http_response.json::<Response>().await?;
        Ok(response)
    }
}

impl std::fmt::Debug for HttpPeer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPeer").field("addr", &self.addr).finish()
    }
}
