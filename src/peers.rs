//! Loader and Peer Contracts
//!
//! The seams a cache group talks through: the read-through data source
//! supplied by the embedder, the peer-selection strategy, the remote
//! peer client, and the wire schema peers exchange.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Read-through data source supplied by the embedder.
///
/// Safe to call concurrently for different keys; the deduplication layer
/// guarantees at most one in-flight call per key per process.
#[async_trait]
pub trait Getter: Send + Sync {
    /// Load the bytes for `key` from the backing source.
    async fn get(&self, key: &str) -> Result<Vec<u8>>;
}

/// Adapter letting a plain closure act as a [`Getter`].
pub struct GetterFn<F>(pub F);

#[async_trait]
impl<F> Getter for GetterFn<F>
where
    F: Fn(&str) -> Result<Vec<u8>> + Send + Sync,
{
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        (self.0)(key)
    }
}

/// Peer-protocol request.
///
/// Unknown fields are ignored and missing fields default, so nodes on
/// neighbouring releases keep interoperating during rolling upgrades.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Cache namespace on the owning node
    #[serde(default)]
    pub group: String,
    /// Key being looked up
    #[serde(default)]
    pub key: String,
}

/// Peer-protocol response carrying the value bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub value: Vec<u8>,
}

/// Client half of the peer protocol.
#[async_trait]
pub trait PeerGetter: Send + Sync {
    /// Fetch a value from the remote owner. Any error means "peer
    /// unavailable" to the caller, which then loads locally.
    async fn get(&self, request: &Request) -> Result<Response>;
}

/// Chooses the owner for a key.
pub trait PeerPicker: Send + Sync {
    /// Client for the key's owner, or `None` when this node owns the key
    /// (or no peers are configured).
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerGetter>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_getter_fn_adapter() {
        let getter = GetterFn(|key: &str| Ok(format!("value-of-{key}").into_bytes()));
        let bytes = getter.get("alpha").await.expect("loader should succeed");
        assert_eq!(bytes, b"value-of-alpha");
    }

    #[test]
    fn test_wire_roundtrip() {
        let request = Request {
            group: "scores".into(),
            key: "alice".into(),
        };
        let encoded = serde_json::to_string(&request).expect("encode");
        let decoded: Request = serde_json::from_str(&encoded).expect("decode");
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_wire_forward_compatibility() {
        // A newer node may send fields this build does not know about.
        let decoded: Response =
            serde_json::from_str(r#"{"value":[104,105],"compression":"zstd"}"#).expect("decode");
        assert_eq!(decoded.value, b"hi");

        // Missing fields fall back to defaults.
        let decoded: Request = serde_json::from_str(r#"{"key":"k"}"#).expect("decode");
        assert_eq!(decoded.group, "");
        assert_eq!(decoded.key, "k");
    }
}
