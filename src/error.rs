//! Error types for meshcache

use std::sync::Arc;

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in meshcache
#[derive(Error, Debug)]
pub enum Error {
    /// Empty key supplied to a group lookup
    #[error("key is required")]
    EmptyKey,

    /// Peer request referenced a group this process does not host
    #[error("group not found: {name}")]
    GroupNotFound { name: String },

    /// The data-source loader failed
    #[error(transparent)]
    Loader(#[from] LoadError),

    /// Peer answered with a non-success status
    #[error("peer {peer} unavailable: {reason}")]
    Peer { peer: String, reason: String },

    /// HTTP transport error
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Wire decode error
    #[error("failed to decode peer response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Loader failure, shared verbatim with every caller that was collapsed
/// into the same in-flight load.
///
/// The inner error is reference-counted so the deduplication layer can
/// hand the identical failure to an arbitrary number of waiters.
#[derive(Debug, Clone, Error)]
#[error("loading {key:?} failed: {source}")]
pub struct LoadError {
    /// Key whose load failed
    pub key: String,
    /// The loader's error
    #[source]
    pub source: Arc<Error>,
}

impl LoadError {
    /// Wrap a loader error for a given key.
    pub fn new(key: impl Into<String>, source: Error) -> Self {
        Self {
            key: key.into(),
            source: Arc::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(Error::EmptyKey.to_string(), "key is required");

        let err = Error::GroupNotFound {
            name: "scores".into(),
        };
        assert_eq!(err.to_string(), "group not found: scores");
    }

    #[test]
    fn test_load_error_is_cloneable() {
        let inner = Error::GroupNotFound { name: "g".into() };
        let err = LoadError::new("k", inner);
        let clone = err.clone();
        assert_eq!(err.to_string(), clone.to_string());
        assert_eq!(clone.key, "k");
    }

    #[test]
    fn test_load_error_wraps_into_error() {
        let err: Error = LoadError::new("k", Error::EmptyKey).into();
        assert!(matches!(err, Error::Loader(_)));
    }
}
