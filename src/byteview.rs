//! Immutable Byte Values
//!
//! [`ByteView`] is the value type every cache tier stores and every lookup
//! returns. It wraps a reference-counted, immutable buffer, so clones are
//! cheap and the cache's internal storage can never be mutated through a
//! value handed to a caller.

use bytes::Bytes;

/// An immutable view of a cached byte sequence.
///
/// Cloning shares the underlying buffer. Use [`ByteView::to_vec`] when an
/// owned, mutable copy is needed; the copy is detached from the cache.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ByteView {
    data: Bytes,
}

impl ByteView {
    /// Create a view that copies the given bytes into an owned buffer.
    pub fn copy_from_slice(data: &[u8]) -> Self {
        Self {
            data: Bytes::copy_from_slice(data),
        }
    }

    /// Length of the viewed bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if the view holds no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow the bytes without copying.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Detached copy of the bytes. Mutating the returned vector never
    /// affects the cache.
    pub fn to_vec(&self) -> Vec<u8> {
        self.data.to_vec()
    }
}

impl From<Vec<u8>> for ByteView {
    fn from(data: Vec<u8>) -> Self {
        Self {
            data: Bytes::from(data),
        }
    }
}

impl From<Bytes> for ByteView {
    fn from(data: Bytes) -> Self {
        Self { data }
    }
}

impl From<&str> for ByteView {
    fn from(data: &str) -> Self {
        Self::copy_from_slice(data.as_bytes())
    }
}

impl AsRef<[u8]> for ByteView {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl std::fmt::Debug for ByteView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteView")
            .field("len", &self.data.len())
            .finish()
    }
}

impl std::fmt::Display for ByteView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.data))
    }
}
