//! Error types.

use core::fmt;
use thiserror::Error;

/// Rejected map configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A map must be able to hold at least one entry.
    #[error("invalid capacity {capacity}: must be greater than 0")]
    InvalidCapacity { capacity: usize },
}

/// Returned by [`BoundedBlockingMap::try_insert`](crate::BoundedBlockingMap::try_insert)
/// when the entry was not stored. Ownership of the key and value goes back to
/// the caller so the insert can be retried.
///
/// `Full` is a normal backpressure signal rather than a fault: pair it with
/// [`wait_for_space`](crate::BoundedBlockingMap::wait_for_space) and retry.
#[derive(Clone, PartialEq, Eq, Error)]
pub enum TryInsertError<K, V> {
    /// The map holds `capacity` entries.
    #[error("map is at capacity")]
    Full(K, V),
    /// The map has been closed.
    #[error("map is closed")]
    Closed(K, V),
}

impl<K, V> TryInsertError<K, V> {
    /// Recover the rejected key and value.
    pub fn into_inner(self) -> (K, V) {
        match self {
            TryInsertError::Full(k, v) | TryInsertError::Closed(k, v) => (k, v),
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, TryInsertError::Full(..))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, TryInsertError::Closed(..))
    }
}

// Keys and values are opaque; do not require them to be Debug.
impl<K, V> fmt::Debug for TryInsertError<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TryInsertError::Full(..) => f.write_str("Full(..)"),
            TryInsertError::Closed(..) => f.write_str("Closed(..)"),
        }
    }
}
