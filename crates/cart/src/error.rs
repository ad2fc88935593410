//! Cart and storage error types.

use std::time::Duration;

use thiserror::Error;

/// Errors returned by [`CartStore`](crate::CartStore) operations.
///
/// Storage failures during mutations are reported through
/// [`Persistence::Failed`](crate::Persistence::Failed) rather than as an
/// error: the in-memory cart stays authoritative for the session.
#[derive(Debug, Error)]
pub enum CartError {
    /// The store was used before `initialize` completed.
    #[error("cart store is not initialized in this context; call initialize() first")]
    NotInitialized,

    /// `initialize` was called on a store that is already hydrated.
    #[error("cart store is already initialized")]
    AlreadyInitialized,

    /// The cart total does not fit in a decimal.
    #[error("cart subtotal exceeds the representable range")]
    SubtotalOverflow,

    /// An explicit flush could not write the cart.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Errors raised by a [`KeyValueStore`](crate::KeyValueStore) or while
/// encoding the cart for it.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem or device I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored payload could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The storage call did not complete in time.
    #[error("storage call timed out after {0:?}")]
    Timeout(Duration),

    /// The backing store refused the call (quota, locked device, ...).
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    /// Whether retrying the same call may succeed.
    ///
    /// A payload that fails to encode will fail the same way every time.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        !matches!(self, Self::Serialization(_))
    }
}
