//! Key-value storage collaborators.
//!
//! The cart only needs string keys and string values with async get/set, the
//! same surface a mobile device's local storage exposes. Two adapters ship
//! with the crate:
//!
//! - [`MemoryStore`] - process-local map, used in tests and as a scratch store
//! - [`FileStore`] - a single JSON object on disk, used by the CLI

use async_trait::async_trait;

use crate::error::StorageError;

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Trait abstraction for the persistent key-value store.
/// Implementations can be file-backed, in-memory, or a device storage bridge.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: String) -> Result<(), StorageError>;

    /// Delete `key`. Deleting a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}
