//! Integration tests for Go Marketplace.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p go-marketplace-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_scenarios` - User-visible cart behaviour, one store per test
//! - `cart_persistence` - Restarts, overlapping mutations and write ordering
//!
//! This library holds the shared fixtures: product builders, temp paths and
//! [`GatedStore`], a storage double whose writes can be held open.

use std::path::PathBuf;

use async_trait::async_trait;
use go_marketplace_cart::config::DEFAULT_STORAGE_KEY;
use go_marketplace_cart::{KeyValueStore, MemoryStore, StorageError};
use go_marketplace_core::{CartItem, Price, Product, ProductId};
use rust_decimal::Decimal;
use tokio::sync::{Notify, Semaphore};

/// Build a product with a whole-unit price.
///
/// # Panics
///
/// Panics if `id` is blank.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn product(id: &str, title: &str, price: i64) -> Product {
    Product {
        id: ProductId::parse(id).unwrap(),
        title: title.to_string(),
        image_url: "u".to_string(),
        price: Price::new(Decimal::from(price)),
    }
}

/// The product used throughout the cart scenarios.
#[must_use]
pub fn shoe() -> Product {
    product("1", "Shoe", 100)
}

/// A fresh file path under the system temp directory.
#[must_use]
pub fn temp_store_path() -> PathBuf {
    std::env::temp_dir()
        .join(format!("go_marketplace_{}", uuid::Uuid::new_v4()))
        .join("cart.json")
}

/// Decode what is stored under the default cart key.
///
/// # Panics
///
/// Panics if nothing is stored or the payload is not a cart.
#[allow(clippy::unwrap_used)]
pub async fn persisted_items(store: &dyn KeyValueStore) -> Vec<CartItem> {
    let raw = store.get(DEFAULT_STORAGE_KEY).await.unwrap().unwrap();
    serde_json::from_str(&raw).unwrap()
}

/// Memory-backed store whose writes block until [`GatedStore::open`] is called.
///
/// Lets a test hold a write in flight while further mutations are issued.
#[derive(Debug)]
pub struct GatedStore {
    inner: MemoryStore,
    gate: Semaphore,
    entered: Notify,
}

impl GatedStore {
    /// A store whose writes wait for [`open`](Self::open).
    #[must_use]
    pub fn closed() -> Self {
        Self {
            inner: MemoryStore::new(),
            gate: Semaphore::new(0),
            entered: Notify::new(),
        }
    }

    /// Let pending and future writes through.
    pub fn open(&self) {
        self.gate.add_permits(1);
    }

    /// Wait until a write has reached the gate.
    pub async fn wait_for_write(&self) {
        self.entered.notified().await;
    }

    /// The backing map.
    #[must_use]
    pub const fn memory(&self) -> &MemoryStore {
        &self.inner
    }
}

#[async_trait]
impl KeyValueStore for GatedStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.entered.notify_one();
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key).await
    }
}
