//! Go Marketplace Cart - Persistent shopping-cart state container.
//!
//! The cart keeps an ordered list of line items in memory and mirrors every
//! mutation to an external key-value store, so the cart survives restarts of
//! the client.
//!
//! # Architecture
//!
//! - [`state`] - Pure transitions (`old items + action -> new items`), no I/O
//! - [`store`] - [`CartStore`], which owns the items, applies transitions and
//!   persists the result in mutation order
//! - [`storage`] - The [`KeyValueStore`] collaborator and its in-memory and
//!   JSON-file adapters
//! - [`config`] - Environment-driven configuration
//! - [`error`] - Error taxonomy
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use go_marketplace_cart::{CartConfig, CartStore, MemoryStore};
//!
//! # async fn run() -> Result<(), go_marketplace_cart::CartError> {
//! let storage = Arc::new(MemoryStore::new());
//! let (cart, _hydration) = CartStore::open(storage, CartConfig::default()).await?;
//! assert!(cart.items().await?.is_empty());
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod state;
pub mod storage;
pub mod store;

pub use config::{CartConfig, ConfigError, ZeroQuantityPolicy};
pub use error::{CartError, StorageError};
pub use state::{CartAction, Outcome, Transition};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use store::{CartStore, Hydration, Mutation, Persistence};
