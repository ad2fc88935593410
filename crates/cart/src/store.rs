//! The cart store: in-memory cart plus ordered persistence.
//!
//! # Consistency model
//!
//! Every mutation runs [`state::apply`] while holding the state lock, stores
//! the resulting items, bumps a generation counter and serializes the payload
//! from that same value. The write then happens outside the state lock, so
//! readers never wait on storage I/O.
//!
//! Writes are serialized by a second lock that remembers the last generation
//! written. A write whose generation is not newer than that is dropped, so the
//! persisted cart never goes back to an older state than one already stored,
//! whatever order the writes reach the lock in.
//!
//! If hydration fails the stored cart is unknown, so mutations only change the
//! in-memory cart ([`Persistence::Deferred`]) until [`CartStore::flush`]
//! overwrites storage on request.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use go_marketplace_core::{CartItem, Product, ProductId};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, instrument, warn};

use crate::config::CartConfig;
use crate::error::{CartError, StorageError};
use crate::state::{self, CartAction, Outcome};
use crate::storage::KeyValueStore;

/// Base delay between write retries; attempt `n` waits `n` times this.
const RETRY_BACKOFF: Duration = Duration::from_millis(50);

/// How `initialize` populated the cart.
#[derive(Debug)]
pub enum Hydration {
    /// The storage key held a cart with `lines` lines.
    Restored { lines: usize },
    /// The cart was found under a legacy key and copied to the storage key.
    Migrated { from: String, lines: usize },
    /// Nothing was stored; the cart starts empty.
    Empty,
    /// Storage could not be read or held a corrupt payload. The cart starts
    /// empty and the session continues in memory; nothing is written until
    /// [`CartStore::flush`] is called.
    Failed(StorageError),
}

/// What happened to the persisted copy after a mutation.
#[derive(Debug)]
pub enum Persistence {
    /// The post-mutation cart was written.
    Written,
    /// A newer generation was already written; this one was dropped.
    Superseded,
    /// The mutation left the cart unchanged, so nothing was written.
    Skipped,
    /// The stored cart could not be loaded, so it was left untouched. Call
    /// [`CartStore::flush`] to replace it with the in-memory cart.
    Deferred,
    /// Writing failed. The in-memory cart keeps the change; call
    /// [`CartStore::flush`] to retry.
    Failed(StorageError),
}

impl Persistence {
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Result of a cart mutation.
#[derive(Debug)]
pub struct Mutation {
    pub outcome: Outcome,
    pub persistence: Persistence,
}

/// Hydrated cart contents.
#[derive(Debug)]
struct Cart {
    items: Vec<CartItem>,
    generation: u64,
    /// Whether storage may be written without an explicit flush.
    synced: bool,
}

#[derive(Debug)]
enum Lifecycle {
    Uninitialized,
    Initializing,
    Ready(Cart),
}

impl Lifecycle {
    fn ready(&self) -> Result<&Cart, CartError> {
        match self {
            Self::Ready(cart) => Ok(cart),
            Self::Uninitialized | Self::Initializing => Err(CartError::NotInitialized),
        }
    }

    fn ready_mut(&mut self) -> Result<&mut Cart, CartError> {
        match self {
            Self::Ready(cart) => Ok(cart),
            Self::Uninitialized | Self::Initializing => Err(CartError::NotInitialized),
        }
    }
}

/// Single source of truth for the cart within the running process.
///
/// Construct one at start-up, call [`initialize`](Self::initialize) (or use
/// [`open`](Self::open)), and pass it to consumers by reference or `Arc`.
/// Every operation other than `initialize` fails with
/// [`CartError::NotInitialized`] until hydration has completed.
pub struct CartStore {
    storage: Arc<dyn KeyValueStore>,
    config: CartConfig,
    state: RwLock<Lifecycle>,
    /// Last generation successfully written to storage.
    persisted: Mutex<u64>,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// Create an uninitialized store.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>, config: CartConfig) -> Self {
        Self {
            storage,
            config,
            state: RwLock::new(Lifecycle::Uninitialized),
            persisted: Mutex::new(0),
        }
    }

    /// Create a store and hydrate it.
    ///
    /// # Errors
    ///
    /// Never fails in practice: hydration problems are reported through
    /// [`Hydration::Failed`]. The `Result` mirrors [`initialize`](Self::initialize).
    pub async fn open(
        storage: Arc<dyn KeyValueStore>,
        config: CartConfig,
    ) -> Result<(Self, Hydration), CartError> {
        let store = Self::new(storage, config);
        let hydration = store.initialize().await?;
        Ok((store, hydration))
    }

    #[must_use]
    pub const fn config(&self) -> &CartConfig {
        &self.config
    }

    /// Whether hydration has completed.
    pub async fn is_ready(&self) -> bool {
        matches!(*self.state.read().await, Lifecycle::Ready(_))
    }

    /// Load the persisted cart and move to the ready state.
    ///
    /// Storage and decoding failures are logged and returned as
    /// [`Hydration::Failed`]; the store still becomes ready with an empty cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::AlreadyInitialized`] if hydration already ran or is
    /// in progress.
    #[instrument(skip(self), fields(key = %self.config.storage_key))]
    pub async fn initialize(&self) -> Result<Hydration, CartError> {
        {
            let mut state = self.state.write().await;
            if !matches!(*state, Lifecycle::Uninitialized) {
                return Err(CartError::AlreadyInitialized);
            }
            *state = Lifecycle::Initializing;
        }

        let (items, hydration) = match self.hydrate().await {
            Ok(loaded) => loaded,
            Err(e) => {
                error!(error = %e, "Failed to load persisted cart; starting empty");
                (Vec::new(), Hydration::Failed(e))
            }
        };

        let synced = !matches!(hydration, Hydration::Failed(_));
        info!(lines = items.len(), synced, "Cart ready");
        *self.state.write().await = Lifecycle::Ready(Cart {
            items,
            generation: 0,
            synced,
        });

        Ok(hydration)
    }

    async fn hydrate(&self) -> Result<(Vec<CartItem>, Hydration), StorageError> {
        if let Some(raw) = self.read(&self.config.storage_key).await? {
            let items = decode(&raw)?;
            let lines = items.len();
            return Ok((items, Hydration::Restored { lines }));
        }

        for legacy in &self.config.legacy_keys {
            let Some(raw) = self.read(legacy).await? else {
                continue;
            };
            let items = decode(&raw)?;
            self.migrate(legacy, &items).await;
            let lines = items.len();
            return Ok((
                items,
                Hydration::Migrated {
                    from: legacy.clone(),
                    lines,
                },
            ));
        }

        Ok((Vec::new(), Hydration::Empty))
    }

    /// Copy a cart found under `legacy` to the storage key, then drop the
    /// legacy entry. Failures only cost the copy; the cart is written again on
    /// the next mutation.
    async fn migrate(&self, legacy: &str, items: &[CartItem]) {
        let written = match encode(items) {
            Ok(payload) => self.write_with_retry(payload).await,
            Err(e) => Err(e),
        };

        if let Err(e) = written {
            warn!(from = legacy, error = %e, "Failed to migrate cart to storage key");
            return;
        }

        if let Err(e) = self.with_timeout(self.storage.remove(legacy)).await {
            warn!(from = legacy, error = %e, "Failed to remove legacy cart key");
        }

        info!(from = legacy, lines = items.len(), "Migrated cart from legacy key");
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Current cart lines in display order.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotInitialized`] before hydration.
    pub async fn items(&self) -> Result<Vec<CartItem>, CartError> {
        let state = self.state.read().await;
        Ok(state.ready()?.items.clone())
    }

    /// Sum of all line quantities.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotInitialized`] before hydration.
    pub async fn total_quantity(&self) -> Result<u64, CartError> {
        let state = self.state.read().await;
        Ok(state
            .ready()?
            .items
            .iter()
            .map(|item| u64::from(item.quantity))
            .sum())
    }

    /// Sum of `price * quantity` over all lines.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotInitialized`] before hydration, or
    /// [`CartError::SubtotalOverflow`] if the total does not fit in a decimal.
    pub async fn subtotal(&self) -> Result<Decimal, CartError> {
        let state = self.state.read().await;
        state
            .ready()?
            .items
            .iter()
            .try_fold(Decimal::ZERO, |total, item| {
                item.line_total()?.checked_add(total)
            })
            .ok_or(CartError::SubtotalOverflow)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add one unit of `product`.
    ///
    /// An existing line for the same product gains one unit and takes the
    /// product's latest title, image and price; otherwise a line with quantity
    /// 1 is appended.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotInitialized`] before hydration.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add_to_cart(&self, product: Product) -> Result<Mutation, CartError> {
        self.mutate(CartAction::Add(product)).await
    }

    /// Add one unit to the line for `id`. Unknown IDs are a logged no-op.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotInitialized`] before hydration.
    #[instrument(skip(self, id), fields(product_id = %id))]
    pub async fn increment(&self, id: &ProductId) -> Result<Mutation, CartError> {
        self.mutate(CartAction::Increment(id.clone())).await
    }

    /// Take one unit from the line for `id`, applying the configured
    /// [`ZeroQuantityPolicy`](crate::ZeroQuantityPolicy) at zero. Unknown IDs
    /// are a logged no-op.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotInitialized`] before hydration.
    #[instrument(skip(self, id), fields(product_id = %id))]
    pub async fn decrement(&self, id: &ProductId) -> Result<Mutation, CartError> {
        self.mutate(CartAction::Decrement(id.clone())).await
    }

    /// Drop the line for `id` regardless of quantity.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotInitialized`] before hydration.
    #[instrument(skip(self, id), fields(product_id = %id))]
    pub async fn remove(&self, id: &ProductId) -> Result<Mutation, CartError> {
        self.mutate(CartAction::Remove(id.clone())).await
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotInitialized`] before hydration.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<Mutation, CartError> {
        self.mutate(CartAction::Clear).await
    }

    /// Write the current cart to storage, e.g. after a
    /// [`Persistence::Failed`] mutation.
    ///
    /// After a failed hydration this overwrites whatever storage holds and
    /// resumes writing on every mutation.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotInitialized`] before hydration, or
    /// [`CartError::Storage`] if the write fails.
    #[instrument(skip(self))]
    pub async fn flush(&self) -> Result<(), CartError> {
        loop {
            let (generation, payload) = {
                let state = self.state.read().await;
                let cart = state.ready()?;
                (cart.generation, encode(&cart.items))
            };

            {
                let mut persisted = self.persisted.lock().await;
                if generation < *persisted {
                    debug!(generation, persisted = *persisted, "Newer cart already written");
                    return Ok(());
                }

                self.write_with_retry(payload?).await?;
                *persisted = generation;
            }

            let mut state = self.state.write().await;
            let cart = state.ready_mut()?;
            cart.synced = true;
            // Mutations deferred while this write ran are not stored yet.
            if cart.generation == generation {
                info!(generation, "Cart flushed");
                return Ok(());
            }
        }
    }

    async fn mutate(&self, action: CartAction) -> Result<Mutation, CartError> {
        let action_name = action.name();

        let (outcome, generation, payload) = {
            let mut state = self.state.write().await;
            let cart = state.ready_mut()?;
            let transition = state::apply(&cart.items, action, self.config.zero_quantity_policy);

            match transition.outcome {
                Outcome::ItemNotFound => {
                    warn!(action = action_name, "Product is not in the cart; ignoring");
                }
                Outcome::Unchanged => {
                    debug!(action = action_name, "Cart unchanged");
                }
                _ => {}
            }

            if !transition.outcome.changed() {
                return Ok(Mutation {
                    outcome: transition.outcome,
                    persistence: Persistence::Skipped,
                });
            }

            cart.items = transition.items;
            cart.generation += 1;

            if !cart.synced {
                warn!(
                    action = action_name,
                    "Stored cart was not loaded; keeping change in memory only"
                );
                return Ok(Mutation {
                    outcome: transition.outcome,
                    persistence: Persistence::Deferred,
                });
            }

            (transition.outcome, cart.generation, encode(&cart.items))
        };

        debug!(action = action_name, generation, ?outcome, "Cart updated");
        let persistence = self.persist(generation, payload).await;

        Ok(Mutation {
            outcome,
            persistence,
        })
    }

    /// Write the payload for `generation` unless a newer one is already stored.
    async fn persist(
        &self,
        generation: u64,
        payload: Result<String, StorageError>,
    ) -> Persistence {
        let mut persisted = self.persisted.lock().await;
        if generation <= *persisted {
            debug!(generation, persisted = *persisted, "Skipping superseded cart write");
            return Persistence::Superseded;
        }

        let written = match payload {
            Ok(payload) => self.write_with_retry(payload).await,
            Err(e) => Err(e),
        };

        match written {
            Ok(()) => {
                *persisted = generation;
                Persistence::Written
            }
            Err(e) => {
                error!(
                    generation,
                    error = %e,
                    "Failed to persist cart; in-memory cart remains authoritative"
                );
                Persistence::Failed(e)
            }
        }
    }

    // =========================================================================
    // Storage helpers
    // =========================================================================

    async fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.with_timeout(self.storage.get(key)).await
    }

    async fn write_with_retry(&self, payload: String) -> Result<(), StorageError> {
        let key = &self.config.storage_key;
        let mut attempt: u32 = 0;

        loop {
            match self.with_timeout(self.storage.set(key, payload.clone())).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_transient() && attempt < self.config.persist_retries => {
                    attempt += 1;
                    warn!(attempt, error = %e, "Cart write failed; retrying");
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn with_timeout<T, F>(&self, call: F) -> Result<T, StorageError>
    where
        F: Future<Output = Result<T, StorageError>> + Send,
    {
        let limit = self.config.storage_timeout;
        tokio::time::timeout(limit, call)
            .await
            .map_err(|_| StorageError::Timeout(limit))?
    }
}

// =============================================================================
// Payload encoding
// =============================================================================

fn encode(items: &[CartItem]) -> Result<String, StorageError> {
    Ok(serde_json::to_string(items)?)
}

/// Decode a persisted cart.
///
/// `null` reads as an empty cart. Repeated IDs (written by older clients) are
/// merged into the first line for that ID with their quantities summed.
fn decode(raw: &str) -> Result<Vec<CartItem>, StorageError> {
    let decoded: Option<Vec<CartItem>> = serde_json::from_str(raw)?;
    let mut items: Vec<CartItem> = Vec::new();

    for item in decoded.unwrap_or_default() {
        match items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => {
                warn!(product_id = %item.id, "Merging duplicate cart line");
                existing.quantity = existing.quantity.saturating_add(item.quantity);
            }
            None => items.push(item),
        }
    }

    Ok(items)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use go_marketplace_core::Price;

    use super::*;
    use crate::config::{DEFAULT_STORAGE_KEY, LEGACY_STORAGE_KEYS, ZeroQuantityPolicy};
    use crate::storage::MemoryStore;

    /// Memory store whose next `failures` writes fail.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        failures: AtomicU32,
        slow_reads: bool,
    }

    #[async_trait]
    impl KeyValueStore for FlakyStore {
        async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            if self.slow_reads {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(StorageError::Unavailable("device storage full".to_string()));
            }
            self.inner.set(key, value).await
        }

        async fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove(key).await
        }
    }

    fn config() -> CartConfig {
        CartConfig {
            persist_retries: 0,
            ..CartConfig::default()
        }
    }

    fn shoe() -> Product {
        Product {
            id: ProductId::parse("1").unwrap(),
            title: "Shoe".to_string(),
            image_url: "u".to_string(),
            price: Price::new(Decimal::from(100)),
        }
    }

    async fn stored(memory: &MemoryStore) -> Vec<CartItem> {
        let raw = memory.get(DEFAULT_STORAGE_KEY).await.unwrap().unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[tokio::test]
    async fn test_operations_before_initialize_fail() {
        let store = CartStore::new(Arc::new(MemoryStore::new()), config());
        let id = ProductId::parse("1").unwrap();

        assert!(!store.is_ready().await);
        assert!(matches!(store.items().await, Err(CartError::NotInitialized)));
        assert!(matches!(store.add_to_cart(shoe()).await, Err(CartError::NotInitialized)));
        assert!(matches!(store.increment(&id).await, Err(CartError::NotInitialized)));
        assert!(matches!(store.decrement(&id).await, Err(CartError::NotInitialized)));
        assert!(matches!(store.flush().await, Err(CartError::NotInitialized)));
    }

    #[tokio::test]
    async fn test_initialize_twice_fails() {
        let (store, hydration) = CartStore::open(Arc::new(MemoryStore::new()), config())
            .await
            .unwrap();
        assert!(matches!(hydration, Hydration::Empty));
        assert!(matches!(store.initialize().await, Err(CartError::AlreadyInitialized)));
    }

    #[tokio::test]
    async fn test_add_writes_post_mutation_state() {
        let memory = MemoryStore::new();
        let (store, _) = CartStore::open(Arc::new(memory.clone()), config()).await.unwrap();

        let mutation = store.add_to_cart(shoe()).await.unwrap();
        assert_eq!(mutation.outcome, Outcome::Added { quantity: 1 });
        assert!(matches!(mutation.persistence, Persistence::Written));
        assert_eq!(stored(&memory).await, store.items().await.unwrap());

        store.increment(&shoe().id).await.unwrap();
        assert_eq!(stored(&memory).await[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_unknown_id_skips_write() {
        let memory = MemoryStore::new();
        let (store, _) = CartStore::open(Arc::new(memory.clone()), config()).await.unwrap();

        let mutation = store
            .increment(&ProductId::parse("unknown-id").unwrap())
            .await
            .unwrap();
        assert_eq!(mutation.outcome, Outcome::ItemNotFound);
        assert!(matches!(mutation.persistence, Persistence::Skipped));
        assert!(memory.is_empty().await);
    }

    #[tokio::test]
    async fn test_superseded_write_is_dropped() {
        let memory = MemoryStore::new();
        let (store, _) = CartStore::open(Arc::new(memory.clone()), config()).await.unwrap();

        let newer = vec![CartItem::from_product(shoe(), 2)];
        let older = vec![CartItem::from_product(shoe(), 1)];

        assert!(matches!(store.persist(2, encode(&newer)).await, Persistence::Written));
        assert!(matches!(store.persist(1, encode(&older)).await, Persistence::Superseded));
        assert_eq!(stored(&memory).await, newer);
    }

    #[tokio::test]
    async fn test_failed_write_keeps_memory_and_flush_recovers() {
        let flaky = Arc::new(FlakyStore::default());
        let (store, _) = CartStore::open(flaky.clone(), config()).await.unwrap();

        flaky.failures.store(1, Ordering::SeqCst);
        let mutation = store.add_to_cart(shoe()).await.unwrap();
        assert!(mutation.persistence.is_failed());
        assert_eq!(store.items().await.unwrap().len(), 1);
        assert!(flaky.inner.is_empty().await);

        store.flush().await.unwrap();
        assert_eq!(stored(&flaky.inner).await, store.items().await.unwrap());
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let flaky = Arc::new(FlakyStore::default());
        let retrying = CartConfig {
            persist_retries: 2,
            ..CartConfig::default()
        };
        let (store, _) = CartStore::open(flaky.clone(), retrying).await.unwrap();

        flaky.failures.store(2, Ordering::SeqCst);
        let mutation = store.add_to_cart(shoe()).await.unwrap();
        assert!(matches!(mutation.persistence, Persistence::Written));
    }

    #[tokio::test]
    async fn test_slow_storage_times_out() {
        let slow = Arc::new(FlakyStore {
            slow_reads: true,
            ..FlakyStore::default()
        });
        let hasty = CartConfig {
            storage_timeout: Duration::from_millis(20),
            ..config()
        };

        let (store, hydration) = CartStore::open(slow, hasty).await.unwrap();
        assert!(matches!(hydration, Hydration::Failed(StorageError::Timeout(_))));
        assert!(store.is_ready().await);
        assert!(store.items().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_payload_is_kept_until_flush() {
        let memory = MemoryStore::with_entries([(DEFAULT_STORAGE_KEY, "{not json")]);
        let (store, hydration) = CartStore::open(Arc::new(memory.clone()), config())
            .await
            .unwrap();

        assert!(matches!(hydration, Hydration::Failed(StorageError::Serialization(_))));
        let mutation = store.add_to_cart(shoe()).await.unwrap();
        assert_eq!(mutation.outcome, Outcome::Added { quantity: 1 });
        assert!(matches!(mutation.persistence, Persistence::Deferred));
        assert_eq!(
            memory.get(DEFAULT_STORAGE_KEY).await.unwrap().as_deref(),
            Some("{not json")
        );

        store.flush().await.unwrap();
        assert_eq!(stored(&memory).await.len(), 1);

        store.increment(&shoe().id).await.unwrap();
        assert_eq!(stored(&memory).await[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_unread_cart_is_not_overwritten_after_timeout() {
        let existing = r#"[{"id":"7","title":"Hat","image_url":"h","price":20,"quantity":4}]"#;
        let slow = Arc::new(FlakyStore {
            inner: MemoryStore::with_entries([(DEFAULT_STORAGE_KEY, existing)]),
            slow_reads: true,
            ..FlakyStore::default()
        });
        let hasty = CartConfig {
            storage_timeout: Duration::from_millis(20),
            ..config()
        };

        let (store, hydration) = CartStore::open(slow.clone(), hasty).await.unwrap();
        assert!(matches!(hydration, Hydration::Failed(StorageError::Timeout(_))));

        let mutation = store.add_to_cart(shoe()).await.unwrap();
        assert!(matches!(mutation.persistence, Persistence::Deferred));
        store.remove(&shoe().id).await.unwrap();
        assert_eq!(stored(&slow.inner).await[0].quantity, 4);
        assert_eq!(stored(&slow.inner).await[0].id.as_str(), "7");
    }

    #[tokio::test]
    async fn test_legacy_keys_are_migrated() {
        let legacy = r#"[{"id":"1","title":"Shoe","image_url":"u","price":100,"quantity":3}]"#;

        for key in LEGACY_STORAGE_KEYS {
            let memory = MemoryStore::with_entries([(key, legacy)]);
            let (store, hydration) = CartStore::open(Arc::new(memory.clone()), config())
                .await
                .unwrap();

            assert!(matches!(hydration, Hydration::Migrated { lines: 1, .. }));
            assert_eq!(store.items().await.unwrap()[0].quantity, 3);
            assert_eq!(stored(&memory).await[0].quantity, 3);
            assert!(memory.get(key).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn test_decrement_policies() {
        let (remove, _) = CartStore::open(Arc::new(MemoryStore::new()), config()).await.unwrap();
        remove.add_to_cart(shoe()).await.unwrap();
        let m = remove.decrement(&shoe().id).await.unwrap();
        assert_eq!(m.outcome, Outcome::Removed);
        assert!(remove.items().await.unwrap().is_empty());

        let clamp_config = CartConfig {
            zero_quantity_policy: ZeroQuantityPolicy::Clamp,
            ..config()
        };
        let (clamp, _) = CartStore::open(Arc::new(MemoryStore::new()), clamp_config)
            .await
            .unwrap();
        clamp.add_to_cart(shoe()).await.unwrap();
        clamp.decrement(&shoe().id).await.unwrap();
        let m = clamp.decrement(&shoe().id).await.unwrap();
        assert_eq!(m.outcome, Outcome::Unchanged);
        assert_eq!(clamp.items().await.unwrap()[0].quantity, 0);
    }

    #[tokio::test]
    async fn test_totals() {
        let (store, _) = CartStore::open(Arc::new(MemoryStore::new()), config()).await.unwrap();
        store.add_to_cart(shoe()).await.unwrap();
        store.add_to_cart(shoe()).await.unwrap();
        store
            .add_to_cart(Product {
                id: ProductId::parse("2").unwrap(),
                title: "Sock".to_string(),
                image_url: "s".to_string(),
                price: Price::from_cents(550),
            })
            .await
            .unwrap();

        assert_eq!(store.total_quantity().await.unwrap(), 3);
        assert_eq!(store.subtotal().await.unwrap(), Decimal::new(20_550, 2));
    }

    #[tokio::test]
    async fn test_subtotal_overflow_is_an_error() {
        let huge = r#"[{"id":"1","title":"Gold","image_url":"g","price":"50000000000000000000000000000","quantity":2}]"#;
        let memory = MemoryStore::with_entries([(DEFAULT_STORAGE_KEY, huge)]);
        let (store, hydration) = CartStore::open(Arc::new(memory), config()).await.unwrap();

        assert!(matches!(hydration, Hydration::Restored { lines: 1 }));
        assert_eq!(store.total_quantity().await.unwrap(), 2);
        assert!(matches!(store.subtotal().await, Err(CartError::SubtotalOverflow)));
    }

    #[test]
    fn test_decode_merges_duplicates_and_accepts_null() {
        let raw = r#"[
            {"id":"1","title":"Shoe","image_url":"u","price":100,"quantity":1},
            {"id":"2","title":"Sock","image_url":"s","price":5,"quantity":1},
            {"id":"1","title":"Shoe","image_url":"u","price":100,"quantity":1}
        ]"#;
        let items = decode(raw).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].quantity, 2);
        assert_eq!(items[1].id.as_str(), "2");

        assert!(decode("null").unwrap().is_empty());
    }
}
