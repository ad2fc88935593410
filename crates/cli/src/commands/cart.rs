//! Cart commands backed by the JSON file store.

use std::sync::Arc;

use go_marketplace_cart::{
    CartConfig, CartError, CartStore, ConfigError, FileStore, Hydration, Mutation, Outcome,
    Persistence, StorageError,
};
use go_marketplace_core::{Price, Product, ProductId};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, warn};

/// Errors that end a CLI run with a non-zero exit code.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("cart error: {0}")]
    Cart(#[from] CartError),

    #[error("cart stored at {path} could not be read: {source}")]
    Unreadable { path: String, source: StorageError },

    #[error("change was applied but not saved: {0}")]
    NotSaved(StorageError),
}

/// Load configuration and open the cart stored at `CART_STORAGE_PATH`.
///
/// A cart file that exists but cannot be read aborts the run instead of being
/// overwritten by the next change.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the stored cart is
/// unreadable.
pub async fn open_store() -> Result<CartStore, CommandError> {
    let config = CartConfig::from_env()?;
    let path = config.storage_path.clone();
    let storage = Arc::new(FileStore::new(&path));

    let (store, hydration) = CartStore::open(storage, config).await?;
    match hydration {
        Hydration::Restored { lines } => info!(lines, path = %path.display(), "Loaded cart"),
        Hydration::Migrated { from, lines } => {
            info!(lines, from = %from, "Loaded cart from legacy key");
        }
        Hydration::Empty => info!(path = %path.display(), "No saved cart; starting empty"),
        Hydration::Failed(source) => {
            return Err(CommandError::Unreadable {
                path: path.display().to_string(),
                source,
            });
        }
    }

    Ok(store)
}

/// Add one unit of a product.
///
/// # Errors
///
/// Returns an error if the change could not be saved.
pub async fn add(
    store: &CartStore,
    id: ProductId,
    title: String,
    image_url: String,
    price: Decimal,
) -> Result<(), CommandError> {
    let product = Product {
        id,
        title,
        image_url,
        price: Price::new(price),
    };
    report(store.add_to_cart(product).await?)
}

/// # Errors
///
/// Returns an error if the change could not be saved.
pub async fn increment(store: &CartStore, id: &ProductId) -> Result<(), CommandError> {
    report(store.increment(id).await?)
}

/// # Errors
///
/// Returns an error if the change could not be saved.
pub async fn decrement(store: &CartStore, id: &ProductId) -> Result<(), CommandError> {
    report(store.decrement(id).await?)
}

/// # Errors
///
/// Returns an error if the change could not be saved.
pub async fn remove(store: &CartStore, id: &ProductId) -> Result<(), CommandError> {
    report(store.remove(id).await?)
}

/// # Errors
///
/// Returns an error if the change could not be saved.
pub async fn clear(store: &CartStore) -> Result<(), CommandError> {
    report(store.clear().await?)
}

/// # Errors
///
/// Returns an error if the cart could not be written.
pub async fn flush(store: &CartStore) -> Result<(), CommandError> {
    store.flush().await?;
    Ok(())
}

/// Log the cart lines and totals.
///
/// # Errors
///
/// Returns an error if the store is not initialized.
pub async fn show(store: &CartStore) -> Result<(), CommandError> {
    let items = store.items().await?;

    if items.is_empty() {
        info!("Cart is empty");
        return Ok(());
    }

    info!("Cart");
    info!("====");
    for item in &items {
        info!(
            "  {:<12} {:<24} {:>4} x {:>10} = {:>10}",
            item.id.as_str(),
            item.title,
            item.quantity,
            item.price,
            amount(item.line_total())
        );
    }
    info!("Items: {}", store.total_quantity().await?);

    match store.subtotal().await {
        Ok(subtotal) => info!("Subtotal: {subtotal:.2}"),
        Err(CartError::SubtotalOverflow) => warn!("Subtotal: {}", amount(None)),
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

fn amount(total: Option<Decimal>) -> String {
    total.map_or_else(|| "overflow".to_string(), |total| format!("{total:.2}"))
}

/// Log what a mutation did and fail if it was not saved.
fn report(mutation: Mutation) -> Result<(), CommandError> {
    match mutation.outcome {
        Outcome::Added { quantity } => info!(quantity, "Added to cart"),
        Outcome::Incremented { quantity } | Outcome::Decremented { quantity } => {
            info!(quantity, "Quantity updated");
        }
        Outcome::Removed => info!("Line removed"),
        Outcome::Cleared { lines } => info!(lines, "Cart cleared"),
        Outcome::Unchanged => info!("Nothing to change"),
        Outcome::ItemNotFound => warn!("Product is not in the cart"),
    }

    match mutation.persistence {
        Persistence::Failed(e) => Err(CommandError::NotSaved(e)),
        Persistence::Deferred => {
            warn!("Stored cart was not loaded; run `flush` to overwrite it");
            Ok(())
        }
        Persistence::Written | Persistence::Superseded | Persistence::Skipped => Ok(()),
    }
}
