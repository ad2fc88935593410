//! Pure cart state transitions.
//!
//! Every mutation is expressed as `old items + action -> new items`. Nothing
//! here touches storage or awaits, so [`CartStore`](crate::CartStore) can
//! compute the next state under its lock and persist exactly that value.

use go_marketplace_core::{CartItem, Product, ProductId};

use crate::config::ZeroQuantityPolicy;

/// A requested change to the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartAction {
    /// Add one unit of a product, appending a new line if needed.
    Add(Product),
    /// Add one unit to an existing line.
    Increment(ProductId),
    /// Take one unit from an existing line.
    Decrement(ProductId),
    /// Drop a line regardless of its quantity.
    Remove(ProductId),
    /// Drop every line.
    Clear,
}

impl CartAction {
    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Add(_) => "add",
            Self::Increment(_) => "increment",
            Self::Decrement(_) => "decrement",
            Self::Remove(_) => "remove",
            Self::Clear => "clear",
        }
    }
}

/// What an action did to the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A product was added; `quantity` is the line's new quantity.
    Added { quantity: u32 },
    /// A line gained one unit.
    Incremented { quantity: u32 },
    /// A line lost one unit.
    Decremented { quantity: u32 },
    /// A line was dropped.
    Removed,
    /// `lines` lines were dropped.
    Cleared { lines: usize },
    /// The action was valid but left the cart as it was.
    Unchanged,
    /// The action referenced a product that is not in the cart.
    ItemNotFound,
}

impl Outcome {
    /// Whether the items differ from before the action.
    #[must_use]
    pub const fn changed(&self) -> bool {
        !matches!(self, Self::Unchanged | Self::ItemNotFound)
    }
}

/// Result of applying one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub items: Vec<CartItem>,
    pub outcome: Outcome,
}

impl Transition {
    fn unchanged(items: &[CartItem], outcome: Outcome) -> Self {
        Self {
            items: items.to_vec(),
            outcome,
        }
    }
}

/// Apply `action` to `items`, returning the next state.
///
/// Line order is preserved; new products are appended. Quantities saturate at
/// `u32::MAX` instead of wrapping.
#[must_use]
pub fn apply(items: &[CartItem], action: CartAction, policy: ZeroQuantityPolicy) -> Transition {
    match action {
        CartAction::Add(product) => add(items, product),
        CartAction::Increment(id) => increment(items, &id),
        CartAction::Decrement(id) => decrement(items, &id, policy),
        CartAction::Remove(id) => remove(items, &id),
        CartAction::Clear => clear(items),
    }
}

fn position(items: &[CartItem], id: &ProductId) -> Option<usize> {
    items.iter().position(|item| &item.id == id)
}

fn add(items: &[CartItem], product: Product) -> Transition {
    let mut next = items.to_vec();

    let quantity = match position(items, &product.id).and_then(|idx| next.get_mut(idx)) {
        Some(line) => {
            // Latest catalogue data wins; only the quantity accumulates.
            let quantity = line.quantity.saturating_add(1);
            *line = CartItem::from_product(product, quantity);
            quantity
        }
        None => {
            next.push(CartItem::from_product(product, 1));
            1
        }
    };

    Transition {
        items: next,
        outcome: Outcome::Added { quantity },
    }
}

fn increment(items: &[CartItem], id: &ProductId) -> Transition {
    let Some(idx) = position(items, id) else {
        return Transition::unchanged(items, Outcome::ItemNotFound);
    };

    let mut next = items.to_vec();
    let Some(line) = next.get_mut(idx) else {
        return Transition::unchanged(items, Outcome::ItemNotFound);
    };

    match line.quantity.checked_add(1) {
        Some(quantity) => {
            line.quantity = quantity;
            Transition {
                items: next,
                outcome: Outcome::Incremented { quantity },
            }
        }
        None => Transition::unchanged(items, Outcome::Unchanged),
    }
}

fn decrement(items: &[CartItem], id: &ProductId, policy: ZeroQuantityPolicy) -> Transition {
    let Some(idx) = position(items, id) else {
        return Transition::unchanged(items, Outcome::ItemNotFound);
    };

    let current = items.get(idx).map_or(0, |line| line.quantity);
    let quantity = current.saturating_sub(1);
    let mut next = items.to_vec();

    match policy {
        ZeroQuantityPolicy::Remove if quantity == 0 => {
            next.remove(idx);
            Transition {
                items: next,
                outcome: Outcome::Removed,
            }
        }
        ZeroQuantityPolicy::Clamp if current == 0 => {
            Transition::unchanged(items, Outcome::Unchanged)
        }
        ZeroQuantityPolicy::Remove | ZeroQuantityPolicy::Clamp => {
            if let Some(line) = next.get_mut(idx) {
                line.quantity = quantity;
            }
            Transition {
                items: next,
                outcome: Outcome::Decremented { quantity },
            }
        }
    }
}

fn remove(items: &[CartItem], id: &ProductId) -> Transition {
    let next: Vec<CartItem> = items.iter().filter(|item| &item.id != id).cloned().collect();

    if next.len() == items.len() {
        return Transition::unchanged(items, Outcome::ItemNotFound);
    }

    Transition {
        items: next,
        outcome: Outcome::Removed,
    }
}

fn clear(items: &[CartItem]) -> Transition {
    if items.is_empty() {
        return Transition::unchanged(items, Outcome::Unchanged);
    }

    Transition {
        items: Vec::new(),
        outcome: Outcome::Cleared { lines: items.len() },
    }
}
