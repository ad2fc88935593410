//! Catalogue products and cart line items.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Price, ProductId};

/// A catalogue product as handed to the cart by the product listing.
///
/// Any `quantity` field present in the source payload is ignored: quantity is
/// only meaningful once the product is in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub image_url: String,
    pub price: Price,
}

/// A product plus the quantity of it held in the cart.
///
/// This is also the persisted record shape:
///
/// ```json
/// {"id":"1","title":"Shoe","image_url":"u","price":100.0,"quantity":1}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: ProductId,
    pub title: String,
    pub image_url: String,
    pub price: Price,
    pub quantity: u32,
}

impl CartItem {
    /// Create a line for `product` holding `quantity` units.
    #[must_use]
    pub fn from_product(product: Product, quantity: u32) -> Self {
        Self {
            id: product.id,
            title: product.title,
            image_url: product.image_url,
            price: product.price,
            quantity,
        }
    }

    /// Unit price multiplied by quantity, or `None` on decimal overflow.
    #[must_use]
    pub fn line_total(&self) -> Option<Decimal> {
        self.price.checked_total(self.quantity)
    }
}
