//! Cart and cart item models.

use serde::{Deserialize, Serialize};

use shotx_core::{CartId, ProductId, Username};

/// A user's active cart.
///
/// One cart per user, created lazily on first access and never deleted;
/// an empty `items` list is the reset state. At most one line exists per
/// product; repeated additions merge by summing quantity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub username: Username,
    pub items: Vec<CartItem>,
}

impl Cart {
    /// Quantity currently in the cart for a product, 0 if absent.
    #[must_use]
    pub fn item_quantity(&self, product_id: ProductId) -> u32 {
        self.items
            .iter()
            .find(|item| item.product_id == product_id)
            .map_or(0, |item| item.quantity)
    }
}

/// One line in a cart. Quantity is always at least 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
}
