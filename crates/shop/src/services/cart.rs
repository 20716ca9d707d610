//! Cart store: one active cart per user.
//!
//! Stock checks here are advisory availability checks only; nothing is
//! reserved or decremented until an order is paid. Every read-modify-write
//! holds the cart table's write lock for its whole duration, so concurrent
//! merges on the same line never lose updates. The cart lock is always
//! taken before any product lock.

use std::collections::HashMap;

use tokio::sync::RwLock;

use shotx_core::{CartId, ProductId, Username};

use crate::error::{Result, ShopError};
use crate::models::{Cart, CartItem};
use crate::services::inventory::StockLedger;

/// Cart store and operations.
pub struct CartService {
    ledger: StockLedger,
    inner: RwLock<Table>,
}

#[derive(Default)]
struct Table {
    carts: HashMap<Username, Cart>,
    next_id: i32,
}

impl Table {
    fn get_or_create(&mut self, username: &Username) -> &mut Cart {
        let next_id = &mut self.next_id;
        self.carts.entry(username.clone()).or_insert_with(|| {
            *next_id += 1;
            Cart {
                id: CartId::new(*next_id),
                username: username.clone(),
                items: Vec::new(),
            }
        })
    }
}

impl CartService {
    /// Create an empty cart store backed by the given stock ledger.
    #[must_use]
    pub fn new(ledger: StockLedger) -> Self {
        Self {
            ledger,
            inner: RwLock::new(Table::default()),
        }
    }

    /// Fetch the user's cart, creating an empty one on first access.
    /// Idempotent: later calls return the same cart.
    pub async fn get_or_create(&self, username: &Username) -> Cart {
        let mut table = self.inner.write().await;
        table.get_or_create(username).clone()
    }

    /// Add `quantity` of a product, merging with an existing line.
    ///
    /// The availability check runs against the prospective total (existing
    /// line quantity plus the increment), not just the increment.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuantity` if `quantity` is 0, `NotFound` if the
    /// product does not exist, `InsufficientStock` if the prospective
    /// total exceeds available stock (the cart keeps its prior quantity).
    pub async fn add_or_merge(
        &self,
        username: &Username,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart> {
        if quantity == 0 {
            return Err(ShopError::InvalidQuantity);
        }

        let mut table = self.inner.write().await;
        let existing = table.get_or_create(username).item_quantity(product_id);
        let prospective = existing.saturating_add(quantity);
        self.ledger.ensure_available(product_id, prospective).await?;

        let cart = table.get_or_create(username);
        if let Some(item) = cart
            .items
            .iter_mut()
            .find(|item| item.product_id == product_id)
        {
            item.quantity = prospective;
        } else {
            cart.items.push(CartItem {
                product_id,
                quantity,
            });
        }
        tracing::debug!(%username, %product_id, quantity = prospective, "cart line merged");
        Ok(cart.clone())
    }

    /// Replace a line's quantity outright (not additive).
    ///
    /// A line that is not present is left absent, matching the catalog
    /// API's historical behavior.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuantity` if `quantity` is 0, `NotFound` if the
    /// product does not exist, `InsufficientStock` if `quantity` exceeds
    /// available stock.
    pub async fn set_quantity(
        &self,
        username: &Username,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart> {
        if quantity == 0 {
            return Err(ShopError::InvalidQuantity);
        }

        let mut table = self.inner.write().await;
        self.ledger.ensure_available(product_id, quantity).await?;

        let cart = table.get_or_create(username);
        if let Some(item) = cart
            .items
            .iter_mut()
            .find(|item| item.product_id == product_id)
        {
            item.quantity = quantity;
        }
        Ok(cart.clone())
    }

    /// Remove a line if present; removing an absent line is a no-op, not
    /// an error.
    pub async fn remove_item(&self, username: &Username, product_id: ProductId) -> Cart {
        let mut table = self.inner.write().await;
        let cart = table.get_or_create(username);
        cart.items.retain(|item| item.product_id != product_id);
        cart.clone()
    }
}
