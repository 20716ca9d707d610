//! Stock ledger: the check-and-decrement surface over product stock.
//!
//! Over an order's whole lifetime stock is decremented exactly once, and
//! only by the order lifecycle's PAID transition. Cart operations use the
//! advisory checks here and never decrement.

use std::sync::Arc;

use shotx_core::ProductId;

use crate::error::{Result, ShopError};
use crate::models::Product;
use crate::store::ProductStore;

/// Stock ledger over the product table.
#[derive(Clone)]
pub struct StockLedger {
    products: Arc<ProductStore>,
}

impl StockLedger {
    /// Create a ledger over the given product table.
    #[must_use]
    pub fn new(products: Arc<ProductStore>) -> Self {
        Self { products }
    }

    /// Whether at least `quantity` units are available.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the product does not exist.
    pub async fn has_sufficient_stock(&self, product_id: ProductId, quantity: u32) -> Result<bool> {
        self.products.has_sufficient_stock(product_id, quantity).await
    }

    /// Advisory availability check that reports the shortfall.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the product does not exist, or
    /// `InsufficientStock` carrying the available count.
    pub async fn ensure_available(&self, product_id: ProductId, requested: u32) -> Result<()> {
        let available = self.products.stock_of(product_id).await?;
        if available < requested {
            return Err(ShopError::InsufficientStock {
                product_id,
                requested,
                available,
            });
        }
        Ok(())
    }

    /// Atomically decrement one product's stock, all or nothing.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `InsufficientStock`; a failed decrement
    /// leaves the count untouched.
    pub async fn decrease_stock(&self, product_id: ProductId, quantity: u32) -> Result<Product> {
        let product = self.products.decrease_stock(product_id, quantity).await?;
        tracing::info!(
            product_id = %product_id,
            quantity,
            remaining = product.stock,
            "stock decremented"
        );
        Ok(product)
    }

    /// Atomically decrement stock across every line of an order; either
    /// every line applies or none does.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `InsufficientStock` without applying any
    /// decrement.
    pub async fn decrease_stock_for_items(&self, items: &[(ProductId, u32)]) -> Result<()> {
        self.products.decrease_stock_for_items(items).await?;
        tracing::info!(lines = items.len(), "stock decremented for order items");
        Ok(())
    }
}
