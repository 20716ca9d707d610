//! Pricing and order building.
//!
//! Turns a list of desired (product, quantity) pairs into a priced,
//! immutable order draft. First failure aborts all: no partial order is
//! ever built, and nothing here mutates stock.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use shotx_core::{ProductId, Username, round_money};

use crate::error::{Result, ShopError};
use crate::models::OrderItem;
use crate::store::ProductStore;

/// A priced order that has not been persisted yet.
///
/// The order lifecycle manager assigns the id when it stores the draft;
/// everything else about the order is fixed here.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub username: Username,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
    pub total_price: Decimal,
}

/// Build a priced order draft from desired items.
///
/// Availability is checked for every item before any price is snapshotted,
/// then each line captures the product's current unit price. Line totals
/// and the order total are rounded half-up to two decimal places.
///
/// # Errors
///
/// Returns `InvalidQuantity` for an empty list or a zero quantity,
/// `NotFound` if a product has disappeared, `InsufficientStock` if any
/// line exceeds available stock.
pub async fn build_order(
    products: &ProductStore,
    username: &Username,
    desired: &[(ProductId, u32)],
) -> Result<OrderDraft> {
    if desired.is_empty() || desired.iter().any(|(_, quantity)| *quantity == 0) {
        return Err(ShopError::InvalidQuantity);
    }

    let items = products.quote_items(desired).await?;

    let total = items
        .iter()
        .map(|item| round_money(item.unit_price * Decimal::from(item.quantity)))
        .sum();

    Ok(OrderDraft {
        username: username.clone(),
        created_at: Utc::now(),
        items,
        total_price: round_money(total),
    })
}
