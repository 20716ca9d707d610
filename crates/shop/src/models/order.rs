//! Order and order item models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shotx_core::{OrderId, PaymentStatus, ProductId, Username};

/// A placed order.
///
/// Immutable after creation except for two fields: `payment_status` (driven
/// by the transition table in [`shotx_core::PaymentStatus`]) and
/// `payment_intent_id` (attached when the gateway issues an intent).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub username: Username,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
    /// Sum of line totals, two fractional digits, rounded half-up.
    pub total_price: Decimal,
    pub payment_status: PaymentStatus,
    pub payment_intent_id: Option<String>,
}

/// One priced line of an order.
///
/// `unit_price` is captured when the order is built and never re-read from
/// the live product, so historical orders are price-stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Decimal,
}
