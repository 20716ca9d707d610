//! Order lifecycle manager: the payment state machine.
//!
//! Owns the order table and coordinates the stock ledger and the payment
//! gateway. The transition guard is checked under the order table's write
//! lock, so a webhook racing a manual status update decrements stock at
//! most once per order. The order lock is always taken before any product
//! lock.

use std::collections::BTreeMap;
use std::sync::Arc;

use secrecy::SecretString;
use tokio::sync::RwLock;

use shotx_core::{OrderId, PaymentStatus, ProductId, Username, to_minor_units};

use crate::error::{Result, ShopError};
use crate::models::Order;
use crate::services::inventory::StockLedger;
use crate::services::payment::{
    GatewayError, PaymentGateway, WebhookEvent, verify_and_parse_webhook,
};
use crate::services::pricing::{self, OrderDraft};
use crate::store::ProductStore;

/// Order lifecycle manager.
pub struct OrderService {
    products: Arc<ProductStore>,
    ledger: StockLedger,
    gateway: Arc<dyn PaymentGateway>,
    currency: String,
    webhook_secret: SecretString,
    inner: RwLock<Table>,
}

#[derive(Default)]
struct Table {
    orders: BTreeMap<OrderId, Order>,
    next_id: i32,
}

impl Table {
    fn get_mut(&mut self, id: OrderId) -> Result<&mut Order> {
        self.orders
            .get_mut(&id)
            .ok_or_else(|| ShopError::NotFound(format!("order {id}")))
    }
}

impl OrderService {
    /// Create the manager over the given collaborators.
    #[must_use]
    pub fn new(
        products: Arc<ProductStore>,
        ledger: StockLedger,
        gateway: Arc<dyn PaymentGateway>,
        currency: String,
        webhook_secret: SecretString,
    ) -> Self {
        Self {
            products,
            ledger,
            gateway,
            currency,
            webhook_secret,
            inner: RwLock::new(Table::default()),
        }
    }

    /// Price the desired items and persist a `PENDING` order.
    ///
    /// Stock is NOT decremented here; the decrement is deferred to payment
    /// confirmation so abandoned carts never hold stock hostage.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuantity`, `NotFound` or `InsufficientStock` from
    /// the pricing step; no order is persisted on failure.
    pub async fn place_order(
        &self,
        username: &Username,
        desired: &[(ProductId, u32)],
    ) -> Result<Order> {
        let draft = pricing::build_order(&self.products, username, desired).await?;

        let mut table = self.inner.write().await;
        table.next_id += 1;
        let order = persist_draft(OrderId::new(table.next_id), draft);
        table.orders.insert(order.id, order.clone());
        tracing::info!(
            order_id = %order.id,
            username = %order.username,
            total = %order.total_price,
            "order placed"
        );
        Ok(order)
    }

    /// Fetch an order, enforcing ownership.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the order does not exist, `Unauthorized` if
    /// it belongs to someone else.
    pub async fn get_order(&self, order_id: OrderId, username: &Username) -> Result<Order> {
        let table = self.inner.read().await;
        let order = table
            .orders
            .get(&order_id)
            .ok_or_else(|| ShopError::NotFound(format!("order {order_id}")))?;
        check_ownership(order, username)?;
        Ok(order.clone())
    }

    /// All orders for a user, newest first.
    pub async fn orders_for_user(&self, username: &Username) -> Vec<Order> {
        let table = self.inner.read().await;
        let mut orders: Vec<Order> = table
            .orders
            .values()
            .filter(|order| &order.username == username)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }

    /// Client-driven payment status change, validated against the
    /// transition table.
    ///
    /// On a transition into `PAID`, stock is decremented for every order
    /// item, all or nothing; if inventory drifted since placement the
    /// whole update fails and the order stays `PENDING`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Unauthorized`, `InvalidTransition` or
    /// `InsufficientStock`.
    pub async fn update_payment_status(
        &self,
        order_id: OrderId,
        new_status: PaymentStatus,
        username: &Username,
    ) -> Result<Order> {
        let mut table = self.inner.write().await;
        let order = table.get_mut(order_id)?;
        check_ownership(order, username)?;

        let from = order.payment_status;
        if !from.can_transition_to(new_status) {
            return Err(ShopError::InvalidTransition {
                from,
                to: new_status,
            });
        }

        if new_status == PaymentStatus::Paid {
            // Failure here rolls back the whole transition: the early
            // return leaves the order untouched at PENDING.
            self.ledger
                .decrease_stock_for_items(&order_lines(order))
                .await?;
        }

        order.payment_status = new_status;
        tracing::info!(%order_id, %from, to = %new_status, "payment status updated");
        Ok(order.clone())
    }

    /// Gateway-driven confirmation of a successful payment.
    ///
    /// Idempotent: confirming an already-`PAID` order is a no-op, never a
    /// second decrement. The status check and the decrement happen under
    /// the same write guard, so a redelivered webhook racing a manual
    /// update cannot double-apply.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `InvalidTransition` if the order already
    /// `FAILED` or was `REFUNDED`, or `InsufficientStock` (order stays
    /// `PENDING`).
    pub async fn confirm_payment_from_gateway(
        &self,
        order_id: OrderId,
        payment_intent_id: &str,
    ) -> Result<Order> {
        let mut table = self.inner.write().await;
        let order = table.get_mut(order_id)?;

        match order.payment_status {
            PaymentStatus::Paid => {
                tracing::debug!(%order_id, "duplicate payment confirmation ignored");
                return Ok(order.clone());
            }
            PaymentStatus::Pending => {}
            from => {
                return Err(ShopError::InvalidTransition {
                    from,
                    to: PaymentStatus::Paid,
                });
            }
        }

        self.ledger
            .decrease_stock_for_items(&order_lines(order))
            .await?;
        order.payment_status = PaymentStatus::Paid;
        order.payment_intent_id = Some(payment_intent_id.to_owned());
        tracing::info!(%order_id, payment_intent_id, "payment confirmed by gateway");
        Ok(order.clone())
    }

    /// Ask the gateway for a payment intent covering the order total.
    ///
    /// The total is converted to minor currency units (exact for a
    /// two-decimal total) and the order id rides along as metadata. A
    /// gateway failure leaves the `PENDING` order untouched; the call can
    /// simply be retried without re-pricing.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Unauthorized` or `Gateway`.
    pub async fn create_payment_intent(
        &self,
        order_id: OrderId,
        username: &Username,
    ) -> Result<String> {
        let order = self.get_order(order_id, username).await?;
        let amount = to_minor_units(order.total_price).ok_or(GatewayError::AmountOverflow)?;

        // No table lock is held across the outbound call.
        let intent = self
            .gateway
            .create_intent(amount, &self.currency, order_id)
            .await?;

        let mut table = self.inner.write().await;
        let order = table.get_mut(order_id)?;
        order.payment_intent_id = Some(intent.id);
        Ok(intent.client_secret)
    }

    /// Verify an inbound webhook and act on it.
    ///
    /// Only `payment_intent.succeeded` triggers confirmation; every other
    /// event type verifies and is ignored (`Ok(None)`). Redeliveries are
    /// safe because confirmation is idempotent.
    ///
    /// # Errors
    ///
    /// Returns `Gateway` for signature or payload problems, plus anything
    /// [`Self::confirm_payment_from_gateway`] returns.
    pub async fn process_webhook(
        &self,
        payload: &str,
        signature_header: &str,
    ) -> Result<Option<Order>> {
        let event = verify_and_parse_webhook(payload, signature_header, &self.webhook_secret)?;
        match event {
            WebhookEvent::PaymentIntentSucceeded {
                payment_intent_id,
                order_id: Some(order_id),
            } => {
                let order = self
                    .confirm_payment_from_gateway(order_id, &payment_intent_id)
                    .await?;
                Ok(Some(order))
            }
            WebhookEvent::PaymentIntentSucceeded { order_id: None, .. } => Err(
                GatewayError::Payload("event metadata is missing order_id".to_owned()).into(),
            ),
            WebhookEvent::Ignored { event_type } => {
                tracing::debug!(event_type, "webhook event ignored");
                Ok(None)
            }
        }
    }
}

fn persist_draft(id: OrderId, draft: OrderDraft) -> Order {
    Order {
        id,
        username: draft.username,
        created_at: draft.created_at,
        items: draft.items,
        total_price: draft.total_price,
        payment_status: PaymentStatus::Pending,
        payment_intent_id: None,
    }
}

fn check_ownership(order: &Order, username: &Username) -> Result<()> {
    if &order.username == username {
        Ok(())
    } else {
        Err(ShopError::Unauthorized {
            order_id: order.id,
            username: username.to_string(),
        })
    }
}

fn order_lines(order: &Order) -> Vec<(ProductId, u32)> {
    order
        .items
        .iter()
        .map(|item| (item.product_id, item.quantity))
        .collect()
}
