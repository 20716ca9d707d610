//! Stripe payment gateway adapter.
//!
//! The core talks to the gateway through a narrow contract: create a
//! payment intent for an amount in minor currency units, and verify the
//! signature on inbound webhook events. Everything else about the
//! gateway's protocol stays behind this module.

use std::collections::HashMap;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

use shotx_core::OrderId;

/// Stripe API base URL.
const BASE_URL: &str = "https://api.stripe.com/v1";

/// The only webhook event type that confirms a payment.
pub const EVENT_PAYMENT_SUCCEEDED: &str = "payment_intent.succeeded";

/// Maximum accepted age of a signed webhook, in seconds.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

type HmacSha256 = Hmac<Sha256>;

/// Errors from the payment gateway adapter.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Webhook signature did not verify.
    #[error("invalid webhook signature")]
    InvalidSignature,

    /// Webhook is older than the accepted tolerance.
    #[error("webhook timestamp outside tolerance")]
    StaleTimestamp,

    /// Webhook payload or signature header could not be parsed.
    #[error("malformed webhook: {0}")]
    Payload(String),

    /// Order total does not fit in minor currency units.
    #[error("amount out of range for minor currency units")]
    AmountOverflow,
}

/// A created payment intent.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    /// Gateway-assigned intent identifier.
    pub id: String,
    /// Secret handed to the browser to complete the payment.
    pub client_secret: String,
}

/// Capability boundary to the external payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a payment intent for `amount_minor` units of `currency`,
    /// tagged with the order id so the webhook can find its order.
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        order_id: OrderId,
    ) -> Result<PaymentIntent, GatewayError>;
}

/// Stripe implementation of [`PaymentGateway`] over the REST API.
pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: SecretString,
    base_url: String,
}

impl StripeGateway {
    /// Create a gateway client with the given API secret key.
    #[must_use]
    pub fn new(secret_key: SecretString) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret_key,
            base_url: BASE_URL.to_owned(),
        }
    }

    /// Point the client at a different base URL (local gateway stub).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        order_id: OrderId,
    ) -> Result<PaymentIntent, GatewayError> {
        let order_id_value = order_id.to_string();
        let amount_value = amount_minor.to_string();
        let params: Vec<(&str, &str)> = vec![
            ("amount", amount_value.as_str()),
            ("currency", currency),
            ("automatic_payment_methods[enabled]", "true"),
            ("metadata[order_id]", order_id_value.as_str()),
        ];

        let response = self
            .client
            .post(format!("{}/payment_intents", self.base_url))
            .basic_auth(self.secret_key.expose_secret(), None::<&str>)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "payment intent creation failed");
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let intent: PaymentIntent = response.json().await?;
        tracing::info!(order_id = %order_id, intent_id = %intent.id, "payment intent created");
        Ok(intent)
    }
}

/// A verified, parsed webhook event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    /// A payment intent succeeded; drives order confirmation.
    PaymentIntentSucceeded {
        payment_intent_id: String,
        order_id: Option<OrderId>,
    },
    /// Any other event type; verified but not acted upon.
    Ignored { event_type: String },
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: RawEventData,
}

#[derive(Deserialize)]
struct RawEventData {
    object: RawEventObject,
}

#[derive(Deserialize)]
struct RawEventObject {
    id: String,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

/// Verify a webhook's signature and parse its event.
///
/// The signature header carries `t=<unix-ts>,v1=<hex hmac>` pairs; the
/// HMAC-SHA256 is computed over `"{t}.{payload}"` with the endpoint
/// secret. Verification is constant-time and the timestamp must be within
/// five minutes of `now` (the gateway may redeliver, but not that late).
///
/// # Errors
///
/// Returns `Payload` for unparseable input, `StaleTimestamp` for an
/// expired signature and `InvalidSignature` when no `v1` candidate
/// verifies.
pub fn verify_and_parse_webhook(
    payload: &str,
    signature_header: &str,
    secret: &SecretString,
) -> Result<WebhookEvent, GatewayError> {
    let (timestamp, candidates) = parse_signature_header(signature_header)?;

    let age = chrono::Utc::now().timestamp() - timestamp;
    if age.abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(GatewayError::StaleTimestamp);
    }

    let signed_payload = format!("{timestamp}.{payload}");
    let verified = candidates.iter().any(|candidate| {
        hex::decode(candidate).is_ok_and(|raw| {
            HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
                .map(|mut mac| {
                    mac.update(signed_payload.as_bytes());
                    mac.verify_slice(&raw).is_ok()
                })
                .unwrap_or(false)
        })
    });
    if !verified {
        return Err(GatewayError::InvalidSignature);
    }

    let event: RawEvent = serde_json::from_str(payload)
        .map_err(|e| GatewayError::Payload(format!("invalid event JSON: {e}")))?;

    if event.event_type == EVENT_PAYMENT_SUCCEEDED {
        let order_id = event
            .data
            .object
            .metadata
            .get("order_id")
            .and_then(|raw| raw.parse().ok());
        Ok(WebhookEvent::PaymentIntentSucceeded {
            payment_intent_id: event.data.object.id,
            order_id,
        })
    } else {
        Ok(WebhookEvent::Ignored {
            event_type: event.event_type,
        })
    }
}

/// Compute the signature header for a payload, as the gateway would.
///
/// Intended for local development and test fixtures.
#[must_use]
pub fn sign_webhook_payload(payload: &str, timestamp: i64, secret: &SecretString) -> String {
    let signed_payload = format!("{timestamp}.{payload}");
    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
    mac.update(signed_payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());
    format!("t={timestamp},v1={signature}")
}

fn parse_signature_header(header: &str) -> Result<(i64, Vec<String>), GatewayError> {
    let mut timestamp = None;
    let mut candidates = Vec::new();
    for pair in header.split(',') {
        match pair.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = Some(value.parse::<i64>().map_err(|_| {
                    GatewayError::Payload(format!("invalid signature timestamp: {value}"))
                })?);
            }
            Some(("v1", value)) => candidates.push(value.to_owned()),
            _ => {} // Unknown schemes are ignored, per gateway docs.
        }
    }
    let timestamp = timestamp
        .ok_or_else(|| GatewayError::Payload("signature header missing timestamp".to_owned()))?;
    if candidates.is_empty() {
        return Err(GatewayError::Payload(
            "signature header missing v1 signature".to_owned(),
        ));
    }
    Ok((timestamp, candidates))
}
