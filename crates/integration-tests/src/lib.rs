//! Shared harness for the shop core integration tests.
//!
//! Provides an assembled [`Shop`] with stub collaborators: a payment
//! gateway that records calls instead of talking to Stripe, and an
//! in-memory blob store.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use rust_decimal::Decimal;
use secrecy::SecretString;

use shotx_core::{OrderId, Username};
use shotx_shop::Shop;
use shotx_shop::models::{NewProduct, Product};
use shotx_shop::services::blob::BlobStore;
use shotx_shop::services::payment::{GatewayError, PaymentGateway, PaymentIntent};

/// Webhook signing secret shared by every test shop.
pub const WEBHOOK_SECRET: &str = "whsec_integration_test";

/// Initialize tracing once for the whole test binary.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Gateway stub that hands out deterministic intents.
#[derive(Default)]
pub struct MockGateway {
    calls: AtomicUsize,
    fail: AtomicBool,
    last_request: Mutex<Option<(i64, String, OrderId)>>,
}

impl MockGateway {
    /// Number of create-intent calls seen so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make subsequent create-intent calls fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    /// The amount, currency and order id of the most recent call.
    pub fn last_request(&self) -> Option<(i64, String, OrderId)> {
        self.last_request.lock().expect("mutex poisoned").clone()
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        order_id: OrderId,
    ) -> Result<PaymentIntent, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().expect("mutex poisoned") =
            Some((amount_minor, currency.to_owned(), order_id));
        if self.fail.load(Ordering::SeqCst) {
            return Err(GatewayError::Api {
                status: 503,
                message: "gateway unavailable".to_owned(),
            });
        }
        Ok(PaymentIntent {
            id: format!("pi_mock_{order_id}"),
            client_secret: format!("pi_mock_{order_id}_secret"),
        })
    }
}

/// In-memory blob store.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    next: AtomicUsize,
}

impl MemoryBlobStore {
    /// Number of blobs currently held.
    pub fn len(&self) -> usize {
        self.blobs.lock().expect("mutex poisoned").len()
    }

    /// Whether the store holds no blobs.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn store(&self, bytes: &[u8], content_type: &str) -> io::Result<String> {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        let ext = content_type.rsplit('/').next().unwrap_or("bin");
        let url = format!("/uploads/mem-{n}.{ext}");
        self.blobs
            .lock()
            .expect("mutex poisoned")
            .insert(url.clone(), bytes.to_vec());
        Ok(url)
    }

    async fn remove(&self, url: &str) -> io::Result<()> {
        self.blobs
            .lock()
            .expect("mutex poisoned")
            .remove(url)
            .map(|_| ())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no blob at {url}")))
    }
}

/// Everything a scenario test needs.
pub struct TestShop {
    pub shop: Arc<Shop>,
    pub gateway: Arc<MockGateway>,
    pub blobs: Arc<MemoryBlobStore>,
}

/// Assemble a shop over stub collaborators.
pub fn test_shop() -> TestShop {
    init_tracing();
    let gateway = Arc::new(MockGateway::default());
    let blobs = Arc::new(MemoryBlobStore::default());
    let shop = Arc::new(Shop::new(
        Arc::clone(&gateway) as Arc<dyn PaymentGateway>,
        Arc::clone(&blobs) as Arc<dyn BlobStore>,
        "usd".to_owned(),
        SecretString::from(WEBHOOK_SECRET),
    ));
    TestShop {
        shop,
        gateway,
        blobs,
    }
}

/// Parse a username that the test knows is valid.
pub fn user(name: &str) -> Username {
    Username::parse(name).expect("valid test username")
}

/// Seed one product with a price in cents.
pub async fn seed_product(shop: &Shop, name: &str, price_cents: i64, stock: u32) -> Product {
    shop.products
        .create(NewProduct {
            name: name.to_owned(),
            description: None,
            price: Decimal::new(price_cents, 2),
            stock,
        })
        .await
}

/// A signed `payment_intent.succeeded` webhook for an order.
pub fn succeeded_webhook(order_id: OrderId, payment_intent_id: &str) -> (String, String) {
    let payload = format!(
        r#"{{"type":"payment_intent.succeeded","data":{{"object":{{"id":"{payment_intent_id}","metadata":{{"order_id":"{order_id}"}}}}}}}}"#
    );
    let header = shotx_shop::services::payment::sign_webhook_payload(
        &payload,
        chrono::Utc::now().timestamp(),
        &SecretString::from(WEBHOOK_SECRET),
    );
    (payload, header)
}
