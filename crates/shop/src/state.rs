//! Composition root: wires stores and services together.

use std::sync::Arc;

use secrecy::SecretString;

use crate::config::ShopConfig;
use crate::error::Result;
use crate::services::blob::{BlobStore, FsBlobStore};
use crate::services::cart::CartService;
use crate::services::images::ImageService;
use crate::services::inventory::StockLedger;
use crate::services::orders::OrderService;
use crate::services::payment::{PaymentGateway, StripeGateway};
use crate::store::ProductStore;

/// The assembled shop core.
///
/// Holds one instance of each component, all sharing the same product
/// table. Construct once per process and share behind an `Arc`.
pub struct Shop {
    pub products: Arc<ProductStore>,
    pub inventory: StockLedger,
    pub carts: CartService,
    pub orders: OrderService,
    pub images: ImageService,
}

impl Shop {
    /// Assemble the core with explicit collaborators.
    ///
    /// Tests inject gateway and blob stubs here; production callers use
    /// [`Shop::from_config`].
    #[must_use]
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        blobs: Arc<dyn BlobStore>,
        currency: String,
        webhook_secret: SecretString,
    ) -> Self {
        let products = Arc::new(ProductStore::new());
        let inventory = StockLedger::new(Arc::clone(&products));
        Self {
            carts: CartService::new(inventory.clone()),
            orders: OrderService::new(
                Arc::clone(&products),
                inventory.clone(),
                gateway,
                currency,
                webhook_secret,
            ),
            images: ImageService::new(Arc::clone(&products), blobs),
            inventory,
            products,
        }
    }

    /// Assemble the core from configuration: Stripe gateway, filesystem
    /// blob store.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the upload directory cannot be created.
    pub fn from_config(config: &ShopConfig) -> Result<Self> {
        let gateway = Arc::new(StripeGateway::new(config.stripe.secret_key.clone()));
        let blobs = Arc::new(FsBlobStore::new(&config.upload_dir)?);
        Ok(Self::new(
            gateway,
            blobs,
            config.stripe.currency.clone(),
            config.stripe.webhook_secret.clone(),
        ))
    }
}
