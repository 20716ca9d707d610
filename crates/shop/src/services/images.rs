//! Image primacy manager.
//!
//! Maintains "at most one primary image per product" across concurrent
//! edits. The clear-then-set pair and all renumbering run inside the
//! product store's write guard; this service adds blob handling and
//! logging on top.

use std::sync::Arc;

use shotx_core::{ImageId, ProductId};

use crate::error::Result;
use crate::models::Product;
use crate::services::blob::BlobStore;
use crate::store::ProductStore;

/// Product image operations.
pub struct ImageService {
    products: Arc<ProductStore>,
    blobs: Arc<dyn BlobStore>,
}

impl ImageService {
    /// Create the service over the given product table and blob store.
    #[must_use]
    pub fn new(products: Arc<ProductStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { products, blobs }
    }

    /// Store an uploaded image and append it to the product's gallery.
    ///
    /// The new image lands at the end of the display order. If
    /// `is_primary` is set (or the gallery was empty) it becomes the
    /// primary image and the previous primary is demoted.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the blob cannot be written, `NotFound` if the
    /// product does not exist (the stored blob is released again).
    pub async fn add_image(
        &self,
        product_id: ProductId,
        bytes: &[u8],
        content_type: &str,
        is_primary: bool,
    ) -> Result<Product> {
        let url = self.blobs.store(bytes, content_type).await?;
        match self.products.add_image(product_id, url.clone(), is_primary).await {
            Ok(product) => {
                tracing::info!(%product_id, url, is_primary, "product image added");
                Ok(product)
            }
            Err(err) => {
                // The product vanished between upload and attach; don't
                // leak the blob.
                if let Err(remove_err) = self.blobs.remove(&url).await {
                    tracing::warn!(url, error = %remove_err, "failed to release orphaned blob");
                }
                Err(err)
            }
        }
    }

    /// Make exactly the chosen image primary.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the product or image is missing, `NotOwned`
    /// if the image belongs to a different product.
    pub async fn set_primary(&self, product_id: ProductId, image_id: ImageId) -> Result<Product> {
        let product = self.products.set_primary_image(product_id, image_id).await?;
        tracing::info!(%product_id, %image_id, "primary image changed");
        Ok(product)
    }

    /// Delete an image, promoting a successor primary and renumbering the
    /// gallery. Blob removal is best-effort: a stale file is logged, not
    /// surfaced.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the product or image is missing, `NotOwned`
    /// if the image belongs to a different product.
    pub async fn delete_image(&self, product_id: ProductId, image_id: ImageId) -> Result<Product> {
        let (product, removed_url) = self.products.remove_image(product_id, image_id).await?;
        if let Err(err) = self.blobs.remove(&removed_url).await {
            tracing::warn!(url = removed_url, error = %err, "could not delete image blob");
        }
        tracing::info!(%product_id, %image_id, "product image deleted");
        Ok(product)
    }

    /// Reassign display order to match the given sequence.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the product does not exist, `Mismatch` unless
    /// the ids name exactly the product's current images.
    pub async fn reorder(&self, product_id: ProductId, ordered: &[ImageId]) -> Result<Product> {
        self.products.reorder_images(product_id, ordered).await
    }
}
