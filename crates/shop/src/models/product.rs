//! Product and product image models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shotx_core::{ImageId, ProductId};

/// A catalog product with its stock count and ordered image collection.
///
/// Invariants maintained by [`crate::store::products::ProductStore`]:
/// - `price` always carries exactly two fractional digits
/// - at most one image has `is_primary` set
/// - `images` is sorted by `display_order`, contiguous from 0
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    /// Units available for sale. Never negative; decremented only when an
    /// order transitions to `PAID`.
    pub stock: u32,
    /// Legacy single-image reference, kept in sync with the primary image.
    pub image_url: Option<String>,
    pub images: Vec<ProductImage>,
}

impl Product {
    /// The image currently flagged as primary, if any.
    #[must_use]
    pub fn primary_image(&self) -> Option<&ProductImage> {
        self.images.iter().find(|img| img.is_primary)
    }

    /// Look up an owned image by id.
    #[must_use]
    pub fn image(&self, image_id: ImageId) -> Option<&ProductImage> {
        self.images.iter().find(|img| img.id == image_id)
    }
}

/// One image belonging to a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductImage {
    pub id: ImageId,
    pub image_url: String,
    pub is_primary: bool,
    /// Position in the product's gallery; unique and contiguous per product.
    pub display_order: u32,
}

/// Input for creating a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: u32,
}

/// Input for updating a product.
///
/// `stock` and `image_url` are only written when present, matching the
/// partial-update behavior of the catalog API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<u32>,
    pub image_url: Option<String>,
}
