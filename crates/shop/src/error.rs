//! Unified error taxonomy for the shop core.
//!
//! Every failure a caller can observe maps to exactly one variant here, so
//! an API layer can distinguish "out of stock" from "not your order" from
//! "bad request" without string matching. The core performs no retries;
//! retry policy belongs to the caller.

use thiserror::Error;

use shotx_core::{ImageId, OrderId, PaymentStatus, ProductId};

use crate::services::payment::GatewayError;

/// Error type for all shop core operations.
#[derive(Debug, Error)]
pub enum ShopError {
    /// The referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller does not own the referenced entity.
    #[error("order {order_id} does not belong to {username}")]
    Unauthorized {
        order_id: OrderId,
        username: String,
    },

    /// A quantity was zero (quantities are always at least 1).
    #[error("quantity must be at least 1")]
    InvalidQuantity,

    /// Requested quantity exceeds the available stock.
    #[error(
        "insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// The requested payment status change is not in the transition table.
    #[error("invalid payment status transition: {from} -> {to}")]
    InvalidTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },

    /// A reorder request did not name exactly the product's current images.
    #[error("image ids do not match the images of product {product_id}")]
    Mismatch { product_id: ProductId },

    /// The image belongs to a different product.
    #[error("image {image_id} does not belong to product {product_id}")]
    NotOwned {
        product_id: ProductId,
        image_id: ImageId,
    },

    /// The payment gateway call or webhook verification failed.
    #[error("payment gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Blob storage I/O failed.
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl ShopError {
    /// Stable machine-readable kind, one per variant.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Unauthorized { .. } => "UNAUTHORIZED",
            Self::InvalidQuantity => "INVALID_QUANTITY",
            Self::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::Mismatch { .. } => "MISMATCH",
            Self::NotOwned { .. } => "NOT_OWNED",
            Self::Gateway(_) => "GATEWAY_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }
}

/// Result type alias for `ShopError`.
pub type Result<T> = std::result::Result<T, ShopError>;
