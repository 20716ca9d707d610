//! Service layer: the operations exposed to callers.
//!
//! These are the sole mutation surface over orders, carts, stock and
//! product images. The API layer (out of scope here) maps them onto HTTP.

pub mod blob;
pub mod cart;
pub mod images;
pub mod inventory;
pub mod orders;
pub mod payment;
pub mod pricing;

pub use blob::{BlobStore, FsBlobStore};
pub use cart::CartService;
pub use images::ImageService;
pub use inventory::StockLedger;
pub use orders::OrderService;
pub use payment::{PaymentGateway, StripeGateway};
