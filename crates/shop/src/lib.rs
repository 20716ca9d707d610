//! ShotX Shop - order, payment and inventory core.
//!
//! This crate owns the rules that turn a cart into a priced order, move an
//! order through its payment states, and keep product stock consistent with
//! those states. Everything else the shop needs (catalog browsing, user
//! profiles, authentication) is ordinary data access handled by external
//! collaborators.
//!
//! # Components
//!
//! - [`store::products::ProductStore`] - catalog rows, per-product stock
//!   counts and image collections, mutated atomically
//! - [`services::inventory::StockLedger`] - check-and-decrement over stock
//! - [`services::cart::CartService`] - one active cart per user
//! - [`services::pricing`] - priced, immutable order snapshots
//! - [`services::orders::OrderService`] - the payment state machine
//! - [`services::images::ImageService`] - the "at most one primary image"
//!   invariant
//! - [`services::payment`] - Stripe payment-intent creation and webhook
//!   verification
//!
//! # Concurrency
//!
//! Each public operation runs as one atomic step against the backing
//! tables: every read-modify-write sequence holds the owning table's write
//! lock from first read to last write. Cross-table operations always lock
//! carts/orders before products, so lock order is total and deadlock-free.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod store;

pub use error::{Result, ShopError};
pub use state::Shop;
