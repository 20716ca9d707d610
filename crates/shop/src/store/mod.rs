//! In-memory backing stores.
//!
//! Each store wraps its table in a single `tokio::sync::RwLock`; a write
//! guard held from first read to last write makes every mutation one
//! atomic transaction. This is deliberately coarser than row-level locking
//! but gives the same serializable-per-entity guarantee the core requires.

pub mod products;

pub use products::ProductStore;
