//! Core types for the ShotX shop.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod money;
pub mod status;
pub mod username;

pub use id::*;
pub use money::{round_money, to_minor_units};
pub use status::PaymentStatus;
pub use username::{Username, UsernameError};
