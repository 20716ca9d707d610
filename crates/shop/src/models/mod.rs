//! Domain models for the shop core.
//!
//! Parents own their children outright: a `Cart` owns its `CartItem`s, an
//! `Order` owns its `OrderItem`s and a `Product` owns its `ProductImage`s.
//! Children never outlive their owner and are never reassigned.

pub mod cart;
pub mod order;
pub mod product;

pub use cart::{Cart, CartItem};
pub use order::{Order, OrderItem};
pub use product::{NewProduct, Product, ProductImage, ProductUpdate};
