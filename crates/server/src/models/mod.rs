//! Domain models for the cart, order and catalog core.
//!
//! These types are storage-agnostic: both the `PostgreSQL` and in-memory
//! repositories convert their rows into these structs. Cart mutation rules
//! live on [`cart::Cart`] so every backend applies them identically.

pub mod address;
pub mod cart;
pub mod line_item;
pub mod order;
pub mod product;
pub mod session;
pub mod user;

pub use address::Address;
pub use cart::{Cart, CartMutation, CartOwner, CartRuleError};
pub use line_item::LineItem;
pub use order::{NewOrder, Order};
pub use product::{NewProduct, Product, ProductFilter, ProductPage, ProductUpdate};
pub use session::{CurrentUser, session_keys};
pub use user::{NewUser, User};
