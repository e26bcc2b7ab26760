//! Cartline Core - Shared domain types.
//!
//! This crate provides the types shared by every Cartline component:
//! - `server` - JSON API for catalog, carts, checkout and orders
//! - `cli` - Command-line tools for migrations, seeding and maintenance
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no database
//! access, no HTTP. The order status state machine lives here so that every
//! storage backend and every caller agrees on the legal transitions.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, money, emails, session tokens, order numbers and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
