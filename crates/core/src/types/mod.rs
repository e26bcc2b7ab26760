//! Core types for Cartline.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod money;
pub mod order_number;
pub mod session;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::{Money, MoneyError};
pub use order_number::{OrderNumber, OrderNumberGenerator};
pub use session::{SessionToken, SessionTokenError};
pub use status::*;
