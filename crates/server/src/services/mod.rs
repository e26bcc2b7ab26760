//! Business logic services.
//!
//! # Services
//!
//! - `identity` - Resolve a request to exactly one cart owner
//! - `cart` - Cart mutations with advisory stock checks and sliding expiry
//! - `orders` - Checkout, cancellation and the admin status lifecycle
//! - `catalog` - Product reads and admin maintenance
//! - `auth` - Email/password accounts (Argon2id)
//! - `payment` - Payment capture behind a gateway trait
//! - `reaper` - Periodic deletion of expired carts
//!
//! Services are transport-agnostic: they return [`CommerceError`] (or
//! [`AuthError`]) and leave status codes to `crate::error`.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod clock;
pub mod error;
pub mod identity;
pub mod orders;
pub mod payment;
pub mod reaper;

pub use auth::{AuthError, AuthService, Registration};
pub use cart::{CartService, DEFAULT_CART_TTL_HOURS};
pub use catalog::CatalogService;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::CommerceError;
pub use identity::{RequestIdentity, ResolvedIdentity};
pub use orders::{CheckoutRequest, OrderEngine};
pub use payment::{PaymentGateway, PaymentOutcome, SimulatedPayment};
pub use reaper::spawn_cart_reaper;
