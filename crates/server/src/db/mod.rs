//! Storage layer for products, carts, orders and users.
//!
//! Services never talk to a database directly. They depend on the repository
//! traits defined here, injected as `Arc<dyn …>` through [`Repositories`].
//! Two backends implement every trait:
//!
//! - [`postgres`] - `PostgreSQL` via sqlx (schema in `crates/server/migrations/`)
//! - [`memory`] - process-local maps, used by tests and `CARTLINE_STORAGE=memory`
//!
//! # Atomicity
//!
//! - [`ProductRepository::adjust_stock`] is a single conditional update; stock
//!   can never go below zero.
//! - [`CartRepository::apply`] is a per-cart read-modify-write that holds a
//!   row lock (or the map's write lock) for its whole duration, so two
//!   mutations of the same cart never interleave.
//! - [`OrderRepository::transition_status`] is compare-and-set on the status.
//!
//! Checkout across several products is *not* atomic as a whole; see
//! `services::orders`.
//!
//! # Migrations
//!
//! ```bash
//! cargo run -p cartline-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use cartline_core::{
    CartId, Email, OrderId, OrderStatus, PaymentStatus, ProductId, UserId, UserRole,
};

use crate::models::{
    Cart, CartMutation, CartOwner, CartRuleError, NewOrder, NewProduct, NewUser, Order, Product,
    ProductFilter, ProductPage, ProductUpdate, User,
};

/// Errors that can occur during repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A stock adjustment would have taken stock below zero.
    #[error("insufficient stock: {available} available")]
    InsufficientStock { available: u32 },

    /// A cart mutation broke a cart rule; nothing was written.
    #[error(transparent)]
    Rejected(#[from] CartRuleError),
}

/// Map a unique-constraint violation to [`RepositoryError::Conflict`].
pub(crate) fn conflict_on_unique(err: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(err)
}

// =============================================================================
// Repository Traits
// =============================================================================

/// Product catalog and the stock ledger.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Insert a product.
    async fn create(&self, input: &NewProduct) -> Result<Product, RepositoryError>;

    /// Fetch an *active* product. Inactive products read as absent.
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// List active products matching the filter, with the total match count.
    async fn list(&self, filter: &ProductFilter) -> Result<ProductPage, RepositoryError>;

    /// Distinct categories of active products, sorted.
    async fn categories(&self) -> Result<Vec<String>, RepositoryError>;

    /// Apply a partial update to any product, active or not.
    ///
    /// Fails with `NotFound` if the product does not exist.
    async fn update(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, RepositoryError>;

    /// Soft delete: mark the product inactive.
    ///
    /// Fails with `NotFound` if the product does not exist.
    async fn deactivate(&self, id: ProductId) -> Result<(), RepositoryError>;

    /// Atomically add `delta` (which may be negative) to a product's stock.
    ///
    /// Works on inactive products too, so cancelled orders can restore stock.
    /// Returns the new stock level. Fails with `NotFound` if the product does
    /// not exist and with `InsufficientStock` if the result would be negative,
    /// in which case stock is unchanged.
    async fn adjust_stock(&self, id: ProductId, delta: i32) -> Result<u32, RepositoryError>;
}

/// One live cart per owner.
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// The owner's cart, unless it is missing or expired.
    async fn find_active(
        &self,
        owner: &CartOwner,
        now: DateTime<Utc>,
    ) -> Result<Option<Cart>, RepositoryError>;

    /// The owner's live cart, creating an empty one if there is none.
    ///
    /// An expired cart that has not been reaped yet is replaced in place by a
    /// fresh empty cart.
    async fn get_or_create(
        &self,
        owner: &CartOwner,
        now: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> Result<Cart, RepositoryError>;

    /// Apply one mutation to a cart atomically and return the stored result.
    ///
    /// If the cart expired since it was resolved, it is emptied before the
    /// mutation is applied. Fails with `NotFound` if the cart no longer
    /// exists and with `Rejected` if a cart rule is broken.
    async fn apply(
        &self,
        cart_id: CartId,
        mutation: CartMutation,
        now: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> Result<Cart, RepositoryError>;

    /// Delete every cart whose expiry is at or before `now`.
    ///
    /// Returns how many carts were removed. Idempotent.
    async fn reap_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError>;
}

/// Orders and their status transitions.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persist a new order with status and payment status `pending`.
    ///
    /// Fails with `Conflict` if the order number is already taken.
    async fn create(&self, order: NewOrder) -> Result<Order, RepositoryError>;

    /// Fetch an order by id.
    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// A user's orders, newest first.
    async fn list_by_user(
        &self,
        user_id: UserId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Order>, RepositoryError>;

    /// All orders, optionally filtered by status, newest first.
    async fn list_all(
        &self,
        status: Option<OrderStatus>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Order>, RepositoryError>;

    /// Move an order to `to` only if its current status is one of `from`.
    ///
    /// Returns the updated order, or `None` if the order exists but its
    /// status did not match. Fails with `NotFound` if the order is missing.
    async fn transition_status(
        &self,
        id: OrderId,
        from: &[OrderStatus],
        to: OrderStatus,
    ) -> Result<Option<Order>, RepositoryError>;

    /// Record the outcome of a payment attempt.
    async fn set_payment_status(
        &self,
        id: OrderId,
        status: PaymentStatus,
    ) -> Result<Order, RepositoryError>;
}

/// Registered users.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user. Fails with `Conflict` if the email is taken.
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError>;

    /// Fetch a user together with their password hash.
    async fn find_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    /// Fetch a user by id.
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Change a user's role. Fails with `NotFound` if no user has that email.
    async fn set_role(&self, email: &Email, role: UserRole) -> Result<User, RepositoryError>;
}

// =============================================================================
// Repository Bundle
// =============================================================================

#[derive(Clone)]
enum Backend {
    Postgres(PgPool),
    Memory,
}

/// The set of repositories a process works against.
///
/// Created once by the entry point and shared by every service.
#[derive(Clone)]
pub struct Repositories {
    pub products: Arc<dyn ProductRepository>,
    pub carts: Arc<dyn CartRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub users: Arc<dyn UserRepository>,
    backend: Backend,
}

impl Repositories {
    /// `PostgreSQL`-backed repositories sharing one pool.
    #[must_use]
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            products: Arc::new(postgres::PgProductRepository::new(pool.clone())),
            carts: Arc::new(postgres::PgCartRepository::new(pool.clone())),
            orders: Arc::new(postgres::PgOrderRepository::new(pool.clone())),
            users: Arc::new(postgres::PgUserRepository::new(pool.clone())),
            backend: Backend::Postgres(pool),
        }
    }

    /// Fresh, empty in-memory repositories.
    #[must_use]
    pub fn memory() -> Self {
        Self {
            products: Arc::new(memory::MemoryProductRepository::default()),
            carts: Arc::new(memory::MemoryCartRepository::default()),
            orders: Arc::new(memory::MemoryOrderRepository::default()),
            users: Arc::new(memory::MemoryUserRepository::default()),
            backend: Backend::Memory,
        }
    }

    /// The underlying pool, when backed by `PostgreSQL`.
    #[must_use]
    pub const fn pool(&self) -> Option<&PgPool> {
        match &self.backend {
            Backend::Postgres(pool) => Some(pool),
            Backend::Memory => None,
        }
    }

    /// Check that the storage backend is reachable.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the database does not answer.
    pub async fn ping(&self) -> Result<(), RepositoryError> {
        if let Backend::Postgres(pool) = &self.backend {
            sqlx::query("SELECT 1").execute(pool).await?;
        }
        Ok(())
    }

    /// Release storage resources. Called once on shutdown.
    pub async fn close(&self) {
        if let Backend::Postgres(pool) = &self.backend {
            pool.close().await;
        }
    }
}

impl std::fmt::Debug for Repositories {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = match self.backend {
            Backend::Postgres(_) => "postgres",
            Backend::Memory => "memory",
        };
        f.debug_struct("Repositories")
            .field("backend", &backend)
            .finish_non_exhaustive()
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
