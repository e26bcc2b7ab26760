//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::db::Repositories;
use crate::services::{
    AuthService, CartService, CatalogService, Clock, OrderEngine, PaymentGateway,
    SimulatedPayment, SystemClock,
};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the configuration, the storage bundle and the services built on it.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    repos: Repositories,
    catalog: CatalogService,
    carts: CartService,
    orders: OrderEngine,
    auth: AuthService,
}

impl AppState {
    /// Create application state on the wall clock with simulated payments.
    #[must_use]
    pub fn new(config: ServerConfig, repos: Repositories) -> Self {
        Self::with_parts(config, repos, Arc::new(SystemClock), Arc::new(SimulatedPayment))
    }

    /// Create application state with an explicit clock and payment gateway.
    #[must_use]
    pub fn with_parts(
        config: ServerConfig,
        repos: Repositories,
        clock: Arc<dyn Clock>,
        payments: Arc<dyn PaymentGateway>,
    ) -> Self {
        let catalog = CatalogService::new(Arc::clone(&repos.products));
        let carts = CartService::new(
            Arc::clone(&repos.carts),
            Arc::clone(&repos.products),
            clock,
            config.cart_ttl,
        );
        let orders = OrderEngine::new(
            Arc::clone(&repos.orders),
            Arc::clone(&repos.products),
            carts.clone(),
            payments,
        );
        let auth = AuthService::new(Arc::clone(&repos.users));

        Self {
            inner: Arc::new(AppStateInner {
                config,
                repos,
                catalog,
                carts,
                orders,
                auth,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the repository bundle.
    #[must_use]
    pub fn repos(&self) -> &Repositories {
        &self.inner.repos
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    #[must_use]
    pub fn carts(&self) -> &CartService {
        &self.inner.carts
    }

    #[must_use]
    pub fn orders(&self) -> &OrderEngine {
        &self.inner.orders
    }

    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }
}
