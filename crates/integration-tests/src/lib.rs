//! End-to-end tests for Cartline.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process server on the memory backend
//! cargo test -p cartline-integration-tests
//!
//! # Also the PostgreSQL repository tests (needs a scratch database)
//! CARTLINE_TEST_DATABASE_URL=postgres://localhost/cartline_test \
//!     cargo test -p cartline-integration-tests -- --include-ignored
//! ```
//!
//! [`TestApp::spawn`] starts the real router on `127.0.0.1:0` with in-memory
//! repositories, a [`ManualClock`] and tower-sessions' `MemoryStore`, so each
//! test gets an isolated server it can talk to over HTTP.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc)]

use std::net::SocketAddr;
use std::sync::Arc;

use cartline_core::{Email, Money, UserRole};
use cartline_server::config::ServerConfig;
use cartline_server::db::Repositories;
use cartline_server::models::{NewProduct, Product};
use cartline_server::routes;
use cartline_server::services::{Clock, ManualClock, SimulatedPayment};
use cartline_server::state::AppState;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tower_sessions::MemoryStore;

/// Password used for every account the helpers register.
pub const TEST_PASSWORD: &str = "correct horse battery";

/// A running server plus handles on its storage and clock.
pub struct TestApp {
    pub base_url: String,
    /// Client with its own cookie jar.
    pub client: Client,
    pub clock: Arc<ManualClock>,
    pub repos: Repositories,
    server: JoinHandle<()>,
}

impl TestApp {
    /// Start a fresh server.
    pub async fn spawn() -> Self {
        let repos = Repositories::memory();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let state = AppState::with_parts(
            ServerConfig::for_memory(),
            repos.clone(),
            Arc::clone(&clock) as Arc<dyn Clock>,
            Arc::new(SimulatedPayment),
        );
        let app = routes::app(state, MemoryStore::default());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");

        let server = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("Test server failed");
        });

        Self {
            base_url: format!("http://{addr}"),
            client: Self::new_client(),
            clock,
            repos,
            server,
        }
    }

    /// A client with an empty cookie jar (a different browser).
    #[must_use]
    pub fn new_client() -> Client {
        Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to create HTTP client")
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Insert an active product directly into storage.
    pub async fn seed_product(&self, name: &str, cents: u32, stock: u32) -> Product {
        self.repos
            .products
            .create(&NewProduct {
                name: name.to_owned(),
                description: format!("{name} description"),
                price: Money::from_cents(cents),
                category: "test".to_owned(),
                image_url: format!("https://img.example.com/{}.png", name.to_lowercase()),
                stock,
            })
            .await
            .expect("Failed to seed product")
    }

    /// Current stock of a product, read from storage.
    pub async fn stock(&self, product: &Product) -> u32 {
        self.repos
            .products
            .find_by_id(product.id)
            .await
            .expect("Failed to read product")
            .expect("Product disappeared")
            .stock
    }

    /// Register `email` through the API; `client` ends up signed in.
    pub async fn register(&self, client: &Client, email: &str) -> Value {
        let resp = client
            .post(self.url("/api/auth/register"))
            .json(&json!({
                "email": email,
                "password": TEST_PASSWORD,
                "firstName": "Test",
                "lastName": "Shopper",
            }))
            .send()
            .await
            .expect("Register request failed");
        assert_eq!(resp.status(), StatusCode::CREATED);
        resp.json().await.expect("Register response was not JSON")
    }

    /// Sign `client` in with [`TEST_PASSWORD`].
    pub async fn login(&self, client: &Client, email: &str) -> reqwest::Response {
        client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": TEST_PASSWORD }))
            .send()
            .await
            .expect("Login request failed")
    }

    /// Register an account, give it the admin role and sign `client` in.
    ///
    /// The role is read into the session at sign-in, so the login comes last.
    pub async fn admin(&self, client: &Client, email: &str) {
        self.register(client, email).await;
        let email_addr = Email::parse(email).expect("Invalid test email");
        self.repos
            .users
            .set_role(&email_addr, UserRole::Admin)
            .await
            .expect("Failed to promote test user");
        let resp = self.login(client, email).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// A complete checkout body.
#[must_use]
pub fn checkout_body() -> Value {
    json!({
        "shippingAddress": {
            "firstName": "Ada",
            "lastName": "Lovelace",
            "address": "12 Analytical Row",
            "city": "London",
            "state": "LDN",
            "zipCode": "N1 9GU",
            "country": "GB",
        },
        "paymentMethod": "credit_card",
    })
}
