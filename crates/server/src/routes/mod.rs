//! HTTP routes for the cart, checkout and order API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness
//! GET  /health/ready                    - Readiness (storage ping)
//!
//! # Auth (register and login are rate limited)
//! POST /api/auth/register               - Create an account and sign in
//! POST /api/auth/login                  - Sign in
//! POST /api/auth/logout                 - Sign out
//! GET  /api/auth/me                     - Current user
//!
//! # Catalog
//! GET  /api/products                    - Active products (filters, paging)
//! GET  /api/products/categories         - Distinct categories
//! GET  /api/products/{id}               - One active product
//! POST /api/products                    - Create (admin)
//! PUT  /api/products/{id}               - Update (admin)
//! DELETE /api/products/{id}             - Deactivate (admin)
//!
//! # Cart (user session or X-Session-ID)
//! GET    /api/cart                      - Current cart
//! POST   /api/cart/items                - Add a product
//! PUT    /api/cart/items/{product_id}   - Set quantity (0 removes)
//! DELETE /api/cart/items/{product_id}   - Remove a line
//! DELETE /api/cart                      - Empty the cart
//!
//! # Orders (requires auth)
//! POST /api/orders                      - Checkout
//! GET  /api/orders                      - Own orders, newest first
//! GET  /api/orders/{id}                 - One own order
//! PUT  /api/orders/{id}/cancel          - Cancel a pending or confirmed order
//!
//! # Admin (requires admin role)
//! GET  /api/admin/orders                - All orders, optional status filter
//! PUT  /api/admin/orders/{id}/status    - Move an order through its lifecycle
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod extract;
pub mod health;
pub mod orders;
pub mod products;
pub mod response;

use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    routing::{get, post},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::SessionStore;

use crate::config::ServerConfig;
use crate::middleware::{
    REQUEST_ID_HEADER, SESSION_ID_HEADER, auth_rate_limiter, create_session_layer,
    make_request_span, request_id_middleware,
};
use crate::state::AppState;

/// Create the auth routes router.
///
/// Only `register` and `login` sit behind the rate limiter.
fn auth_routes(config: &ServerConfig) -> Router<AppState> {
    let credentials = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let credentials = if config.rate_limit {
        if let Some(limiter) = auth_rate_limiter() {
            credentials.layer(limiter)
        } else {
            tracing::warn!("Auth rate limiter could not be built; continuing without it");
            credentials
        }
    } else {
        credentials
    };

    credentials
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}

/// All `/api` routes.
fn api_routes(config: &ServerConfig) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes(config))
        .nest("/products", products::routes())
        .nest("/cart", cart::routes())
        .nest("/orders", orders::routes())
        .nest("/admin", admin::routes())
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let session_id = HeaderName::from_static(SESSION_ID_HEADER);
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, session_id.clone()])
        .expose_headers([session_id, request_id])
}

/// Build the full application: routes, middleware and state.
///
/// The session store is a parameter so tests can run on tower-sessions'
/// `MemoryStore` while production uses `PostgreSQL`.
pub fn app<Store>(state: AppState, store: Store) -> Router
where
    Store: SessionStore + Clone,
{
    let config = state.config();
    let session_layer = create_session_layer(store, config.secure_cookies());
    let cors = cors_layer(config);

    Router::new()
        .merge(health::routes())
        .nest("/api", api_routes(config))
        .layer(session_layer)
        .layer(cors)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span::<axum::body::Body>))
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;
    use tower_sessions::MemoryStore;

    use super::*;
    use crate::db::Repositories;

    fn test_app(config: ServerConfig) -> Router {
        app(
            AppState::new(config, Repositories::memory()),
            MemoryStore::default(),
        )
    }

    #[tokio::test]
    async fn test_health_carries_request_id() {
        let response = test_app(ServerConfig::for_memory())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    }

    #[tokio::test]
    async fn test_orders_require_sign_in() {
        let response = test_app(ServerConfig::for_memory())
            .oneshot(Request::get("/api/orders").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_cors_preflight_allows_session_header() {
        let mut config = ServerConfig::for_memory();
        config.cors_origins = vec!["http://shop.example.com".to_string()];

        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/cart/items")
            .header(header::ORIGIN, "http://shop.example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, SESSION_ID_HEADER)
            .body(Body::empty())
            .unwrap();
        let response = test_app(config).oneshot(request).await.unwrap();

        let headers = response.headers();
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://shop.example.com"
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
            "true"
        );
    }

    #[tokio::test]
    async fn test_unknown_origin_gets_no_cors_headers() {
        let request = Request::get("/health")
            .header(header::ORIGIN, "http://evil.example.com")
            .body(Body::empty())
            .unwrap();
        let response = test_app(ServerConfig::for_memory())
            .oneshot(request)
            .await
            .unwrap();
        assert!(
            !response
                .headers()
                .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        );
    }
}
