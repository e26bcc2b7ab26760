//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span from [`make_request_span`])
//! 3. Request ID (fills the span's `request_id`, echoes the header)
//! 4. CORS
//! 5. Session layer (tower-sessions)
//! 6. Rate limiting on auth endpoints (governor)
//!
//! Identity is resolved per handler by extractor: [`RequireAuth`],
//! [`RequireAdmin`], [`OptionalAuth`] and [`CartIdentity`].

pub mod auth;
pub mod cart_identity;
pub mod rate_limit;
pub mod request_id;
pub mod session;

pub use auth::{
    AuthRejection, OptionalAuth, RequireAdmin, RequireAuth, clear_current_user, set_current_user,
};
pub use cart_identity::{CartIdentity, SESSION_ID_HEADER};
pub use rate_limit::auth_rate_limiter;
pub use request_id::{REQUEST_ID_HEADER, make_request_span, request_id_middleware};
pub use session::{create_session_layer, postgres_store};
