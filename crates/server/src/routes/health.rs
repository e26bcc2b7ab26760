//! Liveness and readiness probes.

use axum::{Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};

use super::response::ApiResponse;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
}

/// Liveness health check endpoint.
///
/// Returns OK if the server is running. Does not check dependencies.
async fn health() -> ApiResponse<()> {
    ApiResponse::message("ok")
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if storage is not reachable.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    match state.repos().ping().await {
        Ok(()) => (StatusCode::OK, ApiResponse::message("ready")),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiResponse::error("storage unavailable"),
            )
        }
    }
}
