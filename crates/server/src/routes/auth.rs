//! Account route handlers.
//!
//! Sign-in state lives in the server-side session; the client only holds the
//! session cookie.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::extract::ApiJson;
use super::response::ApiResponse;
use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::Registration;
use crate::state::AppState;

/// Login request body.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

async fn sign_in(session: &Session, user: &User) -> Result<(), AppError> {
    let current = CurrentUser {
        id: user.id,
        email: user.email.clone(),
        role: user.role,
    };
    set_current_user(session, &current).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

/// POST /api/auth/register
///
/// Creates a customer account and signs it in.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    ApiJson(input): ApiJson<Registration>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.auth().register(input).await?;
    sign_in(&session, &user).await?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("Registration successful", user),
    ))
}

/// POST /api/auth/login
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<ApiResponse<User>, AppError> {
    let user = match state.auth().login(&request.email, &request.password).await {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(error = %e, "login failed");
            return Err(e.into());
        }
    };
    sign_in(&session, &user).await?;
    tracing::info!(user_id = %user.id, "user signed in");

    Ok(ApiResponse::with_message("Login successful", user))
}

/// POST /api/auth/logout
#[instrument(skip_all)]
pub async fn logout(session: Session) -> Result<ApiResponse<()>, AppError> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(ApiResponse::message("Logged out"))
}

/// GET /api/auth/me
#[instrument(skip_all, fields(user_id = %current.id))]
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<ApiResponse<User>, AppError> {
    let user = state.auth().get_user(current.id).await?;
    Ok(ApiResponse::data(user))
}
