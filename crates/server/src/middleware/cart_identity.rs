//! Cart identity extraction.
//!
//! A cart request belongs to the signed-in user if there is one; otherwise to
//! the anonymous session token in the `X-Session-ID` header.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};

use cartline_core::SessionToken;

use super::auth::OptionalAuth;
use crate::routes::response::ApiResponse;
use crate::services::RequestIdentity;

/// The HTTP header carrying the anonymous cart token, in both directions.
pub const SESSION_ID_HEADER: &str = "x-session-id";

/// The identity a cart request acts for.
#[derive(Debug, Clone)]
pub struct CartIdentity(pub RequestIdentity);

/// Rejection for a malformed `X-Session-ID` header.
#[derive(Debug)]
pub struct InvalidSessionId(String);

impl IntoResponse for InvalidSessionId {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            ApiResponse::error(format!("invalid X-Session-ID: {}", self.0)),
        )
            .into_response()
    }
}

impl<S> FromRequestParts<S> for CartIdentity
where
    S: Send + Sync,
{
    type Rejection = InvalidSessionId;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Ok(OptionalAuth(user)) = OptionalAuth::from_request_parts(parts, state).await;

        let session_token = match parts.headers.get(SESSION_ID_HEADER) {
            Some(value) => {
                let raw = value
                    .to_str()
                    .map_err(|_| InvalidSessionId("not valid ASCII".to_string()))?;
                Some(SessionToken::parse(raw).map_err(|e| InvalidSessionId(e.to_string()))?)
            }
            None => None,
        };

        Ok(Self(RequestIdentity {
            user: user.map(|u| u.id),
            session_token,
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    async fn extract(request: Request<()>) -> Result<CartIdentity, InvalidSessionId> {
        let (mut parts, ()) = request.into_parts();
        CartIdentity::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_header_token_is_used() {
        let request = Request::builder()
            .header("X-Session-ID", "abc-123")
            .body(())
            .unwrap();
        let CartIdentity(identity) = extract(request).await.unwrap();
        assert_eq!(identity.user, None);
        assert_eq!(identity.session_token.unwrap().as_str(), "abc-123");
    }

    #[tokio::test]
    async fn test_no_header_is_anonymous() {
        let CartIdentity(identity) = extract(Request::new(())).await.unwrap();
        assert_eq!(identity, RequestIdentity::anonymous());
    }

    #[tokio::test]
    async fn test_blank_header_is_rejected() {
        let request = Request::builder()
            .header("X-Session-ID", "  ")
            .body(())
            .unwrap();
        assert!(extract(request).await.is_err());
    }
}
