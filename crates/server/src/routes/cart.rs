//! Cart route handlers.
//!
//! Carts work for signed-in users and anonymous shoppers alike; see
//! [`CartIdentity`]. Every cart response carries the anonymous token (if
//! any) in the `X-Session-ID` header and in `sessionId`, so a token issued
//! by the server reaches the client.

use axum::{
    Router,
    extract::State,
    http::HeaderValue,
    response::{IntoResponse, Response},
    routing::{get, put},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use cartline_core::{CartId, Money, ProductId};

use super::extract::{ApiJson, ApiPath};
use super::response::ApiResponse;
use crate::error::AppError;
use crate::middleware::{CartIdentity, SESSION_ID_HEADER};
use crate::models::{Cart, LineItem};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(show).delete(clear))
        .route("/items", axum::routing::post(add_item))
        .route("/items/{product_id}", put(update_item).delete(remove_item))
}

/// Cart as returned to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub id: CartId,
    /// Anonymous token owning the cart; `None` for a user's cart.
    pub session_id: Option<String>,
    pub items: Vec<LineItem>,
    pub total_amount: Money,
    pub item_count: u32,
    pub expires_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Cart> for CartView {
    fn from(cart: Cart) -> Self {
        Self {
            id: cart.id,
            session_id: cart.owner.session_token().map(|t| t.as_str().to_owned()),
            item_count: cart.item_count(),
            items: cart.items,
            total_amount: cart.total_amount,
            expires_at: cart.expires_at,
            updated_at: cart.updated_at,
        }
    }
}

/// A cart response with the `X-Session-ID` header.
pub struct CartResponse {
    cart: CartView,
    message: Option<&'static str>,
}

impl CartResponse {
    fn new(cart: Cart) -> Self {
        Self {
            cart: cart.into(),
            message: None,
        }
    }

    const fn with_message(mut self, message: &'static str) -> Self {
        self.message = Some(message);
        self
    }
}

impl IntoResponse for CartResponse {
    fn into_response(self) -> Response {
        let token = self
            .cart
            .session_id
            .as_deref()
            .and_then(|t| HeaderValue::from_str(t).ok());

        let body = match self.message {
            Some(message) => ApiResponse::with_message(message, self.cart),
            None => ApiResponse::data(self.cart),
        };
        let mut response = body.into_response();
        if let Some(token) = token {
            response.headers_mut().insert(SESSION_ID_HEADER, token);
        }
        response
    }
}

/// Add item request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: ProductId,
    #[serde(default = "one")]
    pub quantity: i64,
}

const fn one() -> i64 {
    1
}

/// Update quantity request body.
#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i64,
}

/// GET /api/cart
///
/// Returns the caller's cart, creating an empty one if needed.
#[instrument(skip_all)]
async fn show(
    State(state): State<AppState>,
    CartIdentity(identity): CartIdentity,
) -> Result<CartResponse, AppError> {
    let cart = state.carts().get_or_create(&identity).await?;
    Ok(CartResponse::new(cart))
}

/// POST /api/cart/items
#[instrument(skip_all, fields(product_id = %request.product_id, quantity = request.quantity))]
async fn add_item(
    State(state): State<AppState>,
    CartIdentity(identity): CartIdentity,
    ApiJson(request): ApiJson<AddItemRequest>,
) -> Result<CartResponse, AppError> {
    let cart = state
        .carts()
        .add_item(&identity, request.product_id, request.quantity)
        .await?;
    Ok(CartResponse::new(cart).with_message("Item added to cart"))
}

/// PUT /api/cart/items/{product_id}
///
/// A quantity of zero removes the line.
#[instrument(skip_all, fields(product_id = %product_id, quantity = request.quantity))]
async fn update_item(
    State(state): State<AppState>,
    CartIdentity(identity): CartIdentity,
    ApiPath(product_id): ApiPath<ProductId>,
    ApiJson(request): ApiJson<UpdateQuantityRequest>,
) -> Result<CartResponse, AppError> {
    let cart = state
        .carts()
        .update_item_quantity(&identity, product_id, request.quantity)
        .await?;
    Ok(CartResponse::new(cart).with_message("Cart updated"))
}

/// DELETE /api/cart/items/{product_id}
#[instrument(skip_all, fields(product_id = %product_id))]
async fn remove_item(
    State(state): State<AppState>,
    CartIdentity(identity): CartIdentity,
    ApiPath(product_id): ApiPath<ProductId>,
) -> Result<CartResponse, AppError> {
    let cart = state.carts().remove_item(&identity, product_id).await?;
    Ok(CartResponse::new(cart).with_message("Item removed from cart"))
}

/// DELETE /api/cart
#[instrument(skip_all)]
async fn clear(
    State(state): State<AppState>,
    CartIdentity(identity): CartIdentity,
) -> Result<CartResponse, AppError> {
    let cart = state.carts().clear(&identity).await?;
    Ok(CartResponse::new(cart).with_message("Cart cleared"))
}
