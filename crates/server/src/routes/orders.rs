//! Checkout and order history route handlers.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use cartline_core::OrderId;

use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::response::ApiResponse;
use crate::error::AppError;
use crate::middleware::RequireAuth;
use crate::models::Order;
use crate::services::CheckoutRequest;
use crate::state::AppState;

/// Default page size for order listings.
pub const DEFAULT_ORDER_PAGE_SIZE: u32 = 10;

/// Upper bound on order page size.
pub const MAX_ORDER_PAGE_SIZE: u32 = 100;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(checkout))
        .route("/{id}", get(show))
        .route("/{id}/cancel", put(cancel))
}

/// `?page=&limit=` for order listings.
#[derive(Debug, Clone, Deserialize)]
pub struct Pagination {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

const fn first_page() -> u32 {
    1
}

const fn default_limit() -> u32 {
    DEFAULT_ORDER_PAGE_SIZE
}

impl Pagination {
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page.max(1)
    }

    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit.clamp(1, MAX_ORDER_PAGE_SIZE)
    }

    #[must_use]
    pub fn offset(&self) -> u32 {
        (self.page() - 1).saturating_mul(self.limit())
    }
}

/// A page of orders.
#[derive(Debug, Serialize)]
pub struct OrderList {
    pub orders: Vec<Order>,
    pub page: u32,
    pub limit: u32,
}

/// POST /api/orders
///
/// Checks out the signed-in user's cart.
#[instrument(skip_all, fields(user_id = %user.id))]
async fn checkout(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(request): ApiJson<CheckoutRequest>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.orders().create_order(user.id, request).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("Order created successfully", order),
    ))
}

/// GET /api/orders?page=&limit=
#[instrument(skip_all, fields(user_id = %user.id, page = pagination.page))]
async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiQuery(pagination): ApiQuery<Pagination>,
) -> Result<ApiResponse<OrderList>, AppError> {
    let orders = state
        .orders()
        .list_user_orders(user.id, pagination.limit(), pagination.offset())
        .await?;
    Ok(ApiResponse::data(OrderList {
        orders,
        page: pagination.page(),
        limit: pagination.limit(),
    }))
}

/// GET /api/orders/{id}
#[instrument(skip_all, fields(user_id = %user.id, order_id = %id))]
async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<ApiResponse<Order>, AppError> {
    Ok(ApiResponse::data(state.orders().get_order(id, user.id).await?))
}

/// PUT /api/orders/{id}/cancel
#[instrument(skip_all, fields(user_id = %user.id, order_id = %id))]
async fn cancel(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<ApiResponse<Order>, AppError> {
    let order = state.orders().cancel_order(id, user.id).await?;
    Ok(ApiResponse::with_message("Order cancelled", order))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_bounds() {
        let p = Pagination { page: 0, limit: 0 };
        assert_eq!((p.page(), p.limit(), p.offset()), (1, 1, 0));

        let p = Pagination {
            page: 3,
            limit: 500,
        };
        assert_eq!((p.limit(), p.offset()), (100, 200));
    }
}
