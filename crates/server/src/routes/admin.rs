//! Admin order management.

use axum::{
    Router,
    extract::State,
    routing::{get, put},
};
use serde::Deserialize;
use tracing::instrument;

use cartline_core::{OrderId, OrderStatus};

use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::orders::{OrderList, Pagination};
use super::response::ApiResponse;
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::Order;
use crate::state::AppState;

/// Default page size for the admin order listing.
const ADMIN_PAGE_SIZE: u32 = 50;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/{id}/status", put(update_status))
}

/// `?status=&page=&limit=`
#[derive(Debug, Deserialize)]
pub struct AdminOrderQuery {
    pub status: Option<OrderStatus>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl AdminOrderQuery {
    fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page.unwrap_or(1),
            limit: self.limit.unwrap_or(ADMIN_PAGE_SIZE),
        }
    }
}

/// Status change request body.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

/// GET /api/admin/orders
#[instrument(skip_all, fields(admin_id = %admin.id, status = ?query.status))]
async fn list_orders(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiQuery(query): ApiQuery<AdminOrderQuery>,
) -> Result<ApiResponse<OrderList>, AppError> {
    let pagination = query.pagination();
    let orders = state
        .orders()
        .list_all(query.status, pagination.limit(), pagination.offset())
        .await?;
    Ok(ApiResponse::data(OrderList {
        orders,
        page: pagination.page(),
        limit: pagination.limit(),
    }))
}

/// PUT /api/admin/orders/{id}/status
#[instrument(skip_all, fields(admin_id = %admin.id, order_id = %id, to = %update.status))]
async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(update): ApiJson<StatusUpdate>,
) -> Result<ApiResponse<Order>, AppError> {
    let order = state.orders().update_status(id, update.status).await?;
    Ok(ApiResponse::with_message("Order status updated", order))
}
