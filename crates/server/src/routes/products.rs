//! Catalog route handlers.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use tracing::instrument;

use cartline_core::ProductId;

use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::response::ApiResponse;
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::{NewProduct, Product, ProductFilter, ProductPage, ProductUpdate};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/categories", get(categories))
        .route("/{id}", get(show).put(update).delete(deactivate))
}

/// GET /api/products?category=&search=&page=&limit=
#[instrument(skip(state))]
async fn list(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<ProductFilter>,
) -> Result<ApiResponse<ProductPage>, AppError> {
    Ok(ApiResponse::data(state.catalog().list(&filter).await?))
}

/// GET /api/products/categories
async fn categories(State(state): State<AppState>) -> Result<ApiResponse<Vec<String>>, AppError> {
    Ok(ApiResponse::data(state.catalog().categories().await?))
}

/// GET /api/products/{id}
#[instrument(skip(state))]
async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<ApiResponse<Product>, AppError> {
    Ok(ApiResponse::data(state.catalog().get(id).await?))
}

/// POST /api/products (admin)
#[instrument(skip_all, fields(admin_id = %admin.id))]
async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(input): ApiJson<NewProduct>,
) -> Result<impl IntoResponse, AppError> {
    let product = state.catalog().create(&input).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("Product created", product),
    ))
}

/// PUT /api/products/{id} (admin)
#[instrument(skip_all, fields(admin_id = %admin.id, product_id = %id))]
async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(update): ApiJson<ProductUpdate>,
) -> Result<ApiResponse<Product>, AppError> {
    let product = state.catalog().update(id, &update).await?;
    Ok(ApiResponse::with_message("Product updated", product))
}

/// DELETE /api/products/{id} (admin)
///
/// Soft delete: the product disappears from the catalog but order history
/// keeps its snapshot.
#[instrument(skip_all, fields(admin_id = %admin.id, product_id = %id))]
async fn deactivate(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<ApiResponse<()>, AppError> {
    state.catalog().deactivate(id).await?;
    Ok(ApiResponse::message("Product deleted"))
}
