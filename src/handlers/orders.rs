use crate::handlers::common::{map_service_error, success_response};
use crate::{
    auth::AuthUser,
    entities::order::OrderStatus,
    errors::ApiError,
    services::{checkout::PlaceOrderInput, orders::CustomerOrderAction},
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    routing::{get, post, put},
    Extension, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Customer-facing order endpoints, checkout included.
pub fn order_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/checkout", post(checkout))
        .route("/", get(list_orders))
        .route("/:id", get(get_order))
        .route("/:id/status", put(update_status))
}

/// Staff-gated order management endpoints.
pub fn order_admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/:id/status", put(admin_update_status))
        .route("/:id/paid", post(mark_paid))
}

/// Place an order from the caller's cart
async fn checkout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<PlaceOrderInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let placed = state
        .services
        .checkout
        .place_order(user.customer_id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(placed))
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let orders = state
        .services
        .orders
        .list_orders(user.customer_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(orders))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .get_order(user.customer_id, id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

#[derive(Debug, Deserialize)]
struct CustomerStatusRequest {
    action: CustomerOrderAction,
}

/// Customer cancel / return-request transitions
async fn update_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CustomerStatusRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .customer_update_status(user.customer_id, id, payload.action)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

#[derive(Debug, Deserialize)]
struct AdminStatusRequest {
    status: OrderStatus,
}

async fn admin_update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdminStatusRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .admin_update_status(id, payload.status)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

async fn mark_paid(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .mark_paid(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}
