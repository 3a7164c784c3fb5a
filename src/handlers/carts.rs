use crate::handlers::common::{map_service_error, no_content_response, success_response};
use crate::{auth::AuthUser, errors::ApiError, services::carts::AddCartItemInput, AppState};
use axum::{
    extract::{Json, Path, State},
    routing::{delete, get, post, put},
    Extension, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Creates the router for cart endpoints
pub fn cart_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_cart))
        .route("/add", post(add_to_cart))
        .route("/item/:id", put(update_cart_item))
        .route("/item/:id", delete(remove_cart_item))
        .route("/clear", delete(clear_cart))
}

/// Get the caller's cart with items and subtotal
async fn get_cart(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .get_cart_with_items(user.customer_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(cart))
}

/// Add a product or build line to the cart
async fn add_to_cart(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<AddCartItemInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let item = state
        .services
        .cart
        .add_item(user.customer_id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(item))
}

#[derive(Debug, Deserialize)]
struct UpdateQuantityRequest {
    quantity: i32,
}

async fn update_cart_item(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateQuantityRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let item = state
        .services
        .cart
        .update_item_quantity(user.customer_id, id, payload.quantity)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(item))
}

async fn remove_cart_item(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .cart
        .remove_item(user.customer_id, id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

async fn clear_cart(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .cart
        .clear_cart(user.customer_id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
