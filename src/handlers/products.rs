use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
};
use crate::{
    errors::ApiError,
    services::catalog::{CreateProductInput, ProductFilter, UpdateProductInput},
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Public catalog browsing endpoints.
pub fn catalog_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/categories", get(list_categories))
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
        .route("/products/:id/availability", get(check_availability))
}

/// Staff-gated catalog maintenance endpoints.
pub fn catalog_admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/categories", post(create_category))
        .route("/products", post(create_product))
        .route("/products/:id", put(update_product))
        .route("/products/:id", delete(delete_product))
}

async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let categories = state
        .services
        .catalog
        .list_categories()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(categories))
}

async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ProductFilter>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let products = state
        .services
        .catalog
        .list_products(filter)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(products))
}

async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let product = state
        .services
        .catalog
        .get_product(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(product))
}

#[derive(Debug, Deserialize)]
struct AvailabilityQuery {
    #[serde(default = "default_quantity")]
    quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

async fn check_availability(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let status = state
        .services
        .catalog
        .check_availability(id, query.quantity)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(status))
}

#[derive(Debug, Deserialize, Validate)]
struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    name: String,
}

async fn create_category(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;
    let category = state
        .services
        .catalog
        .create_category(payload.name)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(category))
}

async fn create_product(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateProductInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let product = state
        .services
        .catalog
        .create_product(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(product))
}

async fn update_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let product = state
        .services
        .catalog
        .update_product(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(product))
}

async fn delete_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .catalog
        .delete_product(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
