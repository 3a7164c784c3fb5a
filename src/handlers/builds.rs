use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response,
};
use crate::{
    auth::AuthUser,
    errors::ApiError,
    services::builds::{BuildLineInput, CreateBuildInput},
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    routing::{delete, get, post, put},
    Extension, Router,
};
use std::sync::Arc;
use uuid::Uuid;

/// Creates the router for custom build endpoints
pub fn build_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_build))
        .route("/", get(list_builds))
        .route("/:id", get(get_build))
        .route("/:id", delete(delete_build))
        .route("/:id/items", put(replace_build_items))
        .route("/:id/validate", get(validate_build))
}

async fn create_build(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateBuildInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let build = state
        .services
        .builds
        .create_build(user.customer_id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(build))
}

async fn list_builds(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let builds = state
        .services
        .builds
        .list_builds(user.customer_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(builds))
}

async fn get_build(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let build = state
        .services
        .builds
        .get_build(user.customer_id, id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(build))
}

async fn replace_build_items(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<Vec<BuildLineInput>>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let build = state
        .services
        .builds
        .replace_build_items(user.customer_id, id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(build))
}

async fn delete_build(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .builds
        .delete_build(user.customer_id, id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

/// Check a build against the required component slots
async fn validate_build(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let report = state
        .services
        .builds
        .validate_build(user.customer_id, id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(report))
}
