use crate::handlers::common::{created_response, map_service_error, success_response};
use crate::{errors::ApiError, services::promotions::CreatePromotionInput, AppState};
use axum::{
    extract::{Json, Path, State},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use uuid::Uuid;

/// Staff-gated promotion management endpoints.
pub fn promotion_admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_promotion))
        .route("/", get(list_promotions))
        .route("/:id/deactivate", post(deactivate_promotion))
}

async fn create_promotion(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreatePromotionInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let promo = state
        .services
        .promotions
        .create_promotion(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(promo))
}

async fn list_promotions(
    State(state): State<Arc<AppState>>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let promos = state
        .services
        .promotions
        .list_promotions()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(promos))
}

async fn deactivate_promotion(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let promo = state
        .services
        .promotions
        .deactivate_promotion(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(promo))
}
