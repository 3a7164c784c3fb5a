use crate::handlers::common::{map_service_error, success_response};
use crate::{auth::AuthUser, errors::ApiError, AppState};
use axum::{
    extract::{Json, State},
    routing::{get, post},
    Extension, Router,
};
use serde::Deserialize;
use std::sync::Arc;

/// Loyalty account endpoints
pub fn account_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/points", get(get_points))
        .route("/points/history", get(points_history))
        .route("/redeem-points", post(redeem_points))
        .route("/vouchers", get(list_vouchers))
}

async fn get_points(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let summary = state
        .services
        .points
        .get_summary(user.customer_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(summary))
}

async fn points_history(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let history = state
        .services
        .points
        .history(user.customer_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(history))
}

#[derive(Debug, Deserialize)]
struct RedeemRequest {
    points: i64,
}

/// Exchange points for vouchers; returns the minted voucher codes
async fn redeem_points(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<RedeemRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let vouchers = state
        .services
        .points
        .redeem(user.customer_id, payload.points)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(vouchers))
}

async fn list_vouchers(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let vouchers = state
        .services
        .points
        .list_vouchers(user.customer_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(vouchers))
}
