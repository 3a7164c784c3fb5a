pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod services;

use auth::{AuthRouterExt, AuthService, ClearanceLevel};
use axum::{routing::get, Extension, Json, Router};
use chrono::Utc;
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

/// Shared application state available to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

// Common response wrapper for the status and health endpoints
#[derive(Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// All `/api/v1` routes.
///
/// Public catalog browsing needs no token. Customer routes require a valid
/// bearer token. Back-office routes additionally require a clearance tier:
/// catalog and order management are open to staff, promotion management to
/// managers and above.
pub fn api_v1_routes() -> Router<Arc<AppState>> {
    let catalog = handlers::products::catalog_routes();

    let cart = handlers::carts::cart_routes().with_auth();
    let builds = handlers::builds::build_routes().with_auth();
    let orders = handlers::orders::order_routes().with_auth();
    let account = handlers::account::account_routes().with_auth();

    let catalog_admin =
        handlers::products::catalog_admin_routes().with_clearance(ClearanceLevel::Staff);
    let order_admin =
        handlers::orders::order_admin_routes().with_clearance(ClearanceLevel::Staff);
    let promotion_admin =
        handlers::promotions::promotion_admin_routes().with_clearance(ClearanceLevel::Manager);

    Router::new()
        .merge(catalog)
        .nest("/cart", cart)
        .nest("/builds", builds)
        .nest("/orders", orders)
        .nest("/account", account)
        .nest("/admin/catalog", catalog_admin)
        .nest("/admin/orders", order_admin)
        .nest("/admin/promotions", promotion_admin)
}

/// Full application router, shared by the binary and the integration tests.
pub fn app_router(state: Arc<AppState>, auth_service: Arc<AuthService>) -> Router {
    Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .nest("/api/v1", api_v1_routes())
        .layer(Extension(auth_service))
        .with_state(state)
}

async fn api_status() -> Json<ApiResponse<Value>> {
    let status_data = json!({
        "status": "ok",
        "service": "logicbuilders-api",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
    });
    Json(ApiResponse::success(status_data))
}

async fn health_check(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
) -> Json<ApiResponse<Value>> {
    let db_status = match state
        .db
        .execute(Statement::from_string(
            state.db.get_database_backend(),
            "SELECT 1".to_string(),
        ))
        .await
    {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "database": db_status,
        "timestamp": Utc::now().to_rfc3339(),
    });
    Json(ApiResponse::success(health_data))
}
