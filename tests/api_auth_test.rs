//! HTTP-level checks for bearer auth and clearance gating.

mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use common::TestCtx;
use logicbuilders_api::{
    auth::{AuthConfig, AuthService, ClearanceLevel},
    events::EventSender,
    AppState,
};
use serde_json::json;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

struct HttpApp {
    router: Router,
    auth: Arc<AuthService>,
}

impl HttpApp {
    async fn new() -> (TestCtx, Self) {
        let ctx = TestCtx::new().await;

        let (tx, _rx) = mpsc::channel(8);
        let state = Arc::new(AppState {
            db: ctx.db.clone(),
            config: (*ctx.config).clone(),
            event_sender: EventSender::new(tx),
            services: ctx.services.clone(),
        });

        let auth = Arc::new(AuthService::new(AuthConfig::from(&*ctx.config)));
        let router = logicbuilders_api::app_router(state, auth.clone());
        (ctx, Self { router, auth })
    }

    fn token(&self, clearance: Option<ClearanceLevel>) -> String {
        self.auth
            .generate_token(Uuid::new_v4(), None, None, clearance)
            .expect("token")
    }

    async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> StatusCode {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("request")
            .status()
    }
}

#[tokio::test]
async fn status_and_catalog_are_public() {
    let (_ctx, app) = HttpApp::new().await;
    assert_eq!(
        app.request(Method::GET, "/status", None, None).await,
        StatusCode::OK
    );
    assert_eq!(
        app.request(Method::GET, "/api/v1/products", None, None)
            .await,
        StatusCode::OK
    );
}

#[tokio::test]
async fn cart_requires_a_bearer_token() {
    let (_ctx, app) = HttpApp::new().await;
    assert_eq!(
        app.request(Method::GET, "/api/v1/cart", None, None).await,
        StatusCode::UNAUTHORIZED
    );

    let token = app.token(None);
    assert_eq!(
        app.request(Method::GET, "/api/v1/cart", Some(&token), None)
            .await,
        StatusCode::OK
    );
}

#[tokio::test]
async fn garbage_token_is_rejected() {
    let (_ctx, app) = HttpApp::new().await;
    assert_eq!(
        app.request(Method::GET, "/api/v1/cart", Some("not-a-jwt"), None)
            .await,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn admin_catalog_needs_staff_clearance() {
    let (_ctx, app) = HttpApp::new().await;
    let body = json!({"name": "Video Card"});

    let customer = app.token(None);
    assert_eq!(
        app.request(
            Method::POST,
            "/api/v1/admin/catalog/categories",
            Some(&customer),
            Some(body.clone()),
        )
        .await,
        StatusCode::FORBIDDEN
    );

    let staff = app.token(Some(ClearanceLevel::Staff));
    assert_eq!(
        app.request(
            Method::POST,
            "/api/v1/admin/catalog/categories",
            Some(&staff),
            Some(body),
        )
        .await,
        StatusCode::CREATED
    );
}

#[tokio::test]
async fn promotions_need_manager_clearance() {
    let (_ctx, app) = HttpApp::new().await;

    let staff = app.token(Some(ClearanceLevel::Staff));
    assert_eq!(
        app.request(Method::GET, "/api/v1/admin/promotions", Some(&staff), None)
            .await,
        StatusCode::FORBIDDEN
    );

    // Ordered clearance: owner passes every manager gate.
    for level in [ClearanceLevel::Manager, ClearanceLevel::Owner] {
        let token = app.token(Some(level));
        assert_eq!(
            app.request(Method::GET, "/api/v1/admin/promotions", Some(&token), None)
                .await,
            StatusCode::OK
        );
    }
}
