use axum::http::{header, HeaderValue, Method};
use logicbuilders_api::{
    auth::{AuthConfig, AuthService},
    config, db, events,
    handlers::AppServices,
    AppState,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::load_config()?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    info!(
        environment = %cfg.environment,
        "Starting logicbuilders-api v{}",
        env!("CARGO_PKG_VERSION")
    );

    let db_pool = Arc::new(db::establish_connection_from_app_config(&cfg).await?);
    if cfg.auto_migrate {
        db::run_migrations(&db_pool).await?;
    }

    // Application event channel with a logging consumer.
    let (event_tx, event_rx) = mpsc::channel(cfg.event_channel_capacity);
    let event_sender = events::EventSender::new(event_tx);
    tokio::spawn(events::process_events(event_rx));

    let auth_service = Arc::new(AuthService::new(AuthConfig::from(&cfg)));

    let services = AppServices::new(
        db_pool.clone(),
        Arc::new(event_sender.clone()),
        Arc::new(cfg.clone()),
    );

    let state = Arc::new(AppState {
        db: db_pool,
        config: cfg.clone(),
        event_sender,
        services,
    });

    let cors_layer = build_cors_layer(&cfg);

    let app = logicbuilders_api::app_router(state, auth_service)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(cors_layer);

    let addr = format!("{}:{}", cfg.host, cfg.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

fn build_cors_layer(cfg: &config::AppConfig) -> CorsLayer {
    let configured_origins: Vec<HeaderValue> = cfg
        .cors_allowed_origins
        .as_deref()
        .unwrap_or("")
        .split(',')
        .filter_map(|origin| {
            let origin = origin.trim();
            if origin.is_empty() {
                return None;
            }
            match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin '{}'", origin);
                    None
                }
            }
        })
        .collect();

    if !configured_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(configured_origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(cfg.cors_allow_credentials)
    } else if cfg.should_allow_permissive_cors() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        warn!("No CORS origins configured; cross-origin requests will be rejected");
        CorsLayer::new()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
