use std::sync::Arc;

use chrono::{Duration, Utc};
use logicbuilders_api::{
    config::AppConfig,
    db::DbConfig,
    entities::product::ProductSpecs,
    errors::ServiceError,
    events::{self, EventSender},
    handlers::AppServices,
    migrator::Migrator,
    services::catalog::CreateProductInput,
    services::promotions::CreatePromotionInput,
};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Service-level harness backed by an in-memory SQLite database.
///
/// The pool is pinned to a single connection: every connection to
/// `sqlite::memory:` gets its own database, so a larger pool would scatter
/// tables across connections.
pub struct TestCtx {
    pub db: Arc<DatabaseConnection>,
    pub services: AppServices,
    pub config: Arc<AppConfig>,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestCtx {
    pub async fn new() -> Self {
        let db_cfg = DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let db = Arc::new(
            logicbuilders_api::db::establish_connection_with_config(&db_cfg)
                .await
                .expect("connect to in-memory sqlite"),
        );
        Migrator::up(db.as_ref(), None)
            .await
            .expect("run migrations");

        let config = Arc::new(AppConfig::new(
            "sqlite::memory:".to_string(),
            "test_secret_key_for_testing_purposes_only_32chars".to_string(),
            3600,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        ));

        let (tx, rx) = mpsc::channel(64);
        let event_sender = Arc::new(EventSender::new(tx));
        let event_task = tokio::spawn(events::process_events(rx));

        let services = AppServices::new(db.clone(), event_sender, config.clone());

        Self {
            db,
            services,
            config,
            _event_task: event_task,
        }
    }

    pub async fn seed_category(&self, name: &str) -> Uuid {
        match self.services.catalog.create_category(name.to_string()).await {
            Ok(category) => category.id,
            Err(ServiceError::Conflict(_)) => self
                .services
                .catalog
                .list_categories()
                .await
                .expect("list categories")
                .into_iter()
                .find(|c| c.name == name)
                .expect("existing category")
                .id,
            Err(err) => panic!("create category: {err:?}"),
        }
    }

    pub async fn seed_product(
        &self,
        name: &str,
        category_id: Uuid,
        price: Decimal,
        stock: i32,
        availability: bool,
    ) -> Uuid {
        self.services
            .catalog
            .create_product(CreateProductInput {
                name: name.to_string(),
                category_id,
                price,
                availability,
                stock,
                description: None,
                image_url: None,
                specs: ProductSpecs::Other {
                    fields: serde_json::Map::new(),
                },
            })
            .await
            .expect("create product")
            .id
    }

    /// Seeds an active 10% promotion valid for the next day.
    pub async fn seed_percentage_promo(&self, code: &str, percent: Decimal) -> Uuid {
        self.services
            .promotions
            .create_promotion(CreatePromotionInput {
                code: code.to_string(),
                kind: logicbuilders_api::entities::promotion::PromotionKind::Percentage,
                value: percent,
                min_order_value: None,
                max_discount: None,
                usage_limit: None,
                starts_at: Utc::now() - Duration::days(1),
                ends_at: Utc::now() + Duration::days(1),
            })
            .await
            .expect("create promotion")
            .id
    }
}
