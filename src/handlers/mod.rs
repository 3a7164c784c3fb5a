pub mod account;
pub mod builds;
pub mod carts;
pub mod common;
pub mod orders;
pub mod products;
pub mod promotions;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<crate::services::CatalogService>,
    pub builds: Arc<crate::services::BuildService>,
    pub cart: Arc<crate::services::CartService>,
    pub checkout: Arc<crate::services::CheckoutService>,
    pub orders: Arc<crate::services::OrderService>,
    pub points: Arc<crate::services::PointsService>,
    pub promotions: Arc<crate::services::PromotionService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            catalog: Arc::new(crate::services::CatalogService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            builds: Arc::new(crate::services::BuildService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            cart: Arc::new(crate::services::CartService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            checkout: Arc::new(crate::services::CheckoutService::new(
                db_pool.clone(),
                event_sender.clone(),
                config.clone(),
            )),
            orders: Arc::new(crate::services::OrderService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            points: Arc::new(crate::services::PointsService::new(
                db_pool.clone(),
                event_sender.clone(),
                config,
            )),
            promotions: Arc::new(crate::services::PromotionService::new(
                db_pool,
                event_sender,
            )),
        }
    }
}
