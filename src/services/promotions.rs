use crate::{
    entities::promotion::{self, PromotionKind, PromotionStatus},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePromotionInput {
    pub code: String,
    pub kind: PromotionKind,
    pub value: Decimal,
    pub min_order_value: Option<Decimal>,
    pub max_discount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

/// Admin-managed promotion codes.
#[derive(Clone)]
pub struct PromotionService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl PromotionService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, input))]
    pub async fn create_promotion(
        &self,
        input: CreatePromotionInput,
    ) -> Result<promotion::Model, ServiceError> {
        let code = input.code.trim().to_uppercase();
        if code.is_empty() {
            return Err(ServiceError::ValidationError(
                "Promotion code must not be empty".into(),
            ));
        }
        if input.ends_at <= input.starts_at {
            return Err(ServiceError::ValidationError(
                "Promotion end date must be after its start date".into(),
            ));
        }
        if input.value < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Promotion value must not be negative".into(),
            ));
        }
        if input.kind == PromotionKind::Percentage && input.value > Decimal::from(100) {
            return Err(ServiceError::ValidationError(
                "Percentage promotions cannot exceed 100".into(),
            ));
        }

        let existing = promotion::Entity::find()
            .filter(promotion::Column::Code.eq(code.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Promotion code '{}' already exists",
                code
            )));
        }

        let promo = promotion::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code),
            kind: Set(input.kind),
            value: Set(input.value),
            min_order_value: Set(input.min_order_value),
            max_discount: Set(input.max_discount),
            usage_limit: Set(input.usage_limit),
            usage_count: Set(0),
            starts_at: Set(input.starts_at),
            ends_at: Set(input.ends_at),
            status: Set(PromotionStatus::Active),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await?;

        self.event_sender
            .send_or_log(Event::PromotionCreated(promo.id))
            .await;

        info!("Created promotion {} ({})", promo.code, promo.id);
        Ok(promo)
    }

    pub async fn list_promotions(&self) -> Result<Vec<promotion::Model>, ServiceError> {
        Ok(promotion::Entity::find()
            .order_by_desc(promotion::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn deactivate_promotion(
        &self,
        promotion_id: Uuid,
    ) -> Result<promotion::Model, ServiceError> {
        let promo = promotion::Entity::find_by_id(promotion_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Promotion not found".into()))?;

        let mut model: promotion::ActiveModel = promo.into();
        model.status = Set(PromotionStatus::Inactive);
        model.updated_at = Set(Utc::now());
        let promo = model.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::PromotionDeactivated(promotion_id))
            .await;

        Ok(promo)
    }
}

/// Looks up a promo code that is redeemable right now. Unknown, inactive,
/// expired or exhausted codes all return `None`; checkout treats that as
/// "no discount", not an error.
pub async fn find_redeemable_code<C: ConnectionTrait>(
    db: &C,
    code: &str,
) -> Result<Option<promotion::Model>, ServiceError> {
    let code = code.trim().to_uppercase();
    let promo = promotion::Entity::find()
        .filter(promotion::Column::Code.eq(code))
        .one(db)
        .await?;
    Ok(promo.filter(|p| p.is_redeemable(Utc::now())))
}

/// Bumps a promotion's usage counter inside the caller's transaction.
pub async fn record_usage<C: ConnectionTrait>(
    db: &C,
    promo: promotion::Model,
) -> Result<(), ServiceError> {
    let next_count = promo.usage_count + 1;
    let mut model: promotion::ActiveModel = promo.into();
    model.usage_count = Set(next_count);
    model.updated_at = Set(Utc::now());
    model.update(db).await?;
    Ok(())
}
