use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Loyalty voucher minted when points are redeemed. Single use, customer
/// bound, expires after a configured validity window.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vouchers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub customer_id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub discount_percent: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub max_discount: Decimal,
    pub expires_at: DateTime<Utc>,
    pub redeemed: bool,
    #[sea_orm(nullable)]
    pub redeemed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Model {
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        !self.redeemed && now <= self.expires_at
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
