use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Code-based promotion maintained by staff
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "promotions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    pub kind: PromotionKind,
    /// Percentage points for percentage promos, an amount otherwise
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub value: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))", nullable)]
    pub min_order_value: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))", nullable)]
    pub max_discount: Option<Decimal>,
    #[sea_orm(nullable)]
    pub usage_limit: Option<i32>,
    pub usage_count: i32,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: PromotionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// Redeemable right now: active, inside its window, under its usage cap.
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        self.status == PromotionStatus::Active
            && self.starts_at <= now
            && now <= self.ends_at
            && self
                .usage_limit
                .map_or(true, |limit| self.usage_count < limit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum PromotionKind {
    #[sea_orm(string_value = "percentage")]
    Percentage,
    #[sea_orm(string_value = "fixed_amount")]
    FixedAmount,
    #[sea_orm(string_value = "free_shipping")]
    FreeShipping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum PromotionStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "inactive")]
    Inactive,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn promo(starts: i64, ends: i64) -> Model {
        let now = Utc::now();
        Model {
            id: Uuid::new_v4(),
            code: "SUMMER10".into(),
            kind: PromotionKind::Percentage,
            value: dec!(10),
            min_order_value: None,
            max_discount: None,
            usage_limit: None,
            usage_count: 0,
            starts_at: now + Duration::days(starts),
            ends_at: now + Duration::days(ends),
            status: PromotionStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn redeemable_inside_window() {
        assert!(promo(-1, 1).is_redeemable(Utc::now()));
    }

    #[test]
    fn expired_or_upcoming_is_not_redeemable() {
        assert!(!promo(-10, -1).is_redeemable(Utc::now()));
        assert!(!promo(1, 10).is_redeemable(Utc::now()));
    }

    #[test]
    fn usage_cap_is_enforced() {
        let mut p = promo(-1, 1);
        p.usage_limit = Some(3);
        p.usage_count = 3;
        assert!(!p.is_redeemable(Utc::now()));
        p.usage_count = 2;
        assert!(p.is_redeemable(Utc::now()));
    }

    #[test]
    fn inactive_promotion_is_not_redeemable() {
        let mut p = promo(-1, 1);
        p.status = PromotionStatus::Inactive;
        assert!(!p.is_redeemable(Utc::now()));
    }
}
