use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Append-only loyalty ledger entry. Earned entries carry a positive delta
/// and the order that produced them; redemptions carry a negative delta.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "points_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub customer_id: Uuid,
    pub delta: i64,
    pub kind: PointsTransactionKind,
    #[sea_orm(nullable)]
    pub order_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum PointsTransactionKind {
    #[sea_orm(string_value = "earned")]
    Earned,
    #[sea_orm(string_value = "redeemed")]
    Redeemed,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::customer_points::Entity",
        from = "Column::CustomerId",
        to = "super::customer_points::Column::CustomerId"
    )]
    CustomerPoints,
}

impl Related<super::customer_points::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CustomerPoints.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
