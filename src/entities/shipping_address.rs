use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Saved delivery address. Deduplicated per customer on exact field match.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shipping_addresses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub customer_id: Uuid,
    pub address: String,
    pub city: String,
    pub zip_code: String,
    pub country: String,
    pub created_at: DateTime<Utc>,
}

impl Model {
    /// Exact-match identity used for deduplication.
    pub fn matches(&self, address: &str, city: &str, zip_code: &str, country: &str) -> bool {
        self.address == address
            && self.city == city
            && self.zip_code == zip_code
            && self.country == country
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
