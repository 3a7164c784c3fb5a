use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Catalog product entity
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub category_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub price: Decimal,
    /// Manual availability switch, independent of stock
    pub availability: bool,
    pub stock: i32,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    #[sea_orm(nullable)]
    pub image_url: Option<String>,
    /// Category-shaped technical specs, see [`ProductSpecs`]
    #[sea_orm(column_type = "Json")]
    pub specs: Json,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// True when the product can be added to a cart at all.
    pub fn is_purchasable(&self) -> bool {
        self.availability && self.stock > 0
    }

    /// Decode the stored specs blob into its typed form.
    pub fn typed_specs(&self) -> Result<ProductSpecs, serde_json::Error> {
        serde_json::from_value(self.specs.clone())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
    #[sea_orm(has_many = "super::build_item::Entity")]
    BuildItems,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::build_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BuildItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Technical specifications, shaped per component category. Stored as JSON on
/// the product row; the `kind` tag keeps the blob self-describing so fields
/// are validated on write instead of being a free-form map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProductSpecs {
    Cpu {
        socket: String,
        cores: u32,
        threads: u32,
        base_clock_ghz: f64,
        tdp_watts: u32,
    },
    Motherboard {
        socket: String,
        chipset: String,
        form_factor: String,
        memory_slots: u32,
    },
    Memory {
        capacity_gb: u32,
        speed_mhz: u32,
        modules: u32,
    },
    Storage {
        capacity_gb: u32,
        interface: String,
    },
    VideoCard {
        chipset: String,
        memory_gb: u32,
    },
    PowerSupply {
        wattage: u32,
        efficiency_rating: String,
    },
    Case {
        form_factor: String,
    },
    /// Categories without a dedicated shape keep arbitrary key/value specs.
    Other {
        #[serde(flatten)]
        fields: serde_json::Map<String, serde_json::Value>,
    },
}

impl ProductSpecs {
    pub fn to_json(&self) -> Json {
        serde_json::to_value(self).unwrap_or(Json::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cpu_specs_round_trip() {
        let specs = ProductSpecs::Cpu {
            socket: "AM5".into(),
            cores: 8,
            threads: 16,
            base_clock_ghz: 4.2,
            tdp_watts: 105,
        };
        let value = specs.to_json();
        assert_eq!(value["kind"], "cpu");
        assert_eq!(value["socket"], "AM5");

        let back: ProductSpecs = serde_json::from_value(value).unwrap();
        assert_eq!(back, specs);
    }

    #[test]
    fn unknown_category_keeps_free_form_fields() {
        let value = json!({
            "kind": "other",
            "color": "black",
            "weight_kg": 1.2,
        });
        let specs: ProductSpecs = serde_json::from_value(value).unwrap();
        match specs {
            ProductSpecs::Other { fields } => {
                assert_eq!(fields["color"], "black");
            }
            other => panic!("expected Other, got {:?}", other),
        }
    }

    #[test]
    fn unavailable_product_is_not_purchasable() {
        let product = Model {
            id: Uuid::new_v4(),
            name: "Ryzen 7".into(),
            category_id: Uuid::new_v4(),
            price: Decimal::new(29900, 2),
            availability: false,
            stock: 5,
            description: None,
            image_url: None,
            specs: Json::Null,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(!product.is_purchasable());
    }
}
