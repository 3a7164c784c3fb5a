use crate::{
    entities::{build, build_item, product},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Slots every purchasable build must fill. The category names in the catalog
/// are not fully consistent ("Cpu" vs "CPU", "Memory" vs "RAM", two hard
/// drive categories for storage), so each slot accepts every spelling in use.
const REQUIRED_SLOTS: &[(&str, &[&str])] = &[
    ("CPU", &["CPU", "Cpu"]),
    ("Motherboard", &["Motherboard"]),
    ("RAM", &["Memory", "RAM"]),
    ("Power Supply", &["Power Supply"]),
    ("Storage", &["Internal Hard Drive", "External Hard Drive"]),
];

/// Pure eligibility check over the category names of a build's components.
pub fn missing_required_slots<S: AsRef<str>>(category_names: &[S]) -> Vec<&'static str> {
    REQUIRED_SLOTS
        .iter()
        .filter(|(_, accepted)| {
            !category_names
                .iter()
                .any(|name| accepted.contains(&name.as_ref()))
        })
        .map(|(slot, _)| *slot)
        .collect()
}

/// Result of validating a build against the required component slots.
#[derive(Debug, Clone, Serialize)]
pub struct BuildValidationReport {
    pub build_id: Uuid,
    pub eligible: bool,
    pub missing: Vec<&'static str>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildLineInput {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBuildInput {
    pub name: String,
    pub description: Option<String>,
    pub items: Vec<BuildLineInput>,
}

/// A build together with its component lines.
#[derive(Debug, Clone, Serialize)]
pub struct BuildWithItems {
    #[serde(flatten)]
    pub build: build::Model,
    pub items: Vec<build_item::Model>,
}

/// Service for managing custom PC builds.
///
/// A build's price is never stored independently: it is recomputed as the sum
/// of component price times quantity on every mutation.
#[derive(Clone)]
pub struct BuildService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl BuildService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, input))]
    pub async fn create_build(
        &self,
        customer_id: Uuid,
        input: CreateBuildInput,
    ) -> Result<BuildWithItems, ServiceError> {
        if input.name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Build name must not be empty".into(),
            ));
        }
        validate_lines(&input.items)?;

        let txn = self.db.begin().await?;

        let build_id = Uuid::new_v4();
        let price = price_for_lines(&txn, &input.items).await?;

        let build = build::ActiveModel {
            id: Set(build_id),
            customer_id: Set(customer_id),
            name: Set(input.name),
            description: Set(input.description),
            price: Set(price),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;

        let mut items = Vec::with_capacity(input.items.len());
        for line in &input.items {
            let item = build_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                build_id: Set(build_id),
                product_id: Set(line.product_id),
                quantity: Set(line.quantity),
            }
            .insert(&txn)
            .await?;
            items.push(item);
        }

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::BuildCreated {
                build_id,
                customer_id,
            })
            .await;

        info!("Created build: {}", build_id);
        Ok(BuildWithItems { build, items })
    }

    /// Replaces the component lines of a build and reprices it.
    #[instrument(skip(self, items))]
    pub async fn replace_build_items(
        &self,
        customer_id: Uuid,
        build_id: Uuid,
        items: Vec<BuildLineInput>,
    ) -> Result<BuildWithItems, ServiceError> {
        validate_lines(&items)?;
        let build = self.get_owned_build(customer_id, build_id).await?;

        let txn = self.db.begin().await?;

        build_item::Entity::delete_many()
            .filter(build_item::Column::BuildId.eq(build_id))
            .exec(&txn)
            .await?;

        let price = price_for_lines(&txn, &items).await?;

        let mut inserted = Vec::with_capacity(items.len());
        for line in &items {
            let item = build_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                build_id: Set(build_id),
                product_id: Set(line.product_id),
                quantity: Set(line.quantity),
            }
            .insert(&txn)
            .await?;
            inserted.push(item);
        }

        let mut model: build::ActiveModel = build.into();
        model.price = Set(price);
        model.updated_at = Set(Utc::now());
        let build = model.update(&txn).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::BuildUpdated(build_id))
            .await;

        Ok(BuildWithItems {
            build,
            items: inserted,
        })
    }

    #[instrument(skip(self))]
    pub async fn delete_build(
        &self,
        customer_id: Uuid,
        build_id: Uuid,
    ) -> Result<(), ServiceError> {
        self.get_owned_build(customer_id, build_id).await?;

        let txn = self.db.begin().await?;
        build_item::Entity::delete_many()
            .filter(build_item::Column::BuildId.eq(build_id))
            .exec(&txn)
            .await?;
        build::Entity::delete_by_id(build_id).exec(&txn).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::BuildDeleted(build_id))
            .await;

        Ok(())
    }

    pub async fn get_build(
        &self,
        customer_id: Uuid,
        build_id: Uuid,
    ) -> Result<BuildWithItems, ServiceError> {
        let build = self.get_owned_build(customer_id, build_id).await?;
        let items = build_item::Entity::find()
            .filter(build_item::Column::BuildId.eq(build_id))
            .all(&*self.db)
            .await?;
        Ok(BuildWithItems { build, items })
    }

    pub async fn list_builds(&self, customer_id: Uuid) -> Result<Vec<build::Model>, ServiceError> {
        Ok(build::Entity::find()
            .filter(build::Column::CustomerId.eq(customer_id))
            .order_by_desc(build::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    /// Checks a build against the required component slots.
    #[instrument(skip(self))]
    pub async fn validate_build(
        &self,
        customer_id: Uuid,
        build_id: Uuid,
    ) -> Result<BuildValidationReport, ServiceError> {
        self.get_owned_build(customer_id, build_id).await?;
        validate_build_on(&*self.db, build_id).await
    }

    async fn get_owned_build(
        &self,
        customer_id: Uuid,
        build_id: Uuid,
    ) -> Result<build::Model, ServiceError> {
        let build = build::Entity::find_by_id(build_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Build not found".into()))?;
        if build.customer_id != customer_id {
            // Hide the existence of other customers' builds.
            return Err(ServiceError::NotFound("Build not found".into()));
        }
        Ok(build)
    }
}

/// Connection-generic validation so checkout can run it inside its own
/// transaction.
pub async fn validate_build_on<C: ConnectionTrait>(
    db: &C,
    build_id: Uuid,
) -> Result<BuildValidationReport, ServiceError> {
    let items = build_item::Entity::find()
        .filter(build_item::Column::BuildId.eq(build_id))
        .find_also_related(product::Entity)
        .all(db)
        .await?;

    let mut category_ids = Vec::new();
    for (item, product) in &items {
        let product = product.as_ref().ok_or_else(|| {
            ServiceError::InternalError(format!(
                "Build item {} references a missing product",
                item.id
            ))
        })?;
        category_ids.push(product.category_id);
    }

    let categories = crate::entities::category::Entity::find()
        .filter(crate::entities::category::Column::Id.is_in(category_ids))
        .all(db)
        .await?;
    let names: Vec<String> = categories.into_iter().map(|c| c.name).collect();

    let missing = missing_required_slots(&names);
    Ok(BuildValidationReport {
        build_id,
        eligible: missing.is_empty(),
        missing,
    })
}

fn validate_lines(items: &[BuildLineInput]) -> Result<(), ServiceError> {
    if items.is_empty() {
        return Err(ServiceError::ValidationError(
            "A build needs at least one component".into(),
        ));
    }
    for line in items {
        if line.quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Component quantity must be positive".into(),
            ));
        }
    }
    Ok(())
}

/// Derived price: sum of component price times quantity.
async fn price_for_lines<C: ConnectionTrait>(
    db: &C,
    items: &[BuildLineInput],
) -> Result<Decimal, ServiceError> {
    let mut total = Decimal::ZERO;
    for line in items {
        let product = product::Entity::find_by_id(line.product_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", line.product_id))
            })?;
        if !product.availability {
            return Err(ServiceError::ProductUnavailable(product.name));
        }
        total += product.price * Decimal::from(line.quantity);
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_build_misses_every_slot() {
        let missing = missing_required_slots::<&str>(&[]);
        assert_eq!(
            missing,
            vec!["CPU", "Motherboard", "RAM", "Power Supply", "Storage"]
        );
    }

    #[test]
    fn video_card_and_case_only() {
        let missing = missing_required_slots(&["Video Card", "Case"]);
        assert_eq!(
            missing,
            vec!["CPU", "Motherboard", "RAM", "Power Supply", "Storage"]
        );
    }

    #[test]
    fn both_cpu_spellings_are_accepted() {
        let base = ["Motherboard", "Memory", "Power Supply", "Internal Hard Drive"];
        for cpu in ["CPU", "Cpu"] {
            let mut cats: Vec<&str> = base.to_vec();
            cats.push(cpu);
            assert!(missing_required_slots(&cats).is_empty(), "{} rejected", cpu);
        }
    }

    #[test]
    fn ram_is_satisfied_by_memory_or_ram() {
        for ram in ["Memory", "RAM"] {
            let cats = ["CPU", "Motherboard", ram, "Power Supply", "External Hard Drive"];
            assert!(missing_required_slots(&cats).is_empty(), "{} rejected", ram);
        }
    }

    #[test]
    fn external_hard_drive_fills_the_storage_slot() {
        let cats = ["Cpu", "Motherboard", "RAM", "Power Supply", "External Hard Drive"];
        assert!(missing_required_slots(&cats).is_empty());
    }

    #[test]
    fn optional_categories_impose_no_constraint() {
        let cats = [
            "CPU",
            "Motherboard",
            "Memory",
            "Power Supply",
            "Internal Hard Drive",
            "Video Card",
            "Case",
            "CPU Cooler",
        ];
        assert!(missing_required_slots(&cats).is_empty());
    }

    #[test]
    fn single_missing_slot_is_named() {
        let cats = ["CPU", "Motherboard", "Memory", "Internal Hard Drive"];
        assert_eq!(missing_required_slots(&cats), vec!["Power Supply"]);
    }
}
