use crate::{
    entities::{category, product, product::ProductSpecs},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Catalog service for categories, products and availability checks.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProductInput {
    pub name: String,
    pub category_id: Uuid,
    pub price: Decimal,
    pub availability: bool,
    pub stock: i32,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub specs: ProductSpecs,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub availability: Option<bool>,
    pub stock: Option<i32>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub specs: Option<ProductSpecs>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    #[serde(default)]
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub available_only: bool,
}

/// Outcome of an availability check for a requested quantity.
#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityStatus {
    pub product_id: Uuid,
    pub available: bool,
    pub in_stock: i32,
    pub requested: i32,
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn create_category(&self, name: String) -> Result<category::Model, ServiceError> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(ServiceError::ValidationError(
                "Category name must not be empty".into(),
            ));
        }

        let existing = category::Entity::find()
            .filter(category::Column::Name.eq(name.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Category '{}' already exists",
                name
            )));
        }

        let model = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            created_at: Set(Utc::now()),
        };

        Ok(model.insert(&*self.db).await?)
    }

    pub async fn list_categories(&self) -> Result<Vec<category::Model>, ServiceError> {
        Ok(category::Entity::find()
            .order_by_asc(category::Column::Name)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self, input))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<product::Model, ServiceError> {
        if input.price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Product price must not be negative".into(),
            ));
        }
        if input.stock < 0 {
            return Err(ServiceError::ValidationError(
                "Product stock must not be negative".into(),
            ));
        }

        category::Entity::find_by_id(input.category_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Category not found".into()))?;

        let product_id = Uuid::new_v4();
        let model = product::ActiveModel {
            id: Set(product_id),
            name: Set(input.name),
            category_id: Set(input.category_id),
            price: Set(input.price),
            availability: Set(input.availability),
            stock: Set(input.stock),
            description: Set(input.description),
            image_url: Set(input.image_url),
            specs: Set(input.specs.to_json()),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };

        let product = model.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ProductCreated(product_id))
            .await;

        info!("Created product: {}", product_id);
        Ok(product)
    }

    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> Result<product::Model, ServiceError> {
        let existing = self.get_product(product_id).await?;

        if let Some(price) = input.price {
            if price < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "Product price must not be negative".into(),
                ));
            }
        }
        if let Some(stock) = input.stock {
            if stock < 0 {
                return Err(ServiceError::ValidationError(
                    "Product stock must not be negative".into(),
                ));
            }
        }

        let mut model: product::ActiveModel = existing.into();
        if let Some(name) = input.name {
            model.name = Set(name);
        }
        if let Some(price) = input.price {
            model.price = Set(price);
        }
        if let Some(availability) = input.availability {
            model.availability = Set(availability);
        }
        if let Some(stock) = input.stock {
            model.stock = Set(stock);
        }
        if let Some(description) = input.description {
            model.description = Set(Some(description));
        }
        if let Some(image_url) = input.image_url {
            model.image_url = Set(Some(image_url));
        }
        if let Some(specs) = input.specs {
            model.specs = Set(specs.to_json());
        }
        model.updated_at = Set(Utc::now());

        let product = model.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ProductUpdated(product_id))
            .await;

        Ok(product)
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, product_id: Uuid) -> Result<(), ServiceError> {
        let result = product::Entity::delete_by_id(product_id)
            .exec(&*self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound("Product not found".into()));
        }

        self.event_sender
            .send_or_log(Event::ProductDeleted(product_id))
            .await;

        Ok(())
    }

    pub async fn get_product(&self, product_id: Uuid) -> Result<product::Model, ServiceError> {
        product::Entity::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".into()))
    }

    pub async fn list_products(
        &self,
        filter: ProductFilter,
    ) -> Result<Vec<product::Model>, ServiceError> {
        let mut query = product::Entity::find().order_by_asc(product::Column::Name);
        if let Some(category_id) = filter.category_id {
            query = query.filter(product::Column::CategoryId.eq(category_id));
        }
        if filter.available_only {
            query = query.filter(product::Column::Availability.eq(true));
        }
        Ok(query.all(&*self.db).await?)
    }

    /// Availability check for a requested quantity. This is advisory: it is
    /// read at cart time and not re-verified inside the checkout transaction.
    #[instrument(skip(self))]
    pub async fn check_availability(
        &self,
        product_id: Uuid,
        requested: i32,
    ) -> Result<AvailabilityStatus, ServiceError> {
        let product = self.get_product(product_id).await?;
        Ok(AvailabilityStatus {
            product_id,
            available: product.availability && product.stock >= requested,
            in_stock: product.stock,
            requested,
        })
    }
}
