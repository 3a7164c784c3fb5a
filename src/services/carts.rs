use crate::{
    entities::{build, cart, cart_item, product},
    errors::ServiceError,
    events::{Event, EventSender},
    services::builds,
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

#[derive(Debug, Clone, Deserialize)]
pub struct AddCartItemInput {
    pub product_id: Option<Uuid>,
    pub build_id: Option<Uuid>,
    pub quantity: i32,
}

/// A cart together with its lines and running subtotal.
#[derive(Debug, Clone, Serialize)]
pub struct CartWithItems {
    #[serde(flatten)]
    pub cart: cart::Model,
    pub items: Vec<cart_item::Model>,
    pub subtotal: Decimal,
}

/// Shopping cart service. One cart per customer, created lazily; lines
/// reference exactly one of a catalog product or a custom build.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Fetches the customer's cart, creating it on first use.
    #[instrument(skip(self))]
    pub async fn get_or_create_cart(&self, customer_id: Uuid) -> Result<cart::Model, ServiceError> {
        if let Some(cart) = cart::Entity::find()
            .filter(cart::Column::CustomerId.eq(customer_id))
            .one(&*self.db)
            .await?
        {
            return Ok(cart);
        }

        let model = cart::ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(customer_id),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };
        let cart = model.insert(&*self.db).await?;
        info!("Created cart {} for customer {}", cart.id, customer_id);
        Ok(cart)
    }

    pub async fn get_cart_with_items(
        &self,
        customer_id: Uuid,
    ) -> Result<CartWithItems, ServiceError> {
        let cart = self.get_or_create_cart(customer_id).await?;
        let items = cart_item::Entity::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .order_by_asc(cart_item::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        let subtotal = items.iter().map(|i| i.line_total()).sum();
        Ok(CartWithItems {
            cart,
            items,
            subtotal,
        })
    }

    /// Adds a line to the cart, merging with an existing line for the same
    /// product or build. The unit price is captured at add time.
    #[instrument(skip(self, input))]
    pub async fn add_item(
        &self,
        customer_id: Uuid,
        input: AddCartItemInput,
    ) -> Result<cart_item::Model, ServiceError> {
        if input.quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Quantity must be positive".into(),
            ));
        }

        // Exactly one of product_id / build_id.
        let (product_id, build_id) = match (input.product_id, input.build_id) {
            (Some(p), None) => (Some(p), None),
            (None, Some(b)) => (None, Some(b)),
            _ => {
                return Err(ServiceError::ValidationError(
                    "A cart item must reference exactly one of product_id or build_id".into(),
                ))
            }
        };

        // For product lines, remember the stock bound so the merge below can
        // check the combined quantity, not just the increment.
        let mut stock_bound = None;
        let unit_price = if let Some(product_id) = product_id {
            let product = product::Entity::find_by_id(product_id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| ServiceError::NotFound("Product not found".into()))?;
            if !product.is_purchasable() {
                return Err(ServiceError::ProductUnavailable(product.name));
            }
            if product.stock < input.quantity {
                return Err(ServiceError::InsufficientStock(format!(
                    "Requested {} of '{}' but only {} in stock",
                    input.quantity, product.name, product.stock
                )));
            }
            stock_bound = Some((product.name, product.stock));
            product.price
        } else {
            let build_id = build_id.unwrap();
            let build = build::Entity::find_by_id(build_id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| ServiceError::NotFound("Build not found".into()))?;
            if build.customer_id != customer_id {
                // Hide the existence of other customers' builds.
                return Err(ServiceError::NotFound("Build not found".into()));
            }
            let report = builds::validate_build_on(&*self.db, build_id).await?;
            if !report.eligible {
                return Err(ServiceError::InvalidOperation(format!(
                    "Build is missing required components: {}",
                    report.missing.join(", ")
                )));
            }
            build.price
        };

        let cart = self.get_or_create_cart(customer_id).await?;

        let txn = self.db.begin().await?;

        let mut query = cart_item::Entity::find().filter(cart_item::Column::CartId.eq(cart.id));
        query = match (product_id, build_id) {
            (Some(p), _) => query.filter(cart_item::Column::ProductId.eq(p)),
            (_, Some(b)) => query.filter(cart_item::Column::BuildId.eq(b)),
            _ => unreachable!(),
        };

        let item = if let Some(existing) = query.one(&txn).await? {
            let new_quantity = existing.quantity + input.quantity;
            if let Some((name, stock)) = &stock_bound {
                if *stock < new_quantity {
                    return Err(ServiceError::InsufficientStock(format!(
                        "Cart would hold {} of '{}' but only {} in stock",
                        new_quantity, name, stock
                    )));
                }
            }
            let mut model: cart_item::ActiveModel = existing.into();
            model.quantity = Set(new_quantity);
            model.unit_price = Set(unit_price);
            model.updated_at = Set(Utc::now());
            model.update(&txn).await?
        } else {
            cart_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart.id),
                product_id: Set(product_id),
                build_id: Set(build_id),
                quantity: Set(input.quantity),
                unit_price: Set(unit_price),
                created_at: Set(Utc::now()),
                updated_at: Set(Utc::now()),
            }
            .insert(&txn)
            .await?
        };

        touch_cart(&txn, &cart).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                cart_id: cart.id,
                item_id: item.id,
            })
            .await;

        Ok(item)
    }

    #[instrument(skip(self))]
    pub async fn update_item_quantity(
        &self,
        customer_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<cart_item::Model, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Quantity must be positive; remove the item instead".into(),
            ));
        }

        let (cart, item) = self.get_owned_item(customer_id, item_id).await?;

        if let Some(product_id) = item.product_id {
            let product = product::Entity::find_by_id(product_id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| ServiceError::NotFound("Product not found".into()))?;
            if product.stock < quantity {
                return Err(ServiceError::InsufficientStock(format!(
                    "Requested {} of '{}' but only {} in stock",
                    quantity, product.name, product.stock
                )));
            }
        }

        let txn = self.db.begin().await?;
        let mut model: cart_item::ActiveModel = item.into();
        model.quantity = Set(quantity);
        model.updated_at = Set(Utc::now());
        let item = model.update(&txn).await?;
        touch_cart(&txn, &cart).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemUpdated {
                cart_id: cart.id,
                item_id: item.id,
            })
            .await;

        Ok(item)
    }

    #[instrument(skip(self))]
    pub async fn remove_item(&self, customer_id: Uuid, item_id: Uuid) -> Result<(), ServiceError> {
        let (cart, item) = self.get_owned_item(customer_id, item_id).await?;

        let txn = self.db.begin().await?;
        cart_item::Entity::delete_by_id(item.id).exec(&txn).await?;
        touch_cart(&txn, &cart).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemRemoved {
                cart_id: cart.id,
                item_id,
            })
            .await;

        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn clear_cart(&self, customer_id: Uuid) -> Result<(), ServiceError> {
        let cart = self.get_or_create_cart(customer_id).await?;
        clear_cart_on(&*self.db, cart.id).await?;

        self.event_sender
            .send_or_log(Event::CartCleared(cart.id))
            .await;

        Ok(())
    }

    async fn get_owned_item(
        &self,
        customer_id: Uuid,
        item_id: Uuid,
    ) -> Result<(cart::Model, cart_item::Model), ServiceError> {
        let item = cart_item::Entity::find_by_id(item_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Cart item not found".into()))?;
        let cart = cart::Entity::find_by_id(item.cart_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Cart not found".into()))?;
        if cart.customer_id != customer_id {
            // Hide the existence of other customers' cart items.
            return Err(ServiceError::NotFound("Cart item not found".into()));
        }
        Ok((cart, item))
    }
}

/// Connection-generic cart wipe so checkout can clear inside its transaction.
pub async fn clear_cart_on<C: ConnectionTrait>(db: &C, cart_id: Uuid) -> Result<(), ServiceError> {
    cart_item::Entity::delete_many()
        .filter(cart_item::Column::CartId.eq(cart_id))
        .exec(db)
        .await?;
    Ok(())
}

async fn touch_cart<C: ConnectionTrait>(db: &C, cart: &cart::Model) -> Result<(), ServiceError> {
    let mut model: cart::ActiveModel = cart.clone().into();
    model.updated_at = Set(Utc::now());
    model.update(db).await?;
    Ok(())
}
