use crate::{
    entities::{
        order::{self, OrderStatus},
        order_item,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// The two transitions a customer may request on their own order.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerOrderAction {
    Cancel,
    RequestReturn,
}

/// An order together with its line snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
}

/// Order read and status-transition service. Orders are never deleted; after
/// checkout only their status and paid flag change.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    pub async fn list_orders(&self, customer_id: Uuid) -> Result<Vec<order::Model>, ServiceError> {
        Ok(order::Entity::find()
            .filter(order::Column::CustomerId.eq(customer_id))
            .order_by_desc(order::Column::OrderDate)
            .all(&*self.db)
            .await?)
    }

    pub async fn get_order(
        &self,
        customer_id: Uuid,
        order_id: Uuid,
    ) -> Result<OrderWithItems, ServiceError> {
        let order = self.get_owned_order(customer_id, order_id).await?;
        let items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&*self.db)
            .await?;
        Ok(OrderWithItems { order, items })
    }

    /// Customer-initiated transition. Cancellation is only open while the
    /// order has not shipped; a return can only be requested once delivered.
    #[instrument(skip(self))]
    pub async fn customer_update_status(
        &self,
        customer_id: Uuid,
        order_id: Uuid,
        action: CustomerOrderAction,
    ) -> Result<order::Model, ServiceError> {
        let order = self.get_owned_order(customer_id, order_id).await?;

        let target = match action {
            CustomerOrderAction::Cancel => OrderStatus::Cancelled,
            CustomerOrderAction::RequestReturn => OrderStatus::AwaitingReturn,
        };

        self.transition(order, target).await
    }

    /// Staff transition; any edge of the status machine is allowed.
    #[instrument(skip(self))]
    pub async fn admin_update_status(
        &self,
        order_id: Uuid,
        target: OrderStatus,
    ) -> Result<order::Model, ServiceError> {
        let order = order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".into()))?;

        self.transition(order, target).await
    }

    #[instrument(skip(self))]
    pub async fn mark_paid(&self, order_id: Uuid) -> Result<order::Model, ServiceError> {
        let order = order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".into()))?;
        if order.paid {
            return Ok(order);
        }

        let mut model: order::ActiveModel = order.into();
        model.paid = Set(true);
        model.updated_at = Set(Utc::now());
        Ok(model.update(&*self.db).await?)
    }

    async fn transition(
        &self,
        order: order::Model,
        target: OrderStatus,
    ) -> Result<order::Model, ServiceError> {
        let current = order.status;
        if !current.can_transition_to(target) {
            return Err(ServiceError::InvalidStatus(format!(
                "Cannot move order from {} to {}",
                current, target
            )));
        }

        let order_id = order.id;
        let mut model: order::ActiveModel = order.into();
        model.status = Set(target);
        model.updated_at = Set(Utc::now());
        let updated = model.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status: current.to_string(),
                new_status: target.to_string(),
            })
            .await;

        info!("Order {} moved {} -> {}", order_id, current, target);
        Ok(updated)
    }

    async fn get_owned_order(
        &self,
        customer_id: Uuid,
        order_id: Uuid,
    ) -> Result<order::Model, ServiceError> {
        let order = order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".into()))?;
        if order.customer_id != customer_id {
            // Hide the existence of other customers' orders.
            return Err(ServiceError::NotFound("Order not found".into()));
        }
        Ok(order)
    }
}
