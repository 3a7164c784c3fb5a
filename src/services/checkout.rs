use crate::{
    config::AppConfig,
    entities::{
        build, cart, cart_item, order, order_item, product, shipping_address, voucher,
        order::OrderStatus,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{carts, points, pricing, promotions},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// How the caller names the delivery address: a saved address id, or inline
/// fields that are deduplicated against the customer's saved addresses.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AddressSelection {
    Saved {
        shipping_address_id: Uuid,
    },
    Inline {
        address: String,
        city: String,
        zip_code: String,
        country: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrderInput {
    pub payment_method: String,
    #[serde(flatten)]
    pub address: AddressSelection,
    pub promo_code: Option<String>,
    pub voucher_code: Option<String>,
}

/// Checkout result returned to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
    pub order_id: Uuid,
    pub order_number: String,
    pub total_price: rust_decimal::Decimal,
    pub points_earned: i64,
}

/// The Order Writer. One entry point serves both the inline-address and the
/// saved-address checkout paths; everything from address resolution to the
/// points credit happens in a single database transaction, so a failure at
/// any step leaves no partial order behind.
///
/// Availability is checked per product line, but stock counts are not
/// re-verified here; the stock check happens when the item enters the cart.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
}

impl CheckoutService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            db,
            event_sender,
            config,
        }
    }

    #[instrument(skip(self, input))]
    pub async fn place_order(
        &self,
        customer_id: Uuid,
        input: PlaceOrderInput,
    ) -> Result<PlacedOrder, ServiceError> {
        if input.payment_method.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Payment method is required".into(),
            ));
        }
        if let AddressSelection::Inline {
            address,
            city,
            zip_code,
            country,
        } = &input.address
        {
            if [address, city, zip_code, country]
                .iter()
                .any(|f| f.trim().is_empty())
            {
                return Err(ServiceError::ValidationError(
                    "All shipping address fields are required".into(),
                ));
            }
        }

        let txn = self.db.begin().await?;

        let cart = cart::Entity::find()
            .filter(cart::Column::CustomerId.eq(customer_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::InvalidOperation("Cart is empty".into()))?;

        let items = cart_item::Entity::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .all(&txn)
            .await?;
        if items.is_empty() {
            return Err(ServiceError::InvalidOperation("Cart is empty".into()));
        }

        let lines = resolve_lines(&txn, &items).await?;

        let terms = pricing::DiscountTerms {
            promotion: match input.promo_code.as_deref() {
                // Unknown or expired codes are dropped silently.
                Some(code) => promotions::find_redeemable_code(&txn, code).await?,
                None => None,
            },
            voucher: match input.voucher_code.as_deref() {
                Some(code) => Some(resolve_voucher(&txn, customer_id, code).await?),
                None => None,
            },
        };

        let priced: Vec<pricing::PricedLine> = lines
            .iter()
            .map(|l| pricing::PricedLine {
                unit_price: l.unit_price,
                quantity: l.quantity,
            })
            .collect();
        let quote = pricing::quote(&priced, &terms, self.config.delivery_charge);

        let address_id = resolve_address(&txn, customer_id, &input.address).await?;

        let order_id = Uuid::new_v4();
        let order_number = generate_order_number(order_id);

        let order = order::ActiveModel {
            id: Set(order_id),
            order_number: Set(order_number.clone()),
            customer_id: Set(customer_id),
            status: Set(OrderStatus::Pending),
            paid: Set(false),
            payment_method: Set(input.payment_method),
            subtotal: Set(quote.subtotal),
            discount_total: Set(quote.discount_total),
            delivery_charge: Set(quote.delivery_charge),
            total_price: Set(quote.total),
            shipping_address_id: Set(address_id),
            promotion_id: Set(terms.promotion.as_ref().map(|p| p.id)),
            voucher_id: Set(terms.voucher.as_ref().map(|v| v.id)),
            order_date: Set(Utc::now()),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;

        for line in &lines {
            order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(line.product_id),
                build_id: Set(line.build_id),
                name: Set(line.name.clone()),
                quantity: Set(line.quantity),
                unit_price: Set(line.unit_price),
                line_total: Set(line.unit_price * rust_decimal::Decimal::from(line.quantity)),
            }
            .insert(&txn)
            .await?;
        }

        if let Some(promo) = terms.promotion.clone() {
            promotions::record_usage(&txn, promo).await?;
        }
        if let Some(used) = terms.voucher.clone() {
            let mut model: voucher::ActiveModel = used.into();
            model.redeemed = Set(true);
            model.redeemed_at = Set(Some(Utc::now()));
            model.update(&txn).await?;
        }

        carts::clear_cart_on(&txn, cart.id).await?;

        let points_earned =
            points::credit_for_order(&txn, customer_id, order_id, quote.total).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderPlaced {
                order_id,
                customer_id,
                total_price: order.total_price,
            })
            .await;
        if points_earned > 0 {
            self.event_sender
                .send_or_log(Event::PointsEarned {
                    customer_id,
                    points: points_earned,
                    order_id,
                })
                .await;
        }

        info!(
            "Placed order {} ({}) for customer {}: total {}",
            order_number, order_id, customer_id, order.total_price
        );
        Ok(PlacedOrder {
            order_id,
            order_number,
            total_price: order.total_price,
            points_earned,
        })
    }
}

struct ResolvedLine {
    product_id: Option<Uuid>,
    build_id: Option<Uuid>,
    name: String,
    quantity: i32,
    unit_price: rust_decimal::Decimal,
}

/// Turns cart lines into order-line snapshots, verifying availability for
/// product-backed lines. The captured cart unit price is what gets frozen.
async fn resolve_lines<C: ConnectionTrait>(
    db: &C,
    items: &[cart_item::Model],
) -> Result<Vec<ResolvedLine>, ServiceError> {
    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        let line = match (item.product_id, item.build_id) {
            (Some(product_id), None) => {
                let product = product::Entity::find_by_id(product_id)
                    .one(db)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Product {} not found", product_id))
                    })?;
                if !product.availability {
                    return Err(ServiceError::ProductUnavailable(product.name));
                }
                ResolvedLine {
                    product_id: Some(product_id),
                    build_id: None,
                    name: product.name,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                }
            }
            (None, Some(build_id)) => {
                let build = build::Entity::find_by_id(build_id)
                    .one(db)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Build {} not found", build_id))
                    })?;
                ResolvedLine {
                    product_id: None,
                    build_id: Some(build_id),
                    name: build.name,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                }
            }
            _ => {
                return Err(ServiceError::InternalError(format!(
                    "Cart item {} violates the product/build exclusivity rule",
                    item.id
                )))
            }
        };
        lines.push(line);
    }
    Ok(lines)
}

/// A voucher must belong to the caller and still be usable; unlike promo
/// codes, a bad voucher code is an error.
async fn resolve_voucher<C: ConnectionTrait>(
    db: &C,
    customer_id: Uuid,
    code: &str,
) -> Result<voucher::Model, ServiceError> {
    let found = voucher::Entity::find()
        .filter(voucher::Column::Code.eq(code.trim().to_uppercase()))
        .filter(voucher::Column::CustomerId.eq(customer_id))
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Voucher not found".into()))?;
    if !found.is_usable(Utc::now()) {
        return Err(ServiceError::InvalidOperation(
            "Voucher has been used or has expired".into(),
        ));
    }
    Ok(found)
}

/// Saved id is verified for ownership; inline fields are deduplicated by
/// exact match before a new row is written.
async fn resolve_address<C: ConnectionTrait>(
    db: &C,
    customer_id: Uuid,
    selection: &AddressSelection,
) -> Result<Uuid, ServiceError> {
    match selection {
        AddressSelection::Saved {
            shipping_address_id,
        } => {
            let saved = shipping_address::Entity::find_by_id(*shipping_address_id)
                .one(db)
                .await?
                .ok_or_else(|| ServiceError::NotFound("Shipping address not found".into()))?;
            if saved.customer_id != customer_id {
                // Hide the existence of other customers' addresses.
                return Err(ServiceError::NotFound(
                    "Shipping address not found".into(),
                ));
            }
            Ok(saved.id)
        }
        AddressSelection::Inline {
            address,
            city,
            zip_code,
            country,
        } => {
            let existing = shipping_address::Entity::find()
                .filter(shipping_address::Column::CustomerId.eq(customer_id))
                .all(db)
                .await?
                .into_iter()
                .find(|a| a.matches(address, city, zip_code, country));
            if let Some(found) = existing {
                return Ok(found.id);
            }

            let created = shipping_address::ActiveModel {
                id: Set(Uuid::new_v4()),
                customer_id: Set(customer_id),
                address: Set(address.clone()),
                city: Set(city.clone()),
                zip_code: Set(zip_code.clone()),
                country: Set(country.clone()),
                created_at: Set(Utc::now()),
            }
            .insert(db)
            .await?;
            Ok(created.id)
        }
    }
}

fn generate_order_number(order_id: Uuid) -> String {
    let raw = order_id.simple().to_string();
    format!("LB-{}", raw[..8].to_uppercase())
}
