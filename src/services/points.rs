use crate::{
    config::AppConfig,
    entities::{
        customer_points,
        points_transaction::{self, PointsTransactionKind},
        voucher,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{Duration, Utc};
use rand::{distributions::Alphanumeric, Rng};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Points granted per voucher redeemed, and the redemption granularity.
pub const POINTS_PER_VOUCHER: i64 = 100;
/// Discount carried by every minted voucher, in percent.
pub const VOUCHER_DISCOUNT_PERCENT: Decimal = dec!(10);

/// Loyalty points service.
///
/// The balance row and the transaction ledger are always written together in
/// one database transaction, so the balance equals the sum of ledger deltas.
#[derive(Clone)]
pub struct PointsService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
}

impl PointsService {
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

    /// Current balance; customers without any points history get a zero row.
    pub async fn get_summary(
        &self,
        customer_id: Uuid,
    ) -> Result<customer_points::Model, ServiceError> {
        Ok(customer_points::Entity::find_by_id(customer_id)
            .one(&*self.db)
            .await?
            .unwrap_or_else(|| zero_balance(customer_id)))
    }

    pub async fn history(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<points_transaction::Model>, ServiceError> {
        Ok(points_transaction::Entity::find()
            .filter(points_transaction::Column::CustomerId.eq(customer_id))
            .order_by_desc(points_transaction::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    pub async fn list_vouchers(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<voucher::Model>, ServiceError> {
        Ok(voucher::Entity::find()
            .filter(voucher::Column::CustomerId.eq(customer_id))
            .order_by_desc(voucher::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    /// Redeems points for vouchers. Only positive multiples of 100 within the
    /// current balance are accepted; there is no partial redemption. One
    /// voucher is minted per 100 points.
    #[instrument(skip(self))]
    pub async fn redeem(
        &self,
        customer_id: Uuid,
        points: i64,
    ) -> Result<Vec<voucher::Model>, ServiceError> {
        if points <= 0 || points % POINTS_PER_VOUCHER != 0 {
            return Err(ServiceError::InvalidOperation(format!(
                "Redemption must be a positive multiple of {} points",
                POINTS_PER_VOUCHER
            )));
        }

        let txn = self.db.begin().await?;

        let summary = customer_points::Entity::find_by_id(customer_id)
            .one(&txn)
            .await?
            .unwrap_or_else(|| zero_balance(customer_id));
        if summary.balance < points {
            return Err(ServiceError::InvalidOperation(format!(
                "Insufficient points: balance is {}, requested {}",
                summary.balance, points
            )));
        }

        apply_delta(
            &txn,
            customer_id,
            -points,
            PointsTransactionKind::Redeemed,
            None,
        )
        .await?;

        let voucher_count = points / POINTS_PER_VOUCHER;
        let expires_at = Utc::now() + Duration::days(self.config.voucher_validity_days);
        let max_discount = self.config.voucher_max_discount;

        let mut vouchers = Vec::with_capacity(voucher_count as usize);
        for _ in 0..voucher_count {
            let minted = voucher::ActiveModel {
                id: Set(Uuid::new_v4()),
                customer_id: Set(customer_id),
                code: Set(generate_voucher_code()),
                discount_percent: Set(VOUCHER_DISCOUNT_PERCENT),
                max_discount: Set(max_discount),
                expires_at: Set(expires_at),
                redeemed: Set(false),
                redeemed_at: Set(None),
                created_at: Set(Utc::now()),
            }
            .insert(&txn)
            .await?;
            vouchers.push(minted);
        }

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::PointsRedeemed {
                customer_id,
                points,
            })
            .await;
        for minted in &vouchers {
            self.event_sender
                .send_or_log(Event::VoucherIssued {
                    customer_id,
                    voucher_id: minted.id,
                })
                .await;
        }

        info!(
            "Customer {} redeemed {} points for {} vouchers",
            customer_id, points, voucher_count
        );
        Ok(vouchers)
    }
}

/// Points credited for an order total: one point per whole currency unit.
pub fn points_for_total(total: Decimal) -> i64 {
    total.floor().to_i64().unwrap_or(0).max(0)
}

/// Credits points for a committed order inside the caller's transaction.
pub async fn credit_for_order<C: ConnectionTrait>(
    db: &C,
    customer_id: Uuid,
    order_id: Uuid,
    total: Decimal,
) -> Result<i64, ServiceError> {
    let points = points_for_total(total);
    if points == 0 {
        return Ok(0);
    }
    apply_delta(
        db,
        customer_id,
        points,
        PointsTransactionKind::Earned,
        Some(order_id),
    )
    .await?;
    Ok(points)
}

/// Writes a ledger entry and updates the balance row to match.
async fn apply_delta<C: ConnectionTrait>(
    db: &C,
    customer_id: Uuid,
    delta: i64,
    kind: PointsTransactionKind,
    order_id: Option<Uuid>,
) -> Result<(), ServiceError> {
    points_transaction::ActiveModel {
        id: Set(Uuid::new_v4()),
        customer_id: Set(customer_id),
        delta: Set(delta),
        kind: Set(kind),
        order_id: Set(order_id),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await?;

    let existing = customer_points::Entity::find_by_id(customer_id)
        .one(db)
        .await?;
    match existing {
        Some(row) => {
            let mut model: customer_points::ActiveModel = row.clone().into();
            model.balance = Set(row.balance + delta);
            if delta > 0 {
                model.total_earned = Set(row.total_earned + delta);
            } else {
                model.total_redeemed = Set(row.total_redeemed - delta);
            }
            model.updated_at = Set(Utc::now());
            model.update(db).await?;
        }
        None => {
            customer_points::ActiveModel {
                customer_id: Set(customer_id),
                balance: Set(delta),
                total_earned: Set(delta.max(0)),
                total_redeemed: Set((-delta).max(0)),
                updated_at: Set(Utc::now()),
            }
            .insert(db)
            .await?;
        }
    }
    Ok(())
}

fn zero_balance(customer_id: Uuid) -> customer_points::Model {
    customer_points::Model {
        customer_id,
        balance: 0,
        total_earned: 0,
        total_redeemed: 0,
        updated_at: Utc::now(),
    }
}

fn generate_voucher_code() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(char::from)
        .collect();
    format!("LB-{}", suffix.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_are_floor_of_total() {
        assert_eq!(points_for_total(dec!(35.00)), 35);
        assert_eq!(points_for_total(dec!(35.99)), 35);
        assert_eq!(points_for_total(dec!(0.99)), 0);
        assert_eq!(points_for_total(dec!(0)), 0);
    }

    #[test]
    fn voucher_codes_carry_the_prefix() {
        let code = generate_voucher_code();
        assert!(code.starts_with("LB-"));
        assert_eq!(code.len(), 13);
        assert!(code[3..].chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
