//! Loyalty points redemption boundaries and voucher lifecycle.

mod common;

use common::TestCtx;
use logicbuilders_api::{
    errors::ServiceError,
    services::carts::AddCartItemInput,
    services::checkout::{AddressSelection, PlaceOrderInput},
};
use rust_decimal_macros::dec;
use uuid::Uuid;

fn checkout_input(voucher: Option<String>) -> PlaceOrderInput {
    PlaceOrderInput {
        payment_method: "card".into(),
        address: AddressSelection::Inline {
            address: "1 Main St".into(),
            city: "Springfield".into(),
            zip_code: "12345".into(),
            country: "US".into(),
        },
        promo_code: None,
        voucher_code: voucher,
    }
}

/// Earns the customer `orders` x 100 points by checking out carts with a
/// 90.00 product and 10.00 delivery each.
async fn earn_points(ctx: &TestCtx, customer_id: Uuid, orders: usize) {
    let category = ctx.seed_category("Case").await;
    let product = ctx
        .seed_product("ATX Tower", category, dec!(90.00), 1000, true)
        .await;
    for _ in 0..orders {
        ctx.services
            .cart
            .add_item(
                customer_id,
                AddCartItemInput {
                    product_id: Some(product),
                    build_id: None,
                    quantity: 1,
                },
            )
            .await
            .expect("add to cart");
        let placed = ctx
            .services
            .checkout
            .place_order(customer_id, checkout_input(None))
            .await
            .expect("checkout");
        assert_eq!(placed.points_earned, 100);
    }
}

#[tokio::test]
async fn non_multiple_of_100_is_rejected() {
    let ctx = TestCtx::new().await;
    let customer_id = Uuid::new_v4();
    earn_points(&ctx, customer_id, 2).await;

    let err = ctx
        .services
        .points
        .redeem(customer_id, 150)
        .await
        .expect_err("150 is not a multiple of 100");
    assert!(matches!(err, ServiceError::InvalidOperation(_)));

    for bad in [0, -100, 50] {
        assert!(ctx.services.points.redeem(customer_id, bad).await.is_err());
    }

    // Balance untouched.
    let summary = ctx.services.points.get_summary(customer_id).await.unwrap();
    assert_eq!(summary.balance, 200);
}

#[tokio::test]
async fn redemption_above_balance_is_rejected() {
    let ctx = TestCtx::new().await;
    let customer_id = Uuid::new_v4();
    earn_points(&ctx, customer_id, 1).await;

    let err = ctx
        .services
        .points
        .redeem(customer_id, 200)
        .await
        .expect_err("balance is only 100");
    assert!(matches!(err, ServiceError::InvalidOperation(_)));

    let summary = ctx.services.points.get_summary(customer_id).await.unwrap();
    assert_eq!(summary.balance, 100);
}

#[tokio::test]
async fn successful_redemption_debits_and_mints_vouchers() {
    let ctx = TestCtx::new().await;
    let customer_id = Uuid::new_v4();
    earn_points(&ctx, customer_id, 3).await;

    let vouchers = ctx
        .services
        .points
        .redeem(customer_id, 200)
        .await
        .expect("redeem 200 of 300");

    assert_eq!(vouchers.len(), 2);
    for v in &vouchers {
        assert!(v.code.starts_with("LB-"));
        assert_eq!(v.discount_percent, dec!(10));
        assert!(!v.redeemed);
    }

    let summary = ctx.services.points.get_summary(customer_id).await.unwrap();
    assert_eq!(summary.balance, 100);
    assert_eq!(summary.total_redeemed, 200);

    // Ledger stays in lockstep with the balance.
    let history = ctx.services.points.history(customer_id).await.unwrap();
    let sum: i64 = history.iter().map(|t| t.delta).sum();
    assert_eq!(sum, summary.balance);
}

#[tokio::test]
async fn voucher_applies_once_at_checkout() {
    let ctx = TestCtx::new().await;
    let customer_id = Uuid::new_v4();
    earn_points(&ctx, customer_id, 1).await;

    let vouchers = ctx
        .services
        .points
        .redeem(customer_id, 100)
        .await
        .expect("redeem");
    let code = vouchers[0].code.clone();

    // 10% of 90.00 is 9.00, below the 50.00 cap.
    let category = ctx.seed_category("Power Supply").await;
    let product = ctx
        .seed_product("650W PSU", category, dec!(90.00), 10, true)
        .await;
    ctx.services
        .cart
        .add_item(
            customer_id,
            AddCartItemInput {
                product_id: Some(product),
                build_id: None,
                quantity: 1,
            },
        )
        .await
        .unwrap();

    let placed = ctx
        .services
        .checkout
        .place_order(customer_id, checkout_input(Some(code.clone())))
        .await
        .expect("checkout with voucher");
    assert_eq!(placed.total_price, dec!(91.00));

    // Second use is rejected.
    ctx.services
        .cart
        .add_item(
            customer_id,
            AddCartItemInput {
                product_id: Some(product),
                build_id: None,
                quantity: 1,
            },
        )
        .await
        .unwrap();
    let err = ctx
        .services
        .checkout
        .place_order(customer_id, checkout_input(Some(code)))
        .await
        .expect_err("voucher is single use");
    assert!(matches!(err, ServiceError::InvalidOperation(_)));
}
