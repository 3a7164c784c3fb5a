//! Checkout flow integration tests: totals, promotions, address handling,
//! atomic rollback and the points credit.

mod common;

use chrono::{Duration, Utc};
use common::TestCtx;
use logicbuilders_api::{
    entities::{cart_item, order, promotion::PromotionKind, shipping_address},
    errors::ServiceError,
    services::carts::AddCartItemInput,
    services::checkout::{AddressSelection, PlaceOrderInput},
    services::promotions::CreatePromotionInput,
};
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use uuid::Uuid;

fn inline_address() -> AddressSelection {
    AddressSelection::Inline {
        address: "1 Main St".into(),
        city: "Springfield".into(),
        zip_code: "12345".into(),
        country: "US".into(),
    }
}

fn order_input(address: AddressSelection, promo: Option<&str>) -> PlaceOrderInput {
    PlaceOrderInput {
        payment_method: "card".into(),
        address,
        promo_code: promo.map(str::to_string),
        voucher_code: None,
    }
}

/// Seeds a customer cart with 2 x 10.00 and 1 x 5.00, subtotal 25.00.
async fn seed_cart(ctx: &TestCtx, customer_id: Uuid) {
    let category = ctx.seed_category("Video Card").await;
    let gpu = ctx
        .seed_product("GT 1030", category, dec!(10.00), 10, true)
        .await;
    let cable = ctx
        .seed_product("HDMI Cable", category, dec!(5.00), 10, true)
        .await;

    ctx.services
        .cart
        .add_item(
            customer_id,
            AddCartItemInput {
                product_id: Some(gpu),
                build_id: None,
                quantity: 2,
            },
        )
        .await
        .expect("add gpu");
    ctx.services
        .cart
        .add_item(
            customer_id,
            AddCartItemInput {
                product_id: Some(cable),
                build_id: None,
                quantity: 1,
            },
        )
        .await
        .expect("add cable");
}

#[tokio::test]
async fn checkout_totals_and_points() {
    let ctx = TestCtx::new().await;
    let customer_id = Uuid::new_v4();
    seed_cart(&ctx, customer_id).await;

    let placed = ctx
        .services
        .checkout
        .place_order(customer_id, order_input(inline_address(), None))
        .await
        .expect("checkout");

    // subtotal 25.00 + delivery 10.00
    assert_eq!(placed.total_price, dec!(35.00));
    assert!(placed.order_number.starts_with("LB-"));
    assert_eq!(placed.points_earned, 35);

    let summary = ctx
        .services
        .points
        .get_summary(customer_id)
        .await
        .expect("points summary");
    assert_eq!(summary.balance, 35);

    // Cart is emptied by the same transaction.
    let remaining = cart_item::Entity::find()
        .count(ctx.db.as_ref())
        .await
        .expect("count cart items");
    assert_eq!(remaining, 0);

    let stored = order::Entity::find_by_id(placed.order_id)
        .one(ctx.db.as_ref())
        .await
        .expect("load order")
        .expect("order exists");
    assert_eq!(stored.status, order::OrderStatus::Pending);
    assert_eq!(stored.subtotal, dec!(25.00));
    assert_eq!(stored.delivery_charge, dec!(10.00));
}

#[tokio::test]
async fn checkout_rejects_empty_cart() {
    let ctx = TestCtx::new().await;
    let customer_id = Uuid::new_v4();

    let err = ctx
        .services
        .checkout
        .place_order(customer_id, order_input(inline_address(), None))
        .await
        .expect_err("empty cart must fail");
    assert!(matches!(err, ServiceError::InvalidOperation(_)));
}

#[tokio::test]
async fn active_promo_discounts_the_subtotal() {
    let ctx = TestCtx::new().await;
    let customer_id = Uuid::new_v4();
    seed_cart(&ctx, customer_id).await;
    ctx.seed_percentage_promo("SAVE10", dec!(10)).await;

    let placed = ctx
        .services
        .checkout
        .place_order(customer_id, order_input(inline_address(), Some("SAVE10")))
        .await
        .expect("checkout with promo");

    // 25.00 - 2.50 + 10.00
    assert_eq!(placed.total_price, dec!(32.500));

    let stored = order::Entity::find_by_id(placed.order_id)
        .one(ctx.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.discount_total, dec!(2.500));
    assert!(stored.promotion_id.is_some());
}

#[tokio::test]
async fn expired_promo_is_silently_ignored() {
    let ctx = TestCtx::new().await;
    let customer_id = Uuid::new_v4();
    seed_cart(&ctx, customer_id).await;

    ctx.services
        .promotions
        .create_promotion(CreatePromotionInput {
            code: "OLD10".into(),
            kind: PromotionKind::Percentage,
            value: dec!(10),
            min_order_value: None,
            max_discount: None,
            usage_limit: None,
            starts_at: Utc::now() - Duration::days(10),
            ends_at: Utc::now() - Duration::days(1),
        })
        .await
        .expect("create expired promotion");

    let placed = ctx
        .services
        .checkout
        .place_order(customer_id, order_input(inline_address(), Some("OLD10")))
        .await
        .expect("checkout still succeeds");

    assert_eq!(placed.total_price, dec!(35.00));
}

#[tokio::test]
async fn unknown_promo_is_silently_ignored() {
    let ctx = TestCtx::new().await;
    let customer_id = Uuid::new_v4();
    seed_cart(&ctx, customer_id).await;

    let placed = ctx
        .services
        .checkout
        .place_order(customer_id, order_input(inline_address(), Some("NOPE")))
        .await
        .expect("checkout still succeeds");
    assert_eq!(placed.total_price, dec!(35.00));
}

#[tokio::test]
async fn inline_addresses_are_deduplicated() {
    let ctx = TestCtx::new().await;
    let customer_id = Uuid::new_v4();

    seed_cart(&ctx, customer_id).await;
    ctx.services
        .checkout
        .place_order(customer_id, order_input(inline_address(), None))
        .await
        .expect("first checkout");

    seed_cart(&ctx, customer_id).await;
    ctx.services
        .checkout
        .place_order(customer_id, order_input(inline_address(), None))
        .await
        .expect("second checkout");

    let addresses = shipping_address::Entity::find()
        .filter(shipping_address::Column::CustomerId.eq(customer_id))
        .count(ctx.db.as_ref())
        .await
        .expect("count addresses");
    assert_eq!(addresses, 1);
}

#[tokio::test]
async fn saved_address_of_another_customer_is_rejected() {
    let ctx = TestCtx::new().await;
    let owner = Uuid::new_v4();
    let intruder = Uuid::new_v4();

    seed_cart(&ctx, owner).await;
    ctx.services
        .checkout
        .place_order(owner, order_input(inline_address(), None))
        .await
        .expect("owner checkout");

    let address = shipping_address::Entity::find()
        .filter(shipping_address::Column::CustomerId.eq(owner))
        .one(ctx.db.as_ref())
        .await
        .unwrap()
        .unwrap();

    seed_cart(&ctx, intruder).await;
    let err = ctx
        .services
        .checkout
        .place_order(
            intruder,
            order_input(
                AddressSelection::Saved {
                    shipping_address_id: address.id,
                },
                None,
            ),
        )
        .await
        .expect_err("must not use another customer's address");
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn failed_checkout_leaves_no_partial_state() {
    let ctx = TestCtx::new().await;
    let customer_id = Uuid::new_v4();
    seed_cart(&ctx, customer_id).await;

    // An unknown voucher code is an error, unlike promo codes.
    let err = ctx
        .services
        .checkout
        .place_order(
            customer_id,
            PlaceOrderInput {
                payment_method: "card".into(),
                address: inline_address(),
                promo_code: None,
                voucher_code: Some("LB-DOESNOTEXIST".into()),
            },
        )
        .await
        .expect_err("bad voucher must fail checkout");
    assert!(matches!(err, ServiceError::NotFound(_)));

    // No order was written and the cart survives intact.
    let orders = order::Entity::find()
        .count(ctx.db.as_ref())
        .await
        .expect("count orders");
    assert_eq!(orders, 0);

    let items = cart_item::Entity::find()
        .count(ctx.db.as_ref())
        .await
        .expect("count cart items");
    assert_eq!(items, 2);

    let summary = ctx
        .services
        .points
        .get_summary(customer_id)
        .await
        .expect("points summary");
    assert_eq!(summary.balance, 0);
}

#[tokio::test]
async fn unavailable_product_fails_the_whole_checkout() {
    let ctx = TestCtx::new().await;
    let customer_id = Uuid::new_v4();
    seed_cart(&ctx, customer_id).await;

    // Flip one carted product to unavailable after it was added.
    let item = cart_item::Entity::find()
        .one(ctx.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    let product_id = item.product_id.unwrap();
    ctx.services
        .catalog
        .update_product(
            product_id,
            logicbuilders_api::services::catalog::UpdateProductInput {
                availability: Some(false),
                ..Default::default()
            },
        )
        .await
        .expect("update product");

    let err = ctx
        .services
        .checkout
        .place_order(customer_id, order_input(inline_address(), None))
        .await
        .expect_err("unavailable product must fail checkout");
    assert!(matches!(err, ServiceError::ProductUnavailable(_)));

    let orders = order::Entity::find()
        .count(ctx.db.as_ref())
        .await
        .expect("count orders");
    assert_eq!(orders, 0);
}
