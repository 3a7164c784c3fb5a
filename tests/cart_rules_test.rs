//! Cart invariants: line exclusivity, stock checks, ownership, merging.

mod common;

use common::TestCtx;
use logicbuilders_api::{
    entities::cart_item, errors::ServiceError, services::carts::AddCartItemInput,
};
use rust_decimal_macros::dec;
use sea_orm::{EntityTrait, PaginatorTrait};
use uuid::Uuid;

#[tokio::test]
async fn both_ids_rejected_before_any_write() {
    let ctx = TestCtx::new().await;
    let customer_id = Uuid::new_v4();
    let category = ctx.seed_category("Memory").await;
    let product = ctx
        .seed_product("16GB DDR5", category, dec!(50.00), 5, true)
        .await;

    let err = ctx
        .services
        .cart
        .add_item(
            customer_id,
            AddCartItemInput {
                product_id: Some(product),
                build_id: Some(Uuid::new_v4()),
                quantity: 1,
            },
        )
        .await
        .expect_err("both ids must be rejected");
    assert!(matches!(err, ServiceError::ValidationError(_)));

    let err = ctx
        .services
        .cart
        .add_item(
            customer_id,
            AddCartItemInput {
                product_id: None,
                build_id: None,
                quantity: 1,
            },
        )
        .await
        .expect_err("neither id must be rejected");
    assert!(matches!(err, ServiceError::ValidationError(_)));

    let rows = cart_item::Entity::find()
        .count(ctx.db.as_ref())
        .await
        .unwrap();
    assert_eq!(rows, 0);
}

#[tokio::test]
async fn add_checks_stock_and_availability() {
    let ctx = TestCtx::new().await;
    let customer_id = Uuid::new_v4();
    let category = ctx.seed_category("Memory").await;
    let low_stock = ctx
        .seed_product("8GB DDR4", category, dec!(25.00), 2, true)
        .await;
    let unavailable = ctx
        .seed_product("Discontinued DIMM", category, dec!(25.00), 10, false)
        .await;

    let err = ctx
        .services
        .cart
        .add_item(
            customer_id,
            AddCartItemInput {
                product_id: Some(low_stock),
                build_id: None,
                quantity: 3,
            },
        )
        .await
        .expect_err("3 > stock of 2");
    assert!(matches!(err, ServiceError::InsufficientStock(_)));

    let err = ctx
        .services
        .cart
        .add_item(
            customer_id,
            AddCartItemInput {
                product_id: Some(unavailable),
                build_id: None,
                quantity: 1,
            },
        )
        .await
        .expect_err("unavailable product");
    assert!(matches!(err, ServiceError::ProductUnavailable(_)));

    // Zero stock means the product is not purchasable at all.
    let sold_out = ctx
        .seed_product("Sold Out DIMM", category, dec!(25.00), 0, true)
        .await;
    let err = ctx
        .services
        .cart
        .add_item(
            customer_id,
            AddCartItemInput {
                product_id: Some(sold_out),
                build_id: None,
                quantity: 1,
            },
        )
        .await
        .expect_err("sold out product");
    assert!(matches!(err, ServiceError::ProductUnavailable(_)));
}

#[tokio::test]
async fn merged_quantity_cannot_exceed_stock() {
    let ctx = TestCtx::new().await;
    let customer_id = Uuid::new_v4();
    let category = ctx.seed_category("Memory").await;
    let product = ctx
        .seed_product("32GB DDR5", category, dec!(120.00), 5, true)
        .await;

    ctx.services
        .cart
        .add_item(
            customer_id,
            AddCartItemInput {
                product_id: Some(product),
                build_id: None,
                quantity: 3,
            },
        )
        .await
        .expect("first add within stock");

    // 3 already in the cart; another 3 would merge to 6 against a stock of 5.
    let err = ctx
        .services
        .cart
        .add_item(
            customer_id,
            AddCartItemInput {
                product_id: Some(product),
                build_id: None,
                quantity: 3,
            },
        )
        .await
        .expect_err("merged quantity exceeds stock");
    assert!(matches!(err, ServiceError::InsufficientStock(_)));

    // The line keeps its pre-merge quantity.
    let cart = ctx
        .services
        .cart
        .get_cart_with_items(customer_id)
        .await
        .expect("get cart");
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 3);

    // Merging up to the exact stock bound is still allowed.
    let merged = ctx
        .services
        .cart
        .add_item(
            customer_id,
            AddCartItemInput {
                product_id: Some(product),
                build_id: None,
                quantity: 2,
            },
        )
        .await
        .expect("merge to the stock bound");
    assert_eq!(merged.quantity, 5);
}

#[tokio::test]
async fn adding_the_same_product_merges_lines() {
    let ctx = TestCtx::new().await;
    let customer_id = Uuid::new_v4();
    let category = ctx.seed_category("Storage").await;
    let product = ctx
        .seed_product("1TB SSD", category, dec!(80.00), 10, true)
        .await;

    for _ in 0..2 {
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
            .expect("add");
    }

    let cart = ctx
        .services
        .cart
        .get_cart_with_items(customer_id)
        .await
        .expect("get cart");
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 2);
    assert_eq!(cart.subtotal, dec!(160.00));
}

#[tokio::test]
async fn items_of_other_customers_are_untouchable() {
    let ctx = TestCtx::new().await;
    let owner = Uuid::new_v4();
    let intruder = Uuid::new_v4();
    let category = ctx.seed_category("Storage").await;
    let product = ctx
        .seed_product("2TB HDD", category, dec!(60.00), 10, true)
        .await;

    let item = ctx
        .services
        .cart
        .add_item(
            owner,
            AddCartItemInput {
                product_id: Some(product),
                build_id: None,
                quantity: 1,
            },
        )
        .await
        .expect("add");

    // Other customers' items look like they do not exist.
    let err = ctx
        .services
        .cart
        .update_item_quantity(intruder, item.id, 5)
        .await
        .expect_err("not the owner");
    assert!(matches!(err, ServiceError::NotFound(_)));

    let err = ctx
        .services
        .cart
        .remove_item(intruder, item.id)
        .await
        .expect_err("not the owner");
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn quantity_update_and_removal() {
    let ctx = TestCtx::new().await;
    let customer_id = Uuid::new_v4();
    let category = ctx.seed_category("Storage").await;
    let product = ctx
        .seed_product("4TB HDD", category, dec!(100.00), 10, true)
        .await;

    let item = ctx
        .services
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
        .expect("add");

    let err = ctx
        .services
        .cart
        .update_item_quantity(customer_id, item.id, 0)
        .await
        .expect_err("zero quantity is invalid");
    assert!(matches!(err, ServiceError::ValidationError(_)));

    let updated = ctx
        .services
        .cart
        .update_item_quantity(customer_id, item.id, 4)
        .await
        .expect("update");
    assert_eq!(updated.quantity, 4);

    ctx.services
        .cart
        .remove_item(customer_id, item.id)
        .await
        .expect("remove");
    let cart = ctx
        .services
        .cart
        .get_cart_with_items(customer_id)
        .await
        .unwrap();
    assert!(cart.items.is_empty());
}
