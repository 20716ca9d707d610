//! Cart behavior: lazy creation, merge semantics, advisory stock checks.

use std::sync::Arc;

use shotx_core::ProductId;
use shotx_shop::ShopError;

use shotx_integration_tests::{seed_product, test_shop, user};

#[tokio::test]
async fn get_or_create_is_idempotent() {
    let harness = test_shop();
    let alice = user("alice");

    let first = harness.shop.carts.get_or_create(&alice).await;
    assert!(first.items.is_empty());

    let second = harness.shop.carts.get_or_create(&alice).await;
    assert_eq!(second.id, first.id);
    assert!(second.items.is_empty());
}

#[tokio::test]
async fn users_get_distinct_carts() {
    let harness = test_shop();
    let alice = harness.shop.carts.get_or_create(&user("alice")).await;
    let bob = harness.shop.carts.get_or_create(&user("bob")).await;
    assert_ne!(alice.id, bob.id);
}

#[tokio::test]
async fn repeated_adds_merge_against_total_stock() {
    // Scenario A: stock 5, add 3, then 3 more. The second add must fail
    // because 3 + 3 = 6 > 5, and the cart must still hold 3.
    let harness = test_shop();
    let alice = user("alice");
    let product = seed_product(&harness.shop, "gadget", 1999, 5).await;

    let cart = harness
        .shop
        .carts
        .add_or_merge(&alice, product.id, 3)
        .await
        .expect("first add fits");
    assert_eq!(cart.item_quantity(product.id), 3);

    let err = harness
        .shop
        .carts
        .add_or_merge(&alice, product.id, 3)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ShopError::InsufficientStock {
            requested: 6,
            available: 5,
            ..
        }
    ));

    let cart = harness.shop.carts.get_or_create(&alice).await;
    assert_eq!(cart.item_quantity(product.id), 3);
}

#[tokio::test]
async fn merging_sums_quantities_into_one_line() {
    let harness = test_shop();
    let alice = user("alice");
    let product = seed_product(&harness.shop, "gadget", 1999, 10).await;

    harness
        .shop
        .carts
        .add_or_merge(&alice, product.id, 2)
        .await
        .expect("fits");
    let cart = harness
        .shop
        .carts
        .add_or_merge(&alice, product.id, 1)
        .await
        .expect("fits");

    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.item_quantity(product.id), 3);
}

#[tokio::test]
async fn zero_quantity_is_rejected() {
    let harness = test_shop();
    let alice = user("alice");
    let product = seed_product(&harness.shop, "gadget", 1999, 10).await;

    for result in [
        harness.shop.carts.add_or_merge(&alice, product.id, 0).await,
        harness.shop.carts.set_quantity(&alice, product.id, 0).await,
    ] {
        assert!(matches!(result.unwrap_err(), ShopError::InvalidQuantity));
    }
}

#[tokio::test]
async fn unknown_products_cannot_be_added() {
    let harness = test_shop();
    let err = harness
        .shop
        .carts
        .add_or_merge(&user("alice"), ProductId::new(404), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::NotFound(_)));
}

#[tokio::test]
async fn set_quantity_replaces_rather_than_adds() {
    let harness = test_shop();
    let alice = user("alice");
    let product = seed_product(&harness.shop, "gadget", 1999, 10).await;

    harness
        .shop
        .carts
        .add_or_merge(&alice, product.id, 4)
        .await
        .expect("fits");
    let cart = harness
        .shop
        .carts
        .set_quantity(&alice, product.id, 2)
        .await
        .expect("fits");
    assert_eq!(cart.item_quantity(product.id), 2);

    let err = harness
        .shop
        .carts
        .set_quantity(&alice, product.id, 11)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::InsufficientStock { .. }));
    let cart = harness.shop.carts.get_or_create(&alice).await;
    assert_eq!(cart.item_quantity(product.id), 2);
}

#[tokio::test]
async fn removing_an_absent_line_is_a_no_op() {
    let harness = test_shop();
    let alice = user("alice");
    let product = seed_product(&harness.shop, "gadget", 1999, 10).await;

    let cart = harness.shop.carts.remove_item(&alice, product.id).await;
    assert!(cart.items.is_empty());

    harness
        .shop
        .carts
        .add_or_merge(&alice, product.id, 1)
        .await
        .expect("fits");
    let cart = harness.shop.carts.remove_item(&alice, product.id).await;
    assert!(cart.items.is_empty());
}

#[tokio::test]
async fn cart_operations_never_touch_stock() {
    let harness = test_shop();
    let alice = user("alice");
    let product = seed_product(&harness.shop, "gadget", 1999, 5).await;

    harness
        .shop
        .carts
        .add_or_merge(&alice, product.id, 3)
        .await
        .expect("fits");
    harness
        .shop
        .carts
        .set_quantity(&alice, product.id, 5)
        .await
        .expect("fits");
    harness.shop.carts.remove_item(&alice, product.id).await;

    assert_eq!(
        harness.shop.products.stock_of(product.id).await.expect("exists"),
        5
    );
}

#[tokio::test]
async fn concurrent_merges_on_one_line_lose_no_updates() {
    let harness = test_shop();
    let product = seed_product(&harness.shop, "gadget", 1999, 100).await;
    let alice = user("alice");

    let mut handles = Vec::new();
    for _ in 0..10 {
        let shop = Arc::clone(&harness.shop);
        let alice = alice.clone();
        handles.push(tokio::spawn(async move {
            shop.carts.add_or_merge(&alice, product.id, 1).await
        }));
    }
    for handle in handles {
        handle.await.expect("task completes").expect("add fits");
    }

    let cart = harness.shop.carts.get_or_create(&alice).await;
    assert_eq!(cart.item_quantity(product.id), 10);
}
