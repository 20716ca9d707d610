//! Image primacy: at most one primary image per product, always.

use std::sync::Arc;

use shotx_core::ImageId;
use shotx_shop::ShopError;
use shotx_shop::models::Product;

use shotx_integration_tests::{TestShop, seed_product, test_shop};

fn primary_count(product: &Product) -> usize {
    product.images.iter().filter(|img| img.is_primary).count()
}

fn display_orders(product: &Product) -> Vec<u32> {
    product.images.iter().map(|img| img.display_order).collect()
}

/// Seed a product with a three-image gallery: A (primary), B, C.
async fn gallery(harness: &TestShop) -> Product {
    let product = seed_product(&harness.shop, "camera", 49_900, 3).await;
    for (name, primary) in [("a", true), ("b", false), ("c", false)] {
        harness
            .shop
            .images
            .add_image(product.id, name.as_bytes(), "image/png", primary)
            .await
            .expect("adds");
    }
    harness.shop.products.get(product.id).await.expect("exists")
}

#[tokio::test]
async fn deleting_the_primary_promotes_and_renumbers() {
    // Scenario D: [A(primary), B, C] -> delete A -> B primary, orders [0, 1].
    let harness = test_shop();
    let product = gallery(&harness).await;
    let a = product.primary_image().expect("has primary").id;
    let b = product.images.get(1).expect("three images").id;

    let product = harness
        .shop
        .images
        .delete_image(product.id, a)
        .await
        .expect("deletes");

    assert_eq!(product.images.len(), 2);
    assert_eq!(display_orders(&product), vec![0, 1]);
    assert_eq!(primary_count(&product), 1);
    let primary = product.primary_image().expect("one primary");
    assert_eq!(primary.id, b);
    assert_eq!(product.image_url.as_deref(), Some(primary.image_url.as_str()));
}

#[tokio::test]
async fn set_primary_always_leaves_exactly_one() {
    let harness = test_shop();
    let product = gallery(&harness).await;
    let ids: Vec<ImageId> = product.images.iter().map(|img| img.id).collect();

    for id in &ids {
        let product = harness
            .shop
            .images
            .set_primary(product.id, *id)
            .await
            .expect("sets");
        assert_eq!(primary_count(&product), 1);
        assert_eq!(product.primary_image().expect("one primary").id, *id);
    }
}

#[tokio::test]
async fn any_mutation_sequence_keeps_the_invariant() {
    let harness = test_shop();
    let product = gallery(&harness).await;
    let ids: Vec<ImageId> = product.images.iter().map(|img| img.id).collect();
    let first = *ids.first().expect("three images");
    let second = *ids.get(1).expect("three images");
    let third = *ids.get(2).expect("three images");

    harness
        .shop
        .images
        .set_primary(product.id, third)
        .await
        .expect("sets");
    harness
        .shop
        .images
        .reorder(product.id, &[third, first, second])
        .await
        .expect("reorders");
    harness
        .shop
        .images
        .delete_image(product.id, third)
        .await
        .expect("deletes");
    let updated = harness
        .shop
        .images
        .add_image(product.id, b"d", "image/png", false)
        .await
        .expect("adds");

    assert_eq!(primary_count(&updated), 1);
    assert_eq!(display_orders(&updated), vec![0, 1, 2]);
}

#[tokio::test]
async fn reorder_assigns_positions_from_the_sequence() {
    let harness = test_shop();
    let product = gallery(&harness).await;
    let ids: Vec<ImageId> = product.images.iter().map(|img| img.id).collect();
    let reversed: Vec<ImageId> = ids.iter().rev().copied().collect();

    let product = harness
        .shop
        .images
        .reorder(product.id, &reversed)
        .await
        .expect("reorders");

    let new_order: Vec<ImageId> = product.images.iter().map(|img| img.id).collect();
    assert_eq!(new_order, reversed);
    assert_eq!(display_orders(&product), vec![0, 1, 2]);
    assert_eq!(primary_count(&product), 1, "reorder never touches primacy");
}

#[tokio::test]
async fn reorder_rejects_a_different_id_set() {
    let harness = test_shop();
    let product = gallery(&harness).await;
    let ids: Vec<ImageId> = product.images.iter().map(|img| img.id).collect();
    let mut wrong = ids.clone();
    wrong.pop();

    let err = harness
        .shop
        .images
        .reorder(product.id, &wrong)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::Mismatch { .. }));

    let mut foreign = ids;
    if let Some(last) = foreign.last_mut() {
        *last = ImageId::new(9999);
    }
    let err = harness
        .shop
        .images
        .reorder(product.id, &foreign)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::Mismatch { .. }));
}

#[tokio::test]
async fn images_of_other_products_are_not_ours_to_edit() {
    let harness = test_shop();
    let ours = gallery(&harness).await;
    let theirs = seed_product(&harness.shop, "tripod", 9900, 1).await;
    let theirs = harness
        .shop
        .images
        .add_image(theirs.id, b"t", "image/png", true)
        .await
        .expect("adds");
    let foreign = theirs.images.first().expect("one image").id;

    let err = harness
        .shop
        .images
        .set_primary(ours.id, foreign)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::NotOwned { .. }));

    let err = harness
        .shop
        .images
        .delete_image(ours.id, foreign)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::NotOwned { .. }));

    let err = harness
        .shop
        .images
        .set_primary(ours.id, ImageId::new(9999))
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::NotFound(_)));
}

#[tokio::test]
async fn deleting_an_image_releases_its_blob() {
    let harness = test_shop();
    let product = seed_product(&harness.shop, "camera", 49_900, 1).await;
    let product = harness
        .shop
        .images
        .add_image(product.id, b"bytes", "image/png", true)
        .await
        .expect("adds");
    assert_eq!(harness.blobs.len(), 1);

    let image_id = product.images.first().expect("one image").id;
    harness
        .shop
        .images
        .delete_image(product.id, image_id)
        .await
        .expect("deletes");
    assert!(harness.blobs.is_empty());
}

#[tokio::test]
async fn concurrent_set_primary_calls_serialize() {
    let harness = test_shop();
    let product = gallery(&harness).await;
    let ids: Vec<ImageId> = product.images.iter().map(|img| img.id).collect();

    let mut handles = Vec::new();
    for id in ids {
        let shop = Arc::clone(&harness.shop);
        let product_id = product.id;
        handles.push(tokio::spawn(async move {
            shop.images.set_primary(product_id, id).await
        }));
    }
    for handle in handles {
        handle.await.expect("task completes").expect("sets");
    }

    let product = harness.shop.products.get(product.id).await.expect("exists");
    assert_eq!(
        primary_count(&product),
        1,
        "never zero, never more than one primary"
    );
}
