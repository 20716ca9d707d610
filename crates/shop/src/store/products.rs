//! Product table: catalog rows, stock counts and image collections.
//!
//! All mutations run under the table write lock, so stock
//! check-and-decrement is serializable per product and the image primacy
//! invariant (at most one primary image, and never zero primaries while
//! images exist) holds at every observable point.

use std::collections::{BTreeMap, BTreeSet};

use tokio::sync::RwLock;

use shotx_core::{ImageId, ProductId, round_money};

use crate::error::{Result, ShopError};
use crate::models::{NewProduct, Order, OrderItem, Product, ProductImage, ProductUpdate};

/// In-memory product table.
#[derive(Default)]
pub struct ProductStore {
    inner: RwLock<Table>,
}

#[derive(Default)]
struct Table {
    products: BTreeMap<ProductId, Product>,
    next_product_id: i32,
    next_image_id: i32,
}

impl Table {
    fn get(&self, id: ProductId) -> Result<&Product> {
        self.products
            .get(&id)
            .ok_or_else(|| ShopError::NotFound(format!("product {id}")))
    }

    fn get_mut(&mut self, id: ProductId) -> Result<&mut Product> {
        self.products
            .get_mut(&id)
            .ok_or_else(|| ShopError::NotFound(format!("product {id}")))
    }

    fn alloc_product_id(&mut self) -> ProductId {
        self.next_product_id += 1;
        ProductId::new(self.next_product_id)
    }

    fn alloc_image_id(&mut self) -> ImageId {
        self.next_image_id += 1;
        ImageId::new(self.next_image_id)
    }

    /// Resolve an image reference against the owning product, mapping a
    /// cross-product reference to `NotOwned` and an unknown id to `NotFound`.
    fn check_image_ownership(&self, product_id: ProductId, image_id: ImageId) -> Result<()> {
        let product = self.get(product_id)?;
        if product.image(image_id).is_some() {
            return Ok(());
        }
        if self
            .products
            .values()
            .any(|other| other.image(image_id).is_some())
        {
            return Err(ShopError::NotOwned {
                product_id,
                image_id,
            });
        }
        Err(ShopError::NotFound(format!("image {image_id}")))
    }
}

/// Renumber display order to a contiguous 0-based sequence in place.
fn renumber(images: &mut [ProductImage]) {
    images.sort_by_key(|img| img.display_order);
    for (position, image) in images.iter_mut().enumerate() {
        image.display_order = u32::try_from(position).unwrap_or(u32::MAX);
    }
}

impl ProductStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------
    // Catalog data access
    // -------------------------------------------------------------------

    /// Insert a new product. The price is normalized to two decimal places.
    pub async fn create(&self, new: NewProduct) -> Product {
        let mut table = self.inner.write().await;
        let id = table.alloc_product_id();
        let product = Product {
            id,
            name: new.name,
            description: new.description,
            price: round_money(new.price),
            stock: new.stock,
            image_url: None,
            images: Vec::new(),
        };
        table.products.insert(id, product.clone());
        product
    }

    /// Fetch a product by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the product does not exist.
    pub async fn get(&self, id: ProductId) -> Result<Product> {
        self.inner.read().await.get(id).cloned()
    }

    /// All products, ordered by id.
    pub async fn list(&self) -> Vec<Product> {
        self.inner.read().await.products.values().cloned().collect()
    }

    /// Apply a partial update. Absent fields are left untouched.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the product does not exist.
    pub async fn update(&self, id: ProductId, update: ProductUpdate) -> Result<Product> {
        let mut table = self.inner.write().await;
        let product = table.get_mut(id)?;
        if let Some(name) = update.name {
            product.name = name;
        }
        if let Some(description) = update.description {
            product.description = Some(description);
        }
        if let Some(price) = update.price {
            product.price = round_money(price);
        }
        if let Some(stock) = update.stock {
            product.stock = stock;
        }
        if let Some(image_url) = update.image_url {
            product.image_url = Some(image_url);
        }
        Ok(product.clone())
    }

    /// Delete a product and the images it owns.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the product does not exist.
    pub async fn delete(&self, id: ProductId) -> Result<()> {
        let mut table = self.inner.write().await;
        table
            .products
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| ShopError::NotFound(format!("product {id}")))
    }

    // -------------------------------------------------------------------
    // Stock ledger primitives
    // -------------------------------------------------------------------

    /// Whether at least `quantity` units are available.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the product does not exist.
    pub async fn has_sufficient_stock(&self, id: ProductId, quantity: u32) -> Result<bool> {
        let table = self.inner.read().await;
        Ok(table.get(id)?.stock >= quantity)
    }

    /// Current stock count.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the product does not exist.
    pub async fn stock_of(&self, id: ProductId) -> Result<u32> {
        let table = self.inner.read().await;
        Ok(table.get(id)?.stock)
    }

    /// Atomically decrement stock by `quantity`, all or nothing.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the product does not exist, or
    /// `InsufficientStock` (leaving the count untouched) if fewer than
    /// `quantity` units remain.
    pub async fn decrease_stock(&self, id: ProductId, quantity: u32) -> Result<Product> {
        let mut table = self.inner.write().await;
        let product = table.get_mut(id)?;
        product.stock = checked_decrement(product, quantity)?;
        Ok(product.clone())
    }

    /// Atomically decrement stock for every line of an order.
    ///
    /// Quantities for repeated products are summed before checking, and no
    /// product is decremented unless every product can be.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `InsufficientStock` without applying any
    /// decrement.
    pub async fn decrease_stock_for_items(&self, items: &[(ProductId, u32)]) -> Result<()> {
        let mut wanted: BTreeMap<ProductId, u32> = BTreeMap::new();
        for (product_id, quantity) in items {
            *wanted.entry(*product_id).or_default() += quantity;
        }

        let mut table = self.inner.write().await;
        for (product_id, quantity) in &wanted {
            let product = table.get(*product_id)?;
            checked_decrement(product, *quantity)?;
        }
        for (product_id, quantity) in &wanted {
            let product = table.get_mut(*product_id)?;
            product.stock -= quantity;
        }
        Ok(())
    }

    /// Availability-check and price-snapshot every desired line under one
    /// guard: the pricing step of order building.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `InsufficientStock` for the first failing
    /// line; no snapshot is produced in that case.
    pub async fn quote_items(&self, items: &[(ProductId, u32)]) -> Result<Vec<OrderItem>> {
        let table = self.inner.read().await;
        for (product_id, quantity) in items {
            let product = table.get(*product_id)?;
            if product.stock < *quantity {
                return Err(ShopError::InsufficientStock {
                    product_id: *product_id,
                    requested: *quantity,
                    available: product.stock,
                });
            }
        }
        items
            .iter()
            .map(|(product_id, quantity)| {
                let product = table.get(*product_id)?;
                Ok(OrderItem {
                    product_id: *product_id,
                    quantity: *quantity,
                    unit_price: product.price,
                })
            })
            .collect()
    }

    /// Re-check availability for every line of an already-priced order.
    /// Used by tests and diagnostics; the PAID transition relies on
    /// [`Self::decrease_stock_for_items`] instead.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if any product has disappeared.
    pub async fn order_is_fulfillable(&self, order: &Order) -> Result<bool> {
        let table = self.inner.read().await;
        for item in &order.items {
            if table.get(item.product_id)?.stock < item.quantity {
                return Ok(false);
            }
        }
        Ok(true)
    }

    // -------------------------------------------------------------------
    // Image mutations
    // -------------------------------------------------------------------

    /// Append an image to a product's gallery.
    ///
    /// The first image of a product always becomes primary, whatever the
    /// flag says; a product with images must never have zero primaries.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the product does not exist.
    pub async fn add_image(
        &self,
        product_id: ProductId,
        image_url: String,
        is_primary: bool,
    ) -> Result<Product> {
        let mut table = self.inner.write().await;
        let image_id = table.alloc_image_id();
        let product = table.get_mut(product_id)?;

        let make_primary = is_primary || product.images.is_empty();
        if make_primary {
            for image in &mut product.images {
                image.is_primary = false;
            }
            product.image_url = Some(image_url.clone());
        }

        let display_order = u32::try_from(product.images.len()).unwrap_or(u32::MAX);
        product.images.push(ProductImage {
            id: image_id,
            image_url,
            is_primary: make_primary,
            display_order,
        });
        Ok(product.clone())
    }

    /// Make exactly one image primary: clear every flag, then set the
    /// chosen one, all under a single write guard.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the product or image is missing, `NotOwned`
    /// if the image belongs to a different product.
    pub async fn set_primary_image(
        &self,
        product_id: ProductId,
        image_id: ImageId,
    ) -> Result<Product> {
        let mut table = self.inner.write().await;
        table.check_image_ownership(product_id, image_id)?;

        let product = table.get_mut(product_id)?;
        for image in &mut product.images {
            image.is_primary = false;
        }
        let chosen = product
            .images
            .iter_mut()
            .find(|img| img.id == image_id)
            .ok_or_else(|| ShopError::NotFound(format!("image {image_id}")))?;
        chosen.is_primary = true;
        product.image_url = Some(chosen.image_url.clone());
        Ok(product.clone())
    }

    /// Remove an image, promote a successor primary if needed, and
    /// renumber the survivors contiguously from 0.
    ///
    /// Returns the updated product and the removed image's URL so the
    /// caller can release the blob.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the product or image is missing, `NotOwned`
    /// if the image belongs to a different product.
    pub async fn remove_image(
        &self,
        product_id: ProductId,
        image_id: ImageId,
    ) -> Result<(Product, String)> {
        let mut table = self.inner.write().await;
        table.check_image_ownership(product_id, image_id)?;

        let product = table.get_mut(product_id)?;
        let index = product
            .images
            .iter()
            .position(|img| img.id == image_id)
            .ok_or_else(|| ShopError::NotFound(format!("image {image_id}")))?;
        let removed = product.images.remove(index);

        renumber(&mut product.images);
        if removed.is_primary {
            // Promote the lowest display-order survivor.
            if let Some(successor) = product.images.first_mut() {
                successor.is_primary = true;
                product.image_url = Some(successor.image_url.clone());
            }
        }
        if product.images.is_empty() {
            product.image_url = None;
        }
        Ok((product.clone(), removed.image_url))
    }

    /// Assign display order by position in `ordered`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the product does not exist, `Mismatch` unless
    /// `ordered` names exactly the product's current image ids.
    pub async fn reorder_images(
        &self,
        product_id: ProductId,
        ordered: &[ImageId],
    ) -> Result<Product> {
        let mut table = self.inner.write().await;
        let product = table.get_mut(product_id)?;

        let current: BTreeSet<ImageId> = product.images.iter().map(|img| img.id).collect();
        let requested: BTreeSet<ImageId> = ordered.iter().copied().collect();
        if requested.len() != ordered.len() || current != requested {
            return Err(ShopError::Mismatch { product_id });
        }

        for (position, image_id) in ordered.iter().enumerate() {
            if let Some(image) = product.images.iter_mut().find(|img| img.id == *image_id) {
                image.display_order = u32::try_from(position).unwrap_or(u32::MAX);
            }
        }
        product.images.sort_by_key(|img| img.display_order);
        Ok(product.clone())
    }
}

/// Validate a single decrement without applying it.
fn checked_decrement(product: &Product, quantity: u32) -> Result<u32> {
    product
        .stock
        .checked_sub(quantity)
        .ok_or(ShopError::InsufficientStock {
            product_id: product.id,
            requested: quantity,
            available: product.stock,
        })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn new_product(name: &str, price_cents: i64, stock: u32) -> NewProduct {
        NewProduct {
            name: name.to_owned(),
            description: None,
            price: Decimal::new(price_cents, 2),
            stock,
        }
    }

    #[tokio::test]
    async fn create_normalizes_price_scale() {
        let store = ProductStore::new();
        let product = store
            .create(NewProduct {
                name: "widget".to_owned(),
                description: None,
                price: Decimal::new(19_995, 3), // 19.995 -> 20.00
                stock: 1,
            })
            .await;
        assert_eq!(product.price, Decimal::new(2000, 2));
    }

    #[tokio::test]
    async fn decrement_is_all_or_nothing_per_product() {
        let store = ProductStore::new();
        let product = store.create(new_product("widget", 1000, 5)).await;

        let err = store.decrease_stock(product.id, 6).await.unwrap_err();
        assert!(matches!(err, ShopError::InsufficientStock { available: 5, .. }));
        assert_eq!(store.stock_of(product.id).await.expect("exists"), 5);

        let updated = store.decrease_stock(product.id, 5).await.expect("enough");
        assert_eq!(updated.stock, 0);
    }

    #[tokio::test]
    async fn multi_item_decrement_applies_nothing_on_failure() {
        let store = ProductStore::new();
        let a = store.create(new_product("a", 1000, 10)).await;
        let b = store.create(new_product("b", 2000, 1)).await;

        let err = store
            .decrease_stock_for_items(&[(a.id, 3), (b.id, 2)])
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::InsufficientStock { .. }));
        assert_eq!(store.stock_of(a.id).await.expect("exists"), 10);
        assert_eq!(store.stock_of(b.id).await.expect("exists"), 1);
    }

    #[tokio::test]
    async fn repeated_products_are_summed_before_checking() {
        let store = ProductStore::new();
        let a = store.create(new_product("a", 1000, 5)).await;

        // 3 + 3 = 6 > 5, even though each line alone would fit.
        let err = store
            .decrease_stock_for_items(&[(a.id, 3), (a.id, 3)])
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::InsufficientStock { .. }));
        assert_eq!(store.stock_of(a.id).await.expect("exists"), 5);
    }

    #[tokio::test]
    async fn first_image_is_always_primary() {
        let store = ProductStore::new();
        let product = store.create(new_product("a", 1000, 1)).await;
        let product = store
            .add_image(product.id, "/uploads/one.png".to_owned(), false)
            .await
            .expect("product exists");
        assert!(product.images.first().is_some_and(|img| img.is_primary));
        assert_eq!(product.image_url.as_deref(), Some("/uploads/one.png"));
    }

    #[tokio::test]
    async fn deleting_primary_promotes_lowest_display_order() {
        let store = ProductStore::new();
        let product = store.create(new_product("a", 1000, 1)).await;
        let id = product.id;
        store
            .add_image(id, "/uploads/a.png".to_owned(), true)
            .await
            .expect("add a");
        store
            .add_image(id, "/uploads/b.png".to_owned(), false)
            .await
            .expect("add b");
        let product = store
            .add_image(id, "/uploads/c.png".to_owned(), false)
            .await
            .expect("add c");

        let primary_id = product.primary_image().expect("has primary").id;
        let (product, removed_url) = store.remove_image(id, primary_id).await.expect("remove");
        assert_eq!(removed_url, "/uploads/a.png");
        assert_eq!(product.images.len(), 2);
        let orders: Vec<u32> = product.images.iter().map(|img| img.display_order).collect();
        assert_eq!(orders, vec![0, 1]);
        assert_eq!(
            product.images.iter().filter(|img| img.is_primary).count(),
            1
        );
        assert_eq!(product.image_url.as_deref(), Some("/uploads/b.png"));
    }

    #[tokio::test]
    async fn removing_last_image_clears_legacy_url() {
        let store = ProductStore::new();
        let product = store.create(new_product("a", 1000, 1)).await;
        let product = store
            .add_image(product.id, "/uploads/only.png".to_owned(), true)
            .await
            .expect("add");
        let image_id = product.images.first().expect("one image").id;
        let (product, _) = store
            .remove_image(product.id, image_id)
            .await
            .expect("remove");
        assert!(product.images.is_empty());
        assert_eq!(product.image_url, None);
    }

    #[tokio::test]
    async fn reorder_rejects_wrong_id_sets() {
        let store = ProductStore::new();
        let product = store.create(new_product("a", 1000, 1)).await;
        let id = product.id;
        let product = store
            .add_image(id, "/uploads/a.png".to_owned(), true)
            .await
            .expect("add");
        let only = product.images.first().expect("one image").id;

        // Missing ids
        assert!(matches!(
            store.reorder_images(id, &[]).await.unwrap_err(),
            ShopError::Mismatch { .. }
        ));
        // Duplicated ids
        assert!(matches!(
            store.reorder_images(id, &[only, only]).await.unwrap_err(),
            ShopError::Mismatch { .. }
        ));
        // Foreign ids
        assert!(matches!(
            store
                .reorder_images(id, &[ImageId::new(999)])
                .await
                .unwrap_err(),
            ShopError::Mismatch { .. }
        ));
    }

    #[tokio::test]
    async fn cross_product_image_reference_is_not_owned() {
        let store = ProductStore::new();
        let a = store.create(new_product("a", 1000, 1)).await;
        let b = store.create(new_product("b", 1000, 1)).await;
        let b = store
            .add_image(b.id, "/uploads/b.png".to_owned(), true)
            .await
            .expect("add");
        let foreign = b.images.first().expect("one image").id;

        let err = store.set_primary_image(a.id, foreign).await.unwrap_err();
        assert!(matches!(err, ShopError::NotOwned { .. }));
        let err = store.remove_image(a.id, foreign).await.unwrap_err();
        assert!(matches!(err, ShopError::NotOwned { .. }));
    }
}
