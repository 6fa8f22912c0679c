//! Cart operations.

use std::collections::HashMap;

use sqlx::PgPool;
use tracing::instrument;

use clayhouse_core::{CartItemId, OptionId, ProductId, UserId};

use super::ShopError;
use crate::db::cart::MAX_LINE_QUANTITY;
use crate::db::{CartRepository, CatalogRepository, RepositoryError};
use crate::models::cart::{AddToCart, CartItem, CartLine, CartProduct};
use crate::models::product::{Product, ProductImage, ProductOption};

fn validate_quantity(quantity: i32) -> Result<(), ShopError> {
    if (1..=MAX_LINE_QUANTITY).contains(&quantity) {
        Ok(())
    } else {
        Err(ShopError::bad_request(format!(
            "quantity must be between 1 and {MAX_LINE_QUANTITY}"
        )))
    }
}

fn not_found(err: RepositoryError) -> ShopError {
    match err {
        RepositoryError::NotFound => ShopError::not_found("cart item"),
        other => ShopError::Repository(other),
    }
}

/// Cart service.
pub struct CartService<'a> {
    pool: &'a PgPool,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The caller's cart, newest first, with product, first image and option.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Repository` if a query fails.
    pub async fn lines(&self, user_id: UserId) -> Result<Vec<CartLine>, ShopError> {
        let items = CartRepository::new(self.pool).list(user_id).await?;
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let catalog = CatalogRepository::new(self.pool);
        let product_ids: Vec<ProductId> = items.iter().map(|i| i.product_id).collect();
        let option_ids: Vec<OptionId> = items.iter().filter_map(|i| i.option_id).collect();

        let (products, images, options) = tokio::try_join!(
            catalog.products_by_ids(&product_ids),
            catalog.first_images(&product_ids),
            catalog.options_by_ids(&option_ids),
        )?;

        assemble(items, products, images, options)
    }

    /// Add a product to the cart, merging with an existing line.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::BadRequest` for a bad quantity, an option of another
    /// product, or a merged quantity above the limit.
    /// Returns `ShopError::NotFound` if the product is missing or inactive.
    #[instrument(skip(self, input), fields(user_id = %user_id, product_id = %input.product_id))]
    pub async fn add(&self, user_id: UserId, input: &AddToCart) -> Result<CartItem, ShopError> {
        validate_quantity(input.quantity)?;

        let catalog = CatalogRepository::new(self.pool);
        let product = catalog
            .get_product(input.product_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| ShopError::not_found("product"))?;

        if let Some(option_id) = input.option_id {
            let belongs = catalog
                .get_option(option_id)
                .await?
                .is_some_and(|o| o.product_id == product.id);
            if !belongs {
                return Err(ShopError::bad_request("option does not belong to this product"));
            }
        }

        CartRepository::new(self.pool)
            .merge(user_id, product.id, input.option_id, input.quantity)
            .await
            .map_err(|e| match e {
                RepositoryError::ForeignKey(_) => ShopError::not_found("product"),
                other => ShopError::Repository(other),
            })?
            .ok_or_else(|| {
                ShopError::bad_request(format!(
                    "cart quantity cannot exceed {MAX_LINE_QUANTITY}"
                ))
            })
    }

    /// Set the quantity of one of the caller's lines.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::BadRequest` for a bad quantity.
    /// Returns `ShopError::NotFound` if the line is not the caller's.
    pub async fn set_quantity(
        &self,
        user_id: UserId,
        id: CartItemId,
        quantity: i32,
    ) -> Result<CartItem, ShopError> {
        validate_quantity(quantity)?;
        CartRepository::new(self.pool)
            .set_quantity(user_id, id, quantity)
            .await
            .map_err(not_found)
    }

    /// Remove one of the caller's lines and return it.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::NotFound` if the line is not the caller's.
    pub async fn remove(&self, user_id: UserId, id: CartItemId) -> Result<CartItem, ShopError> {
        CartRepository::new(self.pool)
            .remove(user_id, id)
            .await
            .map_err(not_found)
    }
}

/// Join cart rows with their products, images and options, keeping row order.
fn assemble(
    items: Vec<CartItem>,
    products: Vec<Product>,
    images: Vec<ProductImage>,
    options: Vec<ProductOption>,
) -> Result<Vec<CartLine>, ShopError> {
    let products: HashMap<ProductId, Product> = products.into_iter().map(|p| (p.id, p)).collect();
    let images: HashMap<ProductId, ProductImage> =
        images.into_iter().map(|i| (i.product_id, i)).collect();
    let options: HashMap<OptionId, ProductOption> = options.into_iter().map(|o| (o.id, o)).collect();

    items
        .into_iter()
        .map(|item| -> Result<CartLine, ShopError> {
            let product = products.get(&item.product_id).cloned().ok_or_else(|| {
                RepositoryError::DataCorruption(format!(
                    "cart item {} references missing product {}",
                    item.id, item.product_id
                ))
            })?;
            let option = item.option_id.and_then(|id| options.get(&id).cloned());
            Ok(CartLine {
                product: CartProduct {
                    images: images.get(&product.id).cloned().into_iter().collect(),
                    product,
                },
                option,
                item,
            })
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use clayhouse_core::{CategoryId, Won};
    use uuid::Uuid;

    fn product() -> Product {
        Product {
            id: ProductId::new(),
            category_id: CategoryId::new(),
            slug: "tea-bowl".to_string(),
            name: "Tea bowl".to_string(),
            description: None,
            price: Won::new(32_000),
            is_active: true,
            purchase_notice: None,
            handling_notice: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn item(product_id: ProductId, option_id: Option<OptionId>) -> CartItem {
        CartItem {
            id: CartItemId::new(),
            user_id: UserId::new(),
            product_id,
            option_id,
            quantity: 2,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_quantity_bounds() {
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());
        assert!(validate_quantity(1000).is_err());
        assert!(validate_quantity(-3).is_err());
    }

    #[test]
    fn test_assemble_attaches_product_image_and_option() {
        let p = product();
        let option = ProductOption {
            id: OptionId::new(),
            product_id: p.id,
            name: "glaze".to_string(),
            value: "ash".to_string(),
            sort_order: 1,
        };
        let image = ProductImage {
            id: Uuid::new_v4(),
            product_id: p.id,
            url: "https://cdn.example/bowl.jpg".to_string(),
            alt: None,
            sort_order: 1,
        };
        let items = vec![item(p.id, Some(option.id)), item(p.id, None)];

        let lines = assemble(items, vec![p.clone()], vec![image], vec![option.clone()]).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].option.as_ref().unwrap().id, option.id);
        assert_eq!(lines[0].product.images.len(), 1);
        assert!(lines[1].option.is_none());
        assert_eq!(lines[1].product.product.id, p.id);
    }

    #[test]
    fn test_assemble_missing_product_is_corruption() {
        let result = assemble(vec![item(ProductId::new(), None)], vec![], vec![], vec![]);
        assert!(matches!(
            result,
            Err(ShopError::Repository(RepositoryError::DataCorruption(_)))
        ));
    }
}
