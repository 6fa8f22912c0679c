//! Catalog reads and admin product writes.

use std::collections::HashMap;
use std::sync::Arc;

use sqlx::PgPool;
use tracing::instrument;

use clayhouse_core::{CategoryId, ProductId, Won};

use super::ShopError;
use crate::cache::CatalogCache;
use crate::db::catalog::{self, ImageKind};
use crate::db::{CatalogRepository, RepositoryError, ReviewRepository, cart};
use crate::models::product::{
    Category, ImageInput, OptionInput, ProductDetail, ProductImage, ProductInput, ProductPatch,
    ProductSummary,
};

const MAX_NAME: usize = 200;
const MAX_SLUG: usize = 100;
const MAX_URL: usize = 2048;

/// Whether a slug is non-empty lowercase ASCII letters, digits and hyphens.
#[must_use]
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.len() <= MAX_SLUG
        && slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

fn validate_slug(slug: &str) -> Result<(), ShopError> {
    if is_valid_slug(slug) {
        Ok(())
    } else {
        Err(ShopError::bad_request(
            "slug must be lowercase letters, digits and hyphens",
        ))
    }
}

fn validate_name(name: &str) -> Result<(), ShopError> {
    let len = name.trim().chars().count();
    if len == 0 || len > MAX_NAME {
        return Err(ShopError::bad_request(format!(
            "name must be 1 to {MAX_NAME} characters"
        )));
    }
    Ok(())
}

fn validate_price(price: Won) -> Result<(), ShopError> {
    if price.is_negative() {
        return Err(ShopError::bad_request("price must not be negative"));
    }
    Ok(())
}

fn validate_images(images: &[ImageInput]) -> Result<(), ShopError> {
    if images
        .iter()
        .any(|i| i.url.trim().is_empty() || i.url.len() > MAX_URL)
    {
        return Err(ShopError::bad_request("image url must be 1 to 2048 characters"));
    }
    Ok(())
}

fn validate_options(options: &[OptionInput]) -> Result<(), ShopError> {
    if options
        .iter()
        .any(|o| o.name.trim().is_empty() || o.value.trim().is_empty())
    {
        return Err(ShopError::bad_request("option name and value are required"));
    }
    Ok(())
}

fn validate_input(input: &ProductInput) -> Result<(), ShopError> {
    validate_slug(&input.slug)?;
    validate_name(&input.name)?;
    validate_price(input.price)?;
    validate_images(&input.images)?;
    validate_images(&input.detail_images)?;
    validate_options(&input.options)
}

fn validate_patch(patch: &ProductPatch) -> Result<(), ShopError> {
    if let Some(slug) = &patch.slug {
        validate_slug(slug)?;
    }
    if let Some(name) = &patch.name {
        validate_name(name)?;
    }
    if let Some(price) = patch.price {
        validate_price(price)?;
    }
    if let Some(images) = &patch.images {
        validate_images(images)?;
    }
    if let Some(images) = &patch.detail_images {
        validate_images(images)?;
    }
    if let Some(options) = &patch.options {
        validate_options(options)?;
    }
    Ok(())
}

/// Map write errors to the product contract.
fn write_error(err: RepositoryError) -> ShopError {
    match err {
        RepositoryError::NotFound => ShopError::not_found("product"),
        RepositoryError::Conflict(msg) => ShopError::Conflict(msg),
        RepositoryError::ForeignKey(_) => ShopError::bad_request("category does not exist"),
        other => ShopError::Repository(other),
    }
}

/// Catalog service.
pub struct CatalogService<'a> {
    pool: &'a PgPool,
    cache: &'a CatalogCache,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, cache: &'a CatalogCache) -> Self {
        Self { pool, cache }
    }

    fn repo(&self) -> CatalogRepository<'a> {
        CatalogRepository::new(self.pool)
    }

    /// All categories, in display order.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Repository` if the query fails.
    pub async fn categories(&self) -> Result<Arc<Vec<Category>>, ShopError> {
        if let Some(categories) = self.cache.categories().await {
            return Ok(categories);
        }
        let categories = Arc::new(self.repo().list_categories().await?);
        self.cache.put_categories(Arc::clone(&categories)).await;
        Ok(categories)
    }

    /// Active products, newest first, each with its category and first image.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Repository` if a query fails.
    pub async fn products(
        &self,
        category_id: Option<CategoryId>,
    ) -> Result<Vec<ProductSummary>, ShopError> {
        let repo = self.repo();
        let products = repo.list_active_products(category_id).await?;
        if products.is_empty() {
            return Ok(Vec::new());
        }

        let mut category_ids: Vec<CategoryId> = products.iter().map(|p| p.category_id).collect();
        category_ids.sort_unstable_by_key(|c| c.as_uuid());
        category_ids.dedup();
        let product_ids: Vec<ProductId> = products.iter().map(|p| p.id).collect();

        let (categories, images) = tokio::try_join!(
            repo.categories_by_ids(&category_ids),
            repo.first_images(&product_ids),
        )?;

        let categories: HashMap<CategoryId, Category> =
            categories.into_iter().map(|c| (c.id, c)).collect();
        let mut images: HashMap<ProductId, ProductImage> =
            images.into_iter().map(|i| (i.product_id, i)).collect();

        products
            .into_iter()
            .map(|product| -> Result<ProductSummary, ShopError> {
                let category = categories.get(&product.category_id).cloned().ok_or_else(|| {
                    RepositoryError::DataCorruption(format!(
                        "product {} references missing category {}",
                        product.id, product.category_id
                    ))
                })?;
                let images = images.remove(&product.id).into_iter().collect();
                Ok(ProductSummary {
                    product,
                    category,
                    images,
                })
            })
            .collect()
    }

    /// Full product page. Served from the cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::NotFound` if the product does not exist.
    pub async fn product(&self, id: ProductId) -> Result<Arc<ProductDetail>, ShopError> {
        if let Some(detail) = self.cache.product(id).await {
            return Ok(detail);
        }
        let detail = Arc::new(self.load_detail(id).await?);
        self.cache.put_product(id, Arc::clone(&detail)).await;
        Ok(detail)
    }

    async fn load_detail(&self, id: ProductId) -> Result<ProductDetail, ShopError> {
        let repo = self.repo();
        let product = repo
            .get_product(id)
            .await?
            .ok_or_else(|| ShopError::not_found("product"))?;

        let reviews = ReviewRepository::new(self.pool);
        let category_ids = [product.category_id];
        let (categories, images, options, detail_images, reviews) = tokio::try_join!(
            repo.categories_by_ids(&category_ids),
            repo.images(id, ImageKind::Gallery),
            repo.options(id),
            repo.images(id, ImageKind::Detail),
            reviews.list_for_product(id),
        )?;

        let category = categories.into_iter().next().ok_or_else(|| {
            RepositoryError::DataCorruption(format!(
                "product {id} references missing category {}",
                product.category_id
            ))
        })?;

        Ok(ProductDetail {
            product,
            category,
            images,
            options,
            detail_images,
            reviews,
        })
    }

    /// Create a product with its images, options and detail images.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::BadRequest` for invalid input or an unknown category.
    /// Returns `ShopError::Conflict` if the slug is taken.
    #[instrument(skip(self, input), fields(slug = %input.slug))]
    pub async fn create_product(&self, input: &ProductInput) -> Result<Arc<ProductDetail>, ShopError> {
        validate_input(input)?;

        let mut tx = self.pool.begin().await?;
        let id = catalog::insert_product(&mut tx, input)
            .await
            .map_err(write_error)?;
        catalog::insert_images(&mut tx, id, ImageKind::Gallery, &input.images).await?;
        catalog::insert_options(&mut tx, id, &input.options).await?;
        catalog::insert_images(&mut tx, id, ImageKind::Detail, &input.detail_images).await?;
        tx.commit().await?;

        tracing::info!(product_id = %id, "product created");
        self.product(id).await
    }

    /// Apply a patch. Each child list present in the patch replaces the stored
    /// list.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::NotFound` if the product does not exist.
    /// Returns `ShopError::BadRequest` for invalid input or an unknown category.
    /// Returns `ShopError::Conflict` if the new slug is taken.
    #[instrument(skip(self, patch), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<Arc<ProductDetail>, ShopError> {
        validate_patch(patch)?;

        let mut tx = self.pool.begin().await?;
        // Replacing options cascades into cart rows, so take those first.
        if patch.options.is_some() {
            cart::lock_for_product(&mut tx, id).await?;
        }
        catalog::lock_product(&mut tx, id).await.map_err(write_error)?;

        if patch.has_scalar_changes() {
            catalog::update_product(&mut tx, id, patch)
                .await
                .map_err(write_error)?;
        }
        if let Some(images) = &patch.images {
            catalog::delete_images(&mut tx, id, ImageKind::Gallery).await?;
            catalog::insert_images(&mut tx, id, ImageKind::Gallery, images).await?;
        }
        if let Some(options) = &patch.options {
            let removed = catalog::delete_options(&mut tx, id).await?;
            tracing::debug!(removed, "replacing product options");
            catalog::insert_options(&mut tx, id, options).await?;
        }
        if let Some(images) = &patch.detail_images {
            catalog::delete_images(&mut tx, id, ImageKind::Detail).await?;
            catalog::insert_images(&mut tx, id, ImageKind::Detail, images).await?;
        }
        tx.commit().await?;

        self.cache.invalidate_product(id).await;
        self.product(id).await
    }

    /// Delete a product and everything hanging off it.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::NotFound` if the product does not exist.
    /// Returns `ShopError::Conflict` if an order references the product.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete_product(&self, id: ProductId) -> Result<(), ShopError> {
        let mut tx = self.pool.begin().await?;
        // Cart rows before the product row, the same order checkout uses.
        let carted = cart::lock_for_product(&mut tx, id).await?;
        catalog::lock_product(&mut tx, id).await.map_err(write_error)?;
        tracing::debug!(carted, "removing product from carts");

        catalog::delete_images(&mut tx, id, ImageKind::Gallery).await?;
        catalog::delete_options(&mut tx, id).await?;
        catalog::delete_images(&mut tx, id, ImageKind::Detail).await?;
        cart::delete_for_product(&mut tx, id).await?;
        catalog::delete_product(&mut tx, id)
            .await
            .map_err(|e| match e {
                RepositoryError::ForeignKey(_) => ShopError::Conflict(
                    "product has been ordered; deactivate it instead".to_string(),
                ),
                other => write_error(other),
            })?;
        tx.commit().await?;

        self.cache.invalidate_product(id).await;
        tracing::info!("product deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_rules() {
        assert!(is_valid_slug("moon-jar-2"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("Moon-Jar"));
        assert!(!is_valid_slug("moon jar"));
        assert!(!is_valid_slug("달항아리"));
        assert!(!is_valid_slug(&"a".repeat(MAX_SLUG + 1)));
    }

    #[test]
    fn test_patch_validation() {
        let patch = ProductPatch {
            price: Some(Won::new(-1)),
            ..ProductPatch::default()
        };
        assert!(matches!(validate_patch(&patch), Err(ShopError::BadRequest(_))));

        let patch = ProductPatch {
            options: Some(vec![OptionInput {
                name: "glaze".to_string(),
                value: " ".to_string(),
                sort_order: 0,
            }]),
            ..ProductPatch::default()
        };
        assert!(matches!(validate_patch(&patch), Err(ShopError::BadRequest(_))));

        assert!(validate_patch(&ProductPatch::default()).is_ok());
    }

    #[test]
    fn test_write_error_mapping() {
        assert!(matches!(
            write_error(RepositoryError::ForeignKey("products_category_id_fkey".to_string())),
            ShopError::BadRequest(_)
        ));
        assert!(matches!(
            write_error(RepositoryError::Conflict("product slug already exists".to_string())),
            ShopError::Conflict(_)
        ));
        assert!(matches!(write_error(RepositoryError::NotFound), ShopError::NotFound(_)));
    }
}
