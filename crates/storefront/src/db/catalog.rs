//! Catalog persistence: categories, products, images and options.

use sqlx::{PgConnection, PgPool};

use clayhouse_core::{CategoryId, OptionId, ProductId};

use super::RepositoryError;
use crate::models::product::{
    Category, ImageInput, OptionInput, Product, ProductImage, ProductInput, ProductOption,
    ProductPatch,
};

/// Image tables that share the `ProductImage` shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Gallery,
    Detail,
}

impl ImageKind {
    const fn table(self) -> &'static str {
        match self {
            Self::Gallery => "product_images",
            Self::Detail => "product_detail_images",
        }
    }
}

/// Read access to the catalog.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All categories in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, Category>(
            "SELECT id, slug, name, sort_order FROM product_categories ORDER BY sort_order, name",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Categories with the given ids.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn categories_by_ids(
        &self,
        ids: &[CategoryId],
    ) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, Category>(
            "SELECT id, slug, name, sort_order FROM product_categories WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Active products, newest first, optionally limited to one category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active_products(
        &self,
        category_id: Option<CategoryId>,
    ) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, Product>(
            r"
            SELECT id, category_id, slug, name, description, price, is_active,
                   purchase_notice, handling_notice, created_at, updated_at
            FROM products
            WHERE is_active AND ($1::uuid IS NULL OR category_id = $1)
            ORDER BY created_at DESC
            ",
        )
        .bind(category_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Any product by id, active or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, Product>(
            r"
            SELECT id, category_id, slug, name, description, price, is_active,
                   purchase_notice, handling_notice, created_at, updated_at
            FROM products
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Products with the given ids.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, Product>(
            r"
            SELECT id, category_id, slug, name, description, price, is_active,
                   purchase_notice, handling_notice, created_at, updated_at
            FROM products
            WHERE id = ANY($1)
            ",
        )
        .bind(ids)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// The lowest-`sort_order` gallery image of each product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn first_images(
        &self,
        product_ids: &[ProductId],
    ) -> Result<Vec<ProductImage>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductImage>(
            r"
            SELECT DISTINCT ON (product_id) id, product_id, url, alt, sort_order
            FROM product_images
            WHERE product_id = ANY($1)
            ORDER BY product_id, sort_order, id
            ",
        )
        .bind(product_ids)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Every image of one kind for a product, in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn images(
        &self,
        product_id: ProductId,
        kind: ImageKind,
    ) -> Result<Vec<ProductImage>, RepositoryError> {
        let sql = format!(
            "SELECT id, product_id, url, alt, sort_order FROM {} \
             WHERE product_id = $1 ORDER BY sort_order, id",
            kind.table()
        );
        let rows = sqlx::query_as::<_, ProductImage>(&sql)
            .bind(product_id)
            .fetch_all(self.pool)
            .await?;
        Ok(rows)
    }

    /// Options of a product, in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn options(&self, product_id: ProductId) -> Result<Vec<ProductOption>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductOption>(
            r"
            SELECT id, product_id, name, value, sort_order
            FROM product_options
            WHERE product_id = $1
            ORDER BY sort_order, id
            ",
        )
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Options with the given ids.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn options_by_ids(
        &self,
        ids: &[OptionId],
    ) -> Result<Vec<ProductOption>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductOption>(
            "SELECT id, product_id, name, value, sort_order FROM product_options WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// One option by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_option(&self, id: OptionId) -> Result<Option<ProductOption>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductOption>(
            "SELECT id, product_id, name, value, sort_order FROM product_options WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }
}

// =============================================================================
// Transaction steps
// =============================================================================

/// Share-lock the given products so their price and status cannot change
/// until the transaction ends.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn share_lock_products(
    conn: &mut PgConnection,
    ids: &[ProductId],
) -> Result<Vec<Product>, RepositoryError> {
    let rows = sqlx::query_as::<_, Product>(
        r"
        SELECT id, category_id, slug, name, description, price, is_active,
               purchase_notice, handling_notice, created_at, updated_at
        FROM products
        WHERE id = ANY($1)
        FOR SHARE
        ",
    )
    .bind(ids)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

/// Options with the given ids, read inside a transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn options_in(
    conn: &mut PgConnection,
    ids: &[OptionId],
) -> Result<Vec<ProductOption>, RepositoryError> {
    let rows = sqlx::query_as::<_, ProductOption>(
        "SELECT id, product_id, name, value, sort_order FROM product_options WHERE id = ANY($1)",
    )
    .bind(ids)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

/// Insert the product row.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` on a duplicate slug.
/// Returns `RepositoryError::ForeignKey` if the category does not exist.
pub async fn insert_product(
    conn: &mut PgConnection,
    input: &ProductInput,
) -> Result<ProductId, RepositoryError> {
    sqlx::query_scalar::<_, ProductId>(
        r"
        INSERT INTO products (category_id, slug, name, description, price, is_active,
                              purchase_notice, handling_notice)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id
        ",
    )
    .bind(input.category_id)
    .bind(&input.slug)
    .bind(&input.name)
    .bind(input.description.as_deref())
    .bind(input.price)
    .bind(input.is_active)
    .bind(input.purchase_notice.as_deref())
    .bind(input.handling_notice.as_deref())
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| RepositoryError::classify(e, "product slug"))
}

/// Update the scalar columns present in the patch.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the product does not exist.
/// Returns `RepositoryError::Conflict` on a duplicate slug.
/// Returns `RepositoryError::ForeignKey` if the category does not exist.
pub async fn update_product(
    conn: &mut PgConnection,
    id: ProductId,
    patch: &ProductPatch,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE products
        SET category_id = COALESCE($2, category_id),
            slug = COALESCE($3, slug),
            name = COALESCE($4, name),
            description = NULLIF(COALESCE($5, description), ''),
            price = COALESCE($6, price),
            is_active = COALESCE($7, is_active),
            purchase_notice = NULLIF(COALESCE($8, purchase_notice), ''),
            handling_notice = NULLIF(COALESCE($9, handling_notice), ''),
            updated_at = now()
        WHERE id = $1
        ",
    )
    .bind(id)
    .bind(patch.category_id)
    .bind(patch.slug.as_deref())
    .bind(patch.name.as_deref())
    .bind(patch.description.as_deref())
    .bind(patch.price)
    .bind(patch.is_active)
    .bind(patch.purchase_notice.as_deref())
    .bind(patch.handling_notice.as_deref())
    .execute(&mut *conn)
    .await
    .map_err(|e| RepositoryError::classify(e, "product slug"))?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}

/// Lock the product row for the rest of the transaction.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the product does not exist.
pub async fn lock_product(conn: &mut PgConnection, id: ProductId) -> Result<(), RepositoryError> {
    sqlx::query_scalar::<_, ProductId>("SELECT id FROM products WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .map(|_| ())
        .ok_or(RepositoryError::NotFound)
}

/// Delete every image of one kind for a product.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the delete fails.
pub async fn delete_images(
    conn: &mut PgConnection,
    product_id: ProductId,
    kind: ImageKind,
) -> Result<u64, RepositoryError> {
    let sql = format!("DELETE FROM {} WHERE product_id = $1", kind.table());
    let result = sqlx::query(&sql).bind(product_id).execute(&mut *conn).await?;
    Ok(result.rows_affected())
}

/// Insert images of one kind for a product.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if an insert fails.
pub async fn insert_images(
    conn: &mut PgConnection,
    product_id: ProductId,
    kind: ImageKind,
    images: &[ImageInput],
) -> Result<(), RepositoryError> {
    let sql = format!(
        "INSERT INTO {} (product_id, url, alt, sort_order) VALUES ($1, $2, $3, $4)",
        kind.table()
    );
    for image in images {
        sqlx::query(&sql)
            .bind(product_id)
            .bind(&image.url)
            .bind(image.alt.as_deref())
            .bind(image.sort_order)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Delete every option of a product.
///
/// Cart rows pointing at a removed option go with it (`ON DELETE CASCADE`);
/// order lines keep their snapshot and lose the reference (`SET NULL`).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the delete fails.
pub async fn delete_options(
    conn: &mut PgConnection,
    product_id: ProductId,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query("DELETE FROM product_options WHERE product_id = $1")
        .bind(product_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

/// Insert options for a product.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if an insert fails.
pub async fn insert_options(
    conn: &mut PgConnection,
    product_id: ProductId,
    options: &[OptionInput],
) -> Result<(), RepositoryError> {
    for option in options {
        sqlx::query(
            "INSERT INTO product_options (product_id, name, value, sort_order) VALUES ($1, $2, $3, $4)",
        )
        .bind(product_id)
        .bind(&option.name)
        .bind(&option.value)
        .bind(option.sort_order)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Delete the product row.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the product does not exist.
/// Returns `RepositoryError::ForeignKey` if an order line still references it.
pub async fn delete_product(conn: &mut PgConnection, id: ProductId) -> Result<(), RepositoryError> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(|e| RepositoryError::classify(e, "product"))?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}
