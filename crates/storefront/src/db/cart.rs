//! Cart persistence.

use sqlx::{PgConnection, PgPool};

use clayhouse_core::{CartItemId, OptionId, ProductId, UserId};

use super::RepositoryError;
use crate::models::cart::CartItem;

/// Upper bound on a single cart line.
pub const MAX_LINE_QUANTITY: i32 = 999;

/// Repository for a user's cart rows.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The user's cart rows, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<CartItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartItem>(
            r"
            SELECT id, user_id, product_id, option_id, quantity, created_at, updated_at
            FROM cart_items
            WHERE user_id = $1
            ORDER BY created_at DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Add `quantity` to the (user, product, option) line, creating it if
    /// needed, in a single statement.
    ///
    /// Returns `None` when the merged quantity would exceed
    /// [`MAX_LINE_QUANTITY`]; the stored row is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::ForeignKey` if the product or option vanished
    /// concurrently.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn merge(
        &self,
        user_id: UserId,
        product_id: ProductId,
        option_id: Option<OptionId>,
        quantity: i32,
    ) -> Result<Option<CartItem>, RepositoryError> {
        sqlx::query_as::<_, CartItem>(
            r"
            INSERT INTO cart_items (user_id, product_id, option_id, quantity)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, product_id, option_id) DO UPDATE
            SET quantity = cart_items.quantity + EXCLUDED.quantity,
                updated_at = now()
            WHERE cart_items.quantity + EXCLUDED.quantity <= $5
            RETURNING id, user_id, product_id, option_id, quantity, created_at, updated_at
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(option_id)
        .bind(quantity)
        .bind(MAX_LINE_QUANTITY)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::classify(e, "cart item"))
    }

    /// Overwrite the quantity of one of the user's rows.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the row is missing or belongs to
    /// another user.
    pub async fn set_quantity(
        &self,
        user_id: UserId,
        id: CartItemId,
        quantity: i32,
    ) -> Result<CartItem, RepositoryError> {
        sqlx::query_as::<_, CartItem>(
            r"
            UPDATE cart_items
            SET quantity = $3, updated_at = now()
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, product_id, option_id, quantity, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(user_id)
        .bind(quantity)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete one of the user's rows and return it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the row is missing or belongs to
    /// another user.
    pub async fn remove(&self, user_id: UserId, id: CartItemId) -> Result<CartItem, RepositoryError> {
        sqlx::query_as::<_, CartItem>(
            r"
            DELETE FROM cart_items
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, product_id, option_id, quantity, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}

/// Lock and return the user's cart rows, oldest first.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_for_user(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<Vec<CartItem>, RepositoryError> {
    let rows = sqlx::query_as::<_, CartItem>(
        r"
        SELECT id, user_id, product_id, option_id, quantity, created_at, updated_at
        FROM cart_items
        WHERE user_id = $1
        ORDER BY created_at, id
        FOR UPDATE
        ",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

/// Lock every cart row pointing at a product.
///
/// Admin writes that remove cart rows call this before locking the product,
/// matching checkout, which locks cart rows before it share-locks products.
/// Rows are taken in the same `(created_at, id)` order as [`lock_for_user`].
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_for_product(
    conn: &mut PgConnection,
    product_id: ProductId,
) -> Result<u64, RepositoryError> {
    let ids = sqlx::query_scalar::<_, CartItemId>(
        r"
        SELECT id FROM cart_items
        WHERE product_id = $1
        ORDER BY created_at, id
        FOR UPDATE
        ",
    )
    .bind(product_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(ids.len() as u64)
}

/// Empty the user's cart.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the delete fails.
pub async fn clear(conn: &mut PgConnection, user_id: UserId) -> Result<u64, RepositoryError> {
    let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

/// Remove every cart row pointing at a product.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the delete fails.
pub async fn delete_for_product(
    conn: &mut PgConnection,
    product_id: ProductId,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query("DELETE FROM cart_items WHERE product_id = $1")
        .bind(product_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}
