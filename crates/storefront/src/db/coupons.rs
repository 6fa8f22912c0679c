//! Coupon persistence.

use sqlx::{PgConnection, PgPool};

use clayhouse_core::{CouponId, OrderId, UserCouponId, UserId};

use super::RepositoryError;
use crate::models::coupon::{Coupon, CouponInput, UserCoupon};

/// Repository for coupons and their grants.
pub struct CouponRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CouponRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Grants issued to a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn grants_for_user(&self, user_id: UserId) -> Result<Vec<UserCoupon>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserCoupon>(
            r"
            SELECT id, user_id, coupon_id, used_at, order_id, created_at
            FROM user_coupons
            WHERE user_id = $1
            ORDER BY created_at DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Coupons with the given ids.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn by_ids(&self, ids: &[CouponId]) -> Result<Vec<Coupon>, RepositoryError> {
        let rows = sqlx::query_as::<_, Coupon>(
            r"
            SELECT id, code, discount_type, discount_value, min_order_amount, valid_from,
                   valid_until, usage_limit, used_count, is_active, created_at, updated_at
            FROM coupons
            WHERE id = ANY($1)
            ",
        )
        .bind(ids)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Create a coupon. `input.code` must already be normalised.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, input: &CouponInput) -> Result<Coupon, RepositoryError> {
        sqlx::query_as::<_, Coupon>(
            r"
            INSERT INTO coupons (code, discount_type, discount_value, min_order_amount,
                                 valid_from, valid_until, usage_limit, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, code, discount_type, discount_value, min_order_amount, valid_from,
                      valid_until, usage_limit, used_count, is_active, created_at, updated_at
            ",
        )
        .bind(&input.code)
        .bind(input.discount_type)
        .bind(input.discount_value)
        .bind(input.min_order_amount)
        .bind(input.valid_from)
        .bind(input.valid_until)
        .bind(input.usage_limit)
        .bind(input.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::classify(e, "coupon code"))
    }

    /// Issue a coupon to a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::ForeignKey` if the coupon or user does not
    /// exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn issue(&self, coupon_id: CouponId, user_id: UserId) -> Result<UserCoupon, RepositoryError> {
        sqlx::query_as::<_, UserCoupon>(
            r"
            INSERT INTO user_coupons (user_id, coupon_id)
            VALUES ($1, $2)
            RETURNING id, user_id, coupon_id, used_at, order_id, created_at
            ",
        )
        .bind(user_id)
        .bind(coupon_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::classify(e, "coupon grant"))
    }
}

/// Lock a coupon by its (uppercase) code.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_by_code(conn: &mut PgConnection, code: &str) -> Result<Option<Coupon>, RepositoryError> {
    let row = sqlx::query_as::<_, Coupon>(
        r"
        SELECT id, code, discount_type, discount_value, min_order_amount, valid_from,
               valid_until, usage_limit, used_count, is_active, created_at, updated_at
        FROM coupons
        WHERE code = $1
        FOR UPDATE
        ",
    )
    .bind(code)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

/// Lock the user's oldest unused grant of a coupon.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_unused_grant(
    conn: &mut PgConnection,
    user_id: UserId,
    coupon_id: CouponId,
) -> Result<Option<UserCoupon>, RepositoryError> {
    let row = sqlx::query_as::<_, UserCoupon>(
        r"
        SELECT id, user_id, coupon_id, used_at, order_id, created_at
        FROM user_coupons
        WHERE user_id = $1 AND coupon_id = $2 AND used_at IS NULL
        ORDER BY created_at
        LIMIT 1
        FOR UPDATE
        ",
    )
    .bind(user_id)
    .bind(coupon_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

/// Count one more redemption.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn increment_usage(conn: &mut PgConnection, id: CouponId) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE coupons SET used_count = used_count + 1, updated_at = now() WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Mark a grant as spent on an order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn mark_grant_used(
    conn: &mut PgConnection,
    id: UserCouponId,
    order_id: OrderId,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE user_coupons SET used_at = now(), order_id = $2 WHERE id = $1")
        .bind(id)
        .bind(order_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
