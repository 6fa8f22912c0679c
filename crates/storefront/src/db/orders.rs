//! Order persistence.
//!
//! Orders and their lines are written once at checkout; afterwards only the
//! status column changes.

use sqlx::{PgConnection, PgPool};

use clayhouse_core::{
    AddressId, CouponId, OptionId, OrderId, OrderStatus, OrderTotals, ProductId, UserId, Won,
};

use super::RepositoryError;
use crate::models::order::{Order, OrderItem};

/// Header columns for a new order.
#[derive(Debug, Clone)]
pub struct NewOrder<'a> {
    pub user_id: UserId,
    pub order_number: &'a str,
    pub shipping_address_id: Option<AddressId>,
    pub totals: OrderTotals,
    pub coupon_id: Option<CouponId>,
}

/// A line snapshot for a new order.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub product_option_id: Option<OptionId>,
    pub product_name: String,
    pub option_label: Option<String>,
    pub price: Won,
    pub quantity: i32,
    pub line_total: Won,
}

/// Read access to orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, Order>(
            r"
            SELECT id, user_id, order_number, status, shipping_address_id, subtotal,
                   shipping_fee, discount_amount, total, coupon_id, created_at, updated_at
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Every order, newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, Order>(
            r"
            SELECT id, user_id, order_number, status, shipping_address_id, subtotal,
                   shipping_fee, discount_amount, total, coupon_id, created_at, updated_at
            FROM orders
            WHERE $1::text IS NULL OR status = $1
            ORDER BY created_at DESC
            ",
        )
        .bind(status)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Lines of the given orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items_for(&self, order_ids: &[OrderId]) -> Result<Vec<OrderItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderItem>(
            r"
            SELECT id, order_id, product_id, product_option_id, product_name, option_label,
                   price, quantity, line_total
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, product_name, id
            ",
        )
        .bind(order_ids)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }
}

/// Insert the order header.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the order number is taken.
/// Returns `RepositoryError::Database` for other database errors.
pub async fn insert(conn: &mut PgConnection, order: &NewOrder<'_>) -> Result<Order, RepositoryError> {
    sqlx::query_as::<_, Order>(
        r"
        INSERT INTO orders (user_id, order_number, shipping_address_id, subtotal,
                            shipping_fee, discount_amount, total, coupon_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, user_id, order_number, status, shipping_address_id, subtotal,
                  shipping_fee, discount_amount, total, coupon_id, created_at, updated_at
        ",
    )
    .bind(order.user_id)
    .bind(order.order_number)
    .bind(order.shipping_address_id)
    .bind(order.totals.subtotal)
    .bind(order.totals.shipping_fee)
    .bind(order.totals.discount_amount)
    .bind(order.totals.total)
    .bind(order.coupon_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| RepositoryError::classify(e, "order number"))
}

/// Insert one line snapshot.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_item(
    conn: &mut PgConnection,
    order_id: OrderId,
    item: &NewOrderItem,
) -> Result<OrderItem, RepositoryError> {
    let row = sqlx::query_as::<_, OrderItem>(
        r"
        INSERT INTO order_items (order_id, product_id, product_option_id, product_name,
                                 option_label, price, quantity, line_total)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, order_id, product_id, product_option_id, product_name, option_label,
                  price, quantity, line_total
        ",
    )
    .bind(order_id)
    .bind(item.product_id)
    .bind(item.product_option_id)
    .bind(&item.product_name)
    .bind(item.option_label.as_deref())
    .bind(item.price)
    .bind(item.quantity)
    .bind(item.line_total)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row)
}

/// Lock an order row. `user_id` restricts the lookup to one owner.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock(
    conn: &mut PgConnection,
    id: OrderId,
    user_id: Option<UserId>,
) -> Result<Option<Order>, RepositoryError> {
    let row = sqlx::query_as::<_, Order>(
        r"
        SELECT id, user_id, order_number, status, shipping_address_id, subtotal,
               shipping_fee, discount_amount, total, coupon_id, created_at, updated_at
        FROM orders
        WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2)
        FOR UPDATE
        ",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

/// Write a new status.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the order does not exist.
pub async fn set_status(
    conn: &mut PgConnection,
    id: OrderId,
    status: OrderStatus,
) -> Result<Order, RepositoryError> {
    sqlx::query_as::<_, Order>(
        r"
        UPDATE orders
        SET status = $2, updated_at = now()
        WHERE id = $1
        RETURNING id, user_id, order_number, status, shipping_address_id, subtotal,
                  shipping_fee, discount_amount, total, coupon_id, created_at, updated_at
        ",
    )
    .bind(id)
    .bind(status)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(RepositoryError::NotFound)
}
