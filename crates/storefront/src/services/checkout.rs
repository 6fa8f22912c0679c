//! Checkout and order lifecycle.
//!
//! `place_order` runs in a single transaction:
//!
//! 1. Lock the caller's cart rows (`FOR UPDATE`) and share-lock their products
//! 2. Resolve the shipping address (given id, else the default, else none)
//! 3. Snapshot each line: name, option label, unit price, quantity
//! 4. Price the order: subtotal, shipping fee, coupon discount
//! 5. Lock the coupon row and the caller's unused grant, count the redemption
//! 6. Insert the order and its lines, then empty the cart
//!
//! Concurrent checkouts of the same coupon serialize on the coupon row, so a
//! usage limit can never be overspent.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use rand::Rng;
use sqlx::PgPool;
use tracing::instrument;

use clayhouse_core::pricing::line_total;
use clayhouse_core::{
    OptionId, OrderId, OrderStatus, OrderTotals, ProductId, ShippingPolicy, UserId, Won,
};

use super::ShopError;
use crate::db::orders::{self, NewOrder, NewOrderItem};
use crate::db::{OrderRepository, RepositoryError, addresses, cart, catalog, coupons};
use crate::models::cart::CartItem;
use crate::models::order::{Order, OrderItem, OrderWithItems, PlaceOrder};
use crate::models::product::{Product, ProductOption};

const ORDER_SUFFIX_LEN: usize = 8;

/// Build an order number of the form `ORD-YYYYMMDD-XXXXXXXX`.
#[must_use]
pub fn order_number(date: NaiveDate) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::rng();
    let suffix: String = (0..ORDER_SUFFIX_LEN)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            CHARSET.get(idx).map_or('0', |b| char::from(*b))
        })
        .collect();
    format!("ORD-{}-{suffix}", date.format("%Y%m%d"))
}

/// Coupon codes are stored uppercase; input is matched the same way.
#[must_use]
pub fn normalize_coupon_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Turn cart rows into order-line snapshots.
fn snapshot_lines(
    items: &[CartItem],
    products: &HashMap<ProductId, Product>,
    options: &HashMap<OptionId, ProductOption>,
) -> Result<Vec<NewOrderItem>, ShopError> {
    items
        .iter()
        .map(|item| -> Result<NewOrderItem, ShopError> {
            let product = products.get(&item.product_id).ok_or_else(|| {
                RepositoryError::DataCorruption(format!(
                    "cart item {} references missing product {}",
                    item.id, item.product_id
                ))
            })?;
            if !product.is_active {
                return Err(ShopError::bad_request(format!(
                    "{} is no longer available",
                    product.name
                )));
            }
            let option_label = item
                .option_id
                .and_then(|id| options.get(&id))
                .map(ProductOption::label);
            let total = line_total(product.price, item.quantity)
                .ok_or_else(|| ShopError::bad_request("order amount is too large"))?;

            Ok(NewOrderItem {
                product_id: product.id,
                product_option_id: item.option_id,
                product_name: product.name.clone(),
                option_label,
                price: product.price,
                quantity: item.quantity,
                line_total: total,
            })
        })
        .collect()
}

fn subtotal(lines: &[NewOrderItem]) -> Result<Won, ShopError> {
    lines
        .iter()
        .try_fold(Won::ZERO, |acc, line| acc.checked_add(line.line_total))
        .ok_or_else(|| ShopError::bad_request("order amount is too large"))
}

/// Attach lines to their orders, keeping order sequence.
fn with_items(orders: Vec<Order>, items: Vec<OrderItem>) -> Vec<OrderWithItems> {
    let mut grouped: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
    for item in items {
        grouped.entry(item.order_id).or_default().push(item);
    }
    orders
        .into_iter()
        .map(|order| OrderWithItems {
            order_items: grouped.remove(&order.id).unwrap_or_default(),
            order,
        })
        .collect()
}

fn transition_error(from: OrderStatus, to: OrderStatus) -> ShopError {
    if from.is_terminal() {
        ShopError::bad_request(format!("order is already {from}"))
    } else {
        ShopError::bad_request(format!("cannot change order status from {from} to {to}"))
    }
}

/// Checkout service.
pub struct CheckoutService<'a> {
    pool: &'a PgPool,
    shipping: ShippingPolicy,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, shipping: ShippingPolicy) -> Self {
        Self { pool, shipping }
    }

    /// The caller's orders, newest first, with their lines.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Repository` if a query fails.
    pub async fn my_orders(&self, user_id: UserId) -> Result<Vec<OrderWithItems>, ShopError> {
        let repo = OrderRepository::new(self.pool);
        let orders = repo.list_for_user(user_id).await?;
        self.attach_items(orders).await
    }

    /// Every order, newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Repository` if a query fails.
    pub async fn all_orders(
        &self,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderWithItems>, ShopError> {
        let repo = OrderRepository::new(self.pool);
        let orders = repo.list_all(status).await?;
        self.attach_items(orders).await
    }

    async fn attach_items(&self, orders: Vec<Order>) -> Result<Vec<OrderWithItems>, ShopError> {
        if orders.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<OrderId> = orders.iter().map(|o| o.id).collect();
        let items = OrderRepository::new(self.pool).items_for(&ids).await?;
        Ok(with_items(orders, items))
    }

    /// Turn the caller's cart into an order.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::BadRequest` for an empty cart, an inactive product,
    /// or a coupon that is unknown, not issued to the caller, or not
    /// applicable.
    /// Returns `ShopError::NotFound` if the given shipping address is not the
    /// caller's.
    #[instrument(skip(self, input), fields(user_id = %user_id))]
    pub async fn place_order(
        &self,
        user_id: UserId,
        input: &PlaceOrder,
    ) -> Result<OrderWithItems, ShopError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let items = cart::lock_for_user(&mut tx, user_id).await?;
        if items.is_empty() {
            return Err(ShopError::bad_request("cart is empty"));
        }

        let product_ids: Vec<ProductId> = items.iter().map(|i| i.product_id).collect();
        let option_ids: Vec<OptionId> = items.iter().filter_map(|i| i.option_id).collect();
        let products: HashMap<ProductId, Product> =
            catalog::share_lock_products(&mut tx, &product_ids)
                .await?
                .into_iter()
                .map(|p| (p.id, p))
                .collect();
        let options: HashMap<OptionId, ProductOption> = catalog::options_in(&mut tx, &option_ids)
            .await?
            .into_iter()
            .map(|o| (o.id, o))
            .collect();

        let shipping_address_id = match input.shipping_address_id {
            Some(id) => Some(
                addresses::find(&mut tx, user_id, id)
                    .await?
                    .ok_or_else(|| ShopError::not_found("shipping address"))?
                    .id,
            ),
            None => addresses::find_default(&mut tx, user_id).await?.map(|a| a.id),
        };

        let lines = snapshot_lines(&items, &products, &options)?;
        let subtotal = subtotal(&lines)?;
        let shipping_fee = self.shipping.fee_for(subtotal);

        let code = input
            .coupon_code
            .as_deref()
            .map(normalize_coupon_code)
            .filter(|c| !c.is_empty());
        let redemption = match code {
            Some(code) => {
                let coupon = coupons::lock_by_code(&mut tx, &code)
                    .await?
                    .ok_or_else(|| ShopError::bad_request("coupon code is not valid"))?;
                let grant = coupons::lock_unused_grant(&mut tx, user_id, coupon.id)
                    .await?
                    .ok_or_else(|| {
                        ShopError::bad_request("coupon has not been issued to you or was already used")
                    })?;
                let discount = coupon
                    .terms()
                    .discount_for(subtotal, now)
                    .map_err(|e| ShopError::bad_request(e.to_string()))?;
                Some((coupon.id, grant.id, discount))
            }
            None => None,
        };

        let discount = redemption.map_or(Won::ZERO, |(_, _, d)| d);
        let totals = OrderTotals::compute(subtotal, shipping_fee, discount);
        let number = order_number(now.date_naive());

        let order = orders::insert(
            &mut tx,
            &NewOrder {
                user_id,
                order_number: &number,
                shipping_address_id,
                totals,
                coupon_id: redemption.map(|(id, _, _)| id),
            },
        )
        .await?;

        let mut order_items = Vec::with_capacity(lines.len());
        for line in &lines {
            order_items.push(orders::insert_item(&mut tx, order.id, line).await?);
        }

        if let Some((coupon_id, grant_id, _)) = redemption {
            coupons::increment_usage(&mut tx, coupon_id).await?;
            coupons::mark_grant_used(&mut tx, grant_id, order.id).await?;
        }

        cart::clear(&mut tx, user_id).await?;
        tx.commit().await?;

        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total = %order.total,
            "order placed"
        );

        Ok(OrderWithItems { order, order_items })
    }

    /// Cancel one of the caller's orders while it is pending or paid.
    ///
    /// Coupon redemptions are not refunded.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::NotFound` if the order is not the caller's.
    /// Returns `ShopError::BadRequest` if the order can no longer be cancelled.
    #[instrument(skip(self), fields(user_id = %user_id, order_id = %id))]
    pub async fn cancel(&self, user_id: UserId, id: OrderId) -> Result<OrderWithItems, ShopError> {
        let order = self
            .transition(id, Some(user_id), OrderStatus::Cancelled)
            .await?;
        let mut with = self.attach_items(vec![order]).await?;
        with.pop().ok_or_else(|| ShopError::not_found("order"))
    }

    /// Move an order along the status state machine.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::NotFound` if the order does not exist.
    /// Returns `ShopError::BadRequest` for a transition the state machine
    /// does not allow.
    #[instrument(skip(self), fields(order_id = %id, status = %status))]
    pub async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<Order, ShopError> {
        self.transition(id, None, status).await
    }

    async fn transition(
        &self,
        id: OrderId,
        owner: Option<UserId>,
        to: OrderStatus,
    ) -> Result<Order, ShopError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::lock(&mut tx, id, owner)
            .await?
            .ok_or_else(|| ShopError::not_found("order"))?;

        if !order.status.can_transition_to(to) {
            return Err(transition_error(order.status, to));
        }

        let updated = orders::set_status(&mut tx, id, to).await?;
        tx.commit().await?;

        tracing::info!(from = %order.status, to = %to, "order status changed");
        Ok(updated)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clayhouse_core::{CartItemId, CategoryId};
    use uuid::Uuid;

    fn product(name: &str, price: i64, active: bool) -> Product {
        Product {
            id: ProductId::new(),
            category_id: CategoryId::new(),
            slug: name.to_lowercase().replace(' ', "-"),
            name: name.to_string(),
            description: None,
            price: Won::new(price),
            is_active: active,
            purchase_notice: None,
            handling_notice: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn cart_item(product_id: ProductId, option_id: Option<OptionId>, quantity: i32) -> CartItem {
        CartItem {
            id: CartItemId::new(),
            user_id: UserId::new(),
            product_id,
            option_id,
            quantity,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_order_number_format() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        let number = order_number(date);
        assert!(number.starts_with("ORD-20260314-"));
        let suffix = number.trim_start_matches("ORD-20260314-");
        assert_eq!(suffix.len(), ORDER_SUFFIX_LEN);
        assert!(
            suffix
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        );
    }

    #[test]
    fn test_normalize_coupon_code() {
        assert_eq!(normalize_coupon_code("  spring10 "), "SPRING10");
    }

    #[test]
    fn test_snapshot_copies_name_price_and_option_label() {
        let bowl = product("Rice bowl", 18_000, true);
        let option = ProductOption {
            id: OptionId::new(),
            product_id: bowl.id,
            name: "glaze".to_string(),
            value: "celadon".to_string(),
            sort_order: 1,
        };
        let items = vec![cart_item(bowl.id, Some(option.id), 3)];
        let products = HashMap::from([(bowl.id, bowl.clone())]);
        let options = HashMap::from([(option.id, option)]);

        let lines = snapshot_lines(&items, &products, &options).unwrap();
        let line = lines.first().unwrap();
        assert_eq!(line.product_name, "Rice bowl");
        assert_eq!(line.option_label.as_deref(), Some("glaze: celadon"));
        assert_eq!(line.price, Won::new(18_000));
        assert_eq!(line.line_total, Won::new(54_000));
        assert_eq!(subtotal(&lines).unwrap(), Won::new(54_000));
    }

    #[test]
    fn test_snapshot_rejects_inactive_product() {
        let retired = product("Retired vase", 90_000, false);
        let items = vec![cart_item(retired.id, None, 1)];
        let products = HashMap::from([(retired.id, retired)]);

        let err = snapshot_lines(&items, &products, &HashMap::new()).unwrap_err();
        assert!(matches!(err, ShopError::BadRequest(msg) if msg.contains("Retired vase")));
    }

    #[test]
    fn test_subtotal_overflow_is_rejected() {
        let line = NewOrderItem {
            product_id: ProductId::new(),
            product_option_id: None,
            product_name: "Kiln".to_string(),
            option_label: None,
            price: Won::new(i64::MAX),
            quantity: 1,
            line_total: Won::new(i64::MAX),
        };
        assert!(subtotal(&[line.clone(), line]).is_err());
    }

    #[test]
    fn test_with_items_groups_by_order() {
        let order = |n: &str| Order {
            id: OrderId::new(),
            user_id: UserId::new(),
            order_number: n.to_string(),
            status: OrderStatus::Pending,
            shipping_address_id: None,
            subtotal: Won::new(10_000),
            shipping_fee: Won::new(3_000),
            discount_amount: Won::ZERO,
            total: Won::new(13_000),
            coupon_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let first = order("ORD-20260314-AAAAAAAA");
        let second = order("ORD-20260314-BBBBBBBB");
        let item = OrderItem {
            id: Uuid::new_v4(),
            order_id: second.id,
            product_id: ProductId::new(),
            product_option_id: None,
            product_name: "Cup".to_string(),
            option_label: None,
            price: Won::new(10_000),
            quantity: 1,
            line_total: Won::new(10_000),
        };

        let grouped = with_items(vec![first, second], vec![item]);
        assert!(grouped.first().unwrap().order_items.is_empty());
        assert_eq!(grouped.get(1).unwrap().order_items.len(), 1);
    }

    #[test]
    fn test_transition_error_message() {
        let err = transition_error(OrderStatus::Shipped, OrderStatus::Cancelled);
        assert_eq!(
            err.to_string(),
            "cannot change order status from shipped to cancelled"
        );

        let err = transition_error(OrderStatus::Delivered, OrderStatus::Cancelled);
        assert_eq!(err.to_string(), "order is already delivered");
    }
}
