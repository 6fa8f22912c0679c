//! Orders and their line snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use clayhouse_core::{AddressId, CouponId, OptionId, OrderId, OrderStatus, ProductId, UserId, Won};

/// An order header.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    /// Human-facing number, `ORD-YYYYMMDD-XXXXXXXX`.
    pub order_number: String,
    pub status: OrderStatus,
    pub shipping_address_id: Option<AddressId>,
    pub subtotal: Won,
    pub shipping_fee: Won,
    pub discount_amount: Won,
    pub total: Won,
    pub coupon_id: Option<CouponId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A purchased line. Name, option label and price are copied at checkout so
/// later catalog edits do not rewrite history.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_option_id: Option<OptionId>,
    pub product_name: String,
    pub option_label: Option<String>,
    pub price: Won,
    pub quantity: i32,
    pub line_total: Won,
}

/// Order with its lines.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub order_items: Vec<OrderItem>,
}

/// Body of `POST /shop/orders`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrder {
    pub shipping_address_id: Option<AddressId>,
    pub coupon_code: Option<String>,
}

/// Body of `PATCH /shop/admin/orders/{id}/status`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct UpdateStatus {
    pub status: OrderStatus,
}

/// Query of `GET /shop/admin/orders`.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
}
