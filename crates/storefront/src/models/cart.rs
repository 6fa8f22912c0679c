//! Cart line items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use clayhouse_core::{CartItemId, OptionId, ProductId, UserId};

use super::product::{Product, ProductImage, ProductOption};

/// A cart row. Unique per (user, product, option).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: CartItemId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub option_id: Option<OptionId>,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Product as shown inside a cart line: the row plus its first image.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartProduct {
    #[serde(flatten)]
    pub product: Product,
    pub images: Vec<ProductImage>,
}

/// A cart row with the product and option it points at.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    #[serde(flatten)]
    pub item: CartItem,
    pub product: CartProduct,
    pub option: Option<ProductOption>,
}

/// Body of `POST /shop/cart`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCart {
    pub product_id: ProductId,
    pub quantity: i32,
    pub option_id: Option<OptionId>,
}

/// Body of `PATCH /shop/cart/{id}`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct UpdateQuantity {
    pub quantity: i32,
}
