//! Coupons and per-user coupon grants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use clayhouse_core::{CouponId, CouponTerms, DiscountType, OrderId, UserCouponId, UserId, Won};

/// A coupon definition.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: CouponId,
    /// Always stored uppercase.
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub min_order_amount: Option<Won>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Coupon {
    /// The fields that decide the discount.
    #[must_use]
    pub fn terms(&self) -> CouponTerms {
        CouponTerms {
            discount_type: self.discount_type,
            discount_value: self.discount_value,
            min_order_amount: self.min_order_amount.unwrap_or(Won::ZERO),
            valid_from: self.valid_from,
            valid_until: self.valid_until,
            usage_limit: self.usage_limit,
            used_count: self.used_count,
            is_active: self.is_active,
        }
    }
}

/// A coupon issued to a user.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserCoupon {
    pub id: UserCouponId,
    pub user_id: UserId,
    pub coupon_id: CouponId,
    pub used_at: Option<DateTime<Utc>>,
    pub order_id: Option<OrderId>,
    pub created_at: DateTime<Utc>,
}

/// An issued coupon together with its terms.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCouponView {
    #[serde(flatten)]
    pub grant: UserCoupon,
    pub coupon: Coupon,
}

/// Body of `POST /shop/admin/coupons`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponInput {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub min_order_amount: Option<Won>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub usage_limit: Option<i32>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

const fn default_active() -> bool {
    true
}

/// Body of `POST /shop/admin/coupons/{id}/issue`.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCoupon {
    pub user_id: UserId,
}
