//! Order arithmetic: line totals, shipping, coupon discounts and totals.
//!
//! Everything here is pure so the checkout transaction can compute an order
//! from locked rows without further queries.

use chrono::{DateTime, Utc};

use crate::types::{DiscountType, Won};

/// Unit price times quantity, `None` on overflow.
#[must_use]
pub fn line_total(price: Won, quantity: i32) -> Option<Won> {
    price.times(quantity)
}

/// Flat-rate shipping with a free-shipping threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShippingPolicy {
    /// Fee charged below the threshold.
    pub flat_fee: Won,
    /// Subtotals at or above this amount ship free.
    pub free_threshold: Won,
}

impl Default for ShippingPolicy {
    fn default() -> Self {
        Self {
            flat_fee: Won::new(3_000),
            free_threshold: Won::new(50_000),
        }
    }
}

impl ShippingPolicy {
    /// Shipping fee for a cart subtotal.
    #[must_use]
    pub fn fee_for(&self, subtotal: Won) -> Won {
        if subtotal <= Won::ZERO || subtotal >= self.free_threshold {
            Won::ZERO
        } else {
            self.flat_fee
        }
    }
}

/// Why a coupon cannot be applied to an order.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DiscountError {
    #[error("coupon is not active")]
    Inactive,
    #[error("coupon is not valid yet")]
    NotYetValid,
    #[error("coupon has expired")]
    Expired,
    #[error("coupon usage limit reached")]
    UsageLimitReached,
    #[error("order must be at least {min} to use this coupon")]
    BelowMinimum { min: Won },
}

/// The parts of a coupon row that decide its discount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouponTerms {
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub min_order_amount: Won,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub is_active: bool,
}

impl CouponTerms {
    /// Discount this coupon grants on `subtotal` at time `now`.
    ///
    /// Percent discounts round down to the whole won. Fixed discounts never
    /// exceed the subtotal.
    ///
    /// # Errors
    ///
    /// Returns a [`DiscountError`] when the coupon is inactive, outside its
    /// validity window, used up, or the subtotal is below the minimum.
    pub fn discount_for(&self, subtotal: Won, now: DateTime<Utc>) -> Result<Won, DiscountError> {
        if !self.is_active {
            return Err(DiscountError::Inactive);
        }
        if now < self.valid_from {
            return Err(DiscountError::NotYetValid);
        }
        if now > self.valid_until {
            return Err(DiscountError::Expired);
        }
        if self.usage_limit.is_some_and(|limit| self.used_count >= limit) {
            return Err(DiscountError::UsageLimitReached);
        }
        if subtotal < self.min_order_amount {
            return Err(DiscountError::BelowMinimum {
                min: self.min_order_amount,
            });
        }

        let discount = match self.discount_type {
            DiscountType::Percent => {
                let pct = i128::from(self.discount_value.clamp(0, 100));
                let amount = i128::from(subtotal.amount()) * pct / 100;
                Won::new(i64::try_from(amount).unwrap_or(i64::MAX))
            }
            DiscountType::Fixed => Won::new(self.discount_value.max(0)),
        };
        Ok(discount.min(subtotal))
    }
}

/// Computed money fields of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: Won,
    pub shipping_fee: Won,
    pub discount_amount: Won,
    pub total: Won,
}

impl OrderTotals {
    /// Combine the parts so that `total = subtotal + shipping - discount`.
    ///
    /// The discount is clamped to `subtotal + shipping` so the total is never
    /// negative and the identity always holds for the stored values.
    #[must_use]
    pub fn compute(subtotal: Won, shipping_fee: Won, discount: Won) -> Self {
        let gross = subtotal + shipping_fee;
        let discount_amount = discount.min(gross).max(Won::ZERO);
        Self {
            subtotal,
            shipping_fee,
            discount_amount,
            total: gross.saturating_sub(discount_amount),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn percent(value: i64) -> CouponTerms {
        CouponTerms {
            discount_type: DiscountType::Percent,
            discount_value: value,
            min_order_amount: Won::ZERO,
            valid_from: Utc::now() - Duration::days(30),
            valid_until: Utc::now() + Duration::days(30),
            usage_limit: None,
            used_count: 0,
            is_active: true,
        }
    }

    #[test]
    fn test_shipping_threshold() {
        let policy = ShippingPolicy::default();
        assert_eq!(policy.fee_for(Won::ZERO), Won::ZERO);
        assert_eq!(policy.fee_for(Won::new(49_999)), Won::new(3_000));
        assert_eq!(policy.fee_for(Won::new(50_000)), Won::ZERO);
    }

    #[test]
    fn test_percent_rounds_down() {
        let d = percent(15).discount_for(Won::new(33_333), Utc::now()).unwrap();
        assert_eq!(d, Won::new(4_999));
    }

    #[test]
    fn test_fixed_capped_at_subtotal() {
        let terms = CouponTerms {
            discount_type: DiscountType::Fixed,
            discount_value: 10_000,
            ..percent(0)
        };
        assert_eq!(
            terms.discount_for(Won::new(7_000), Utc::now()).unwrap(),
            Won::new(7_000)
        );
    }

    #[test]
    fn test_validity_window() {
        let now = Utc::now();
        let early = CouponTerms {
            valid_from: now + Duration::days(1),
            ..percent(10)
        };
        assert_eq!(
            early.discount_for(Won::new(10_000), now),
            Err(DiscountError::NotYetValid)
        );

        let late = CouponTerms {
            valid_until: now - Duration::seconds(1),
            ..percent(10)
        };
        assert_eq!(
            late.discount_for(Won::new(10_000), now),
            Err(DiscountError::Expired)
        );
    }

    #[test]
    fn test_usage_and_minimum() {
        let used_up = CouponTerms {
            usage_limit: Some(5),
            used_count: 5,
            ..percent(10)
        };
        assert_eq!(
            used_up.discount_for(Won::new(10_000), Utc::now()),
            Err(DiscountError::UsageLimitReached)
        );

        let minimum = CouponTerms {
            min_order_amount: Won::new(30_000),
            ..percent(10)
        };
        assert!(matches!(
            minimum.discount_for(Won::new(29_000), Utc::now()),
            Err(DiscountError::BelowMinimum { .. })
        ));

        let inactive = CouponTerms {
            is_active: false,
            ..percent(10)
        };
        assert_eq!(
            inactive.discount_for(Won::new(10_000), Utc::now()),
            Err(DiscountError::Inactive)
        );
    }

    #[test]
    fn test_totals_identity() {
        let t = OrderTotals::compute(Won::new(42_000), Won::new(3_000), Won::new(4_200));
        assert_eq!(t.total, Won::new(40_800));
        assert_eq!(
            t.total,
            (t.subtotal + t.shipping_fee).saturating_sub(t.discount_amount)
        );
    }

    #[test]
    fn test_totals_never_negative() {
        let t = OrderTotals::compute(Won::new(1_000), Won::ZERO, Won::new(5_000));
        assert_eq!(t.discount_amount, Won::new(1_000));
        assert_eq!(t.total, Won::ZERO);
    }

    #[test]
    fn test_line_total() {
        assert_eq!(line_total(Won::new(18_000), 2), Some(Won::new(36_000)));
    }
}
