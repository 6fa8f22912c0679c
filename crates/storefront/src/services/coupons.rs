//! Coupons: admin definitions, grants, and the caller's wallet.

use std::collections::HashMap;

use sqlx::PgPool;
use tracing::instrument;

use clayhouse_core::{CouponId, DiscountType, UserId};

use super::ShopError;
use super::checkout::normalize_coupon_code;
use crate::db::{CouponRepository, RepositoryError};
use crate::models::coupon::{Coupon, CouponInput, UserCoupon, UserCouponView};

const MAX_CODE: usize = 50;

fn validate(input: &CouponInput) -> Result<CouponInput, ShopError> {
    let code = normalize_coupon_code(&input.code);
    if code.is_empty() || code.chars().count() > MAX_CODE {
        return Err(ShopError::bad_request(format!(
            "code must be 1 to {MAX_CODE} characters"
        )));
    }
    match input.discount_type {
        DiscountType::Percent if !(1..=100).contains(&input.discount_value) => {
            return Err(ShopError::bad_request(
                "percent discount must be between 1 and 100",
            ));
        }
        DiscountType::Fixed if input.discount_value <= 0 => {
            return Err(ShopError::bad_request("fixed discount must be positive"));
        }
        _ => {}
    }
    if input.min_order_amount.is_some_and(|m| m.is_negative()) {
        return Err(ShopError::bad_request("minOrderAmount must not be negative"));
    }
    if input.valid_until <= input.valid_from {
        return Err(ShopError::bad_request("validUntil must be after validFrom"));
    }
    if input.usage_limit.is_some_and(|l| l < 1) {
        return Err(ShopError::bad_request("usageLimit must be at least 1"));
    }

    Ok(CouponInput {
        code,
        ..input.clone()
    })
}

/// Coupon service.
pub struct CouponService<'a> {
    repo: CouponRepository<'a>,
}

impl<'a> CouponService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            repo: CouponRepository::new(pool),
        }
    }

    /// Coupons issued to the caller, newest first, with their terms.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Repository` if a query fails.
    pub async fn mine(&self, user_id: UserId) -> Result<Vec<UserCouponView>, ShopError> {
        let grants = self.repo.grants_for_user(user_id).await?;
        if grants.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<CouponId> = grants.iter().map(|g| g.coupon_id).collect();
        let coupons: HashMap<CouponId, Coupon> = self
            .repo
            .by_ids(&ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        grants
            .into_iter()
            .map(|grant| -> Result<UserCouponView, ShopError> {
                let coupon = coupons.get(&grant.coupon_id).cloned().ok_or_else(|| {
                    RepositoryError::DataCorruption(format!(
                        "grant {} references missing coupon {}",
                        grant.id, grant.coupon_id
                    ))
                })?;
                Ok(UserCouponView { grant, coupon })
            })
            .collect()
    }

    /// Define a coupon.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::BadRequest` for invalid terms.
    /// Returns `ShopError::Conflict` if the code is taken.
    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create(&self, input: &CouponInput) -> Result<Coupon, ShopError> {
        let input = validate(input)?;
        self.repo.create(&input).await.map_err(|e| match e {
            RepositoryError::Conflict(msg) => ShopError::Conflict(msg),
            other => ShopError::Repository(other),
        })
    }

    /// Issue a coupon to a user.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::NotFound` if the coupon or the user does not exist.
    #[instrument(skip(self), fields(coupon_id = %coupon_id, user_id = %user_id))]
    pub async fn issue(&self, coupon_id: CouponId, user_id: UserId) -> Result<UserCoupon, ShopError> {
        self.repo.issue(coupon_id, user_id).await.map_err(|e| match e {
            RepositoryError::ForeignKey(_) => ShopError::not_found("coupon or user"),
            other => ShopError::Repository(other),
        })
    }
}
