//! Coupon-wallet route handlers.

use axum::{Json, extract::State};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::coupon::UserCouponView;
use crate::services::coupons::CouponService;
use crate::state::AppState;

/// Coupons issued to the caller, with their terms.
pub async fn mine(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
) -> Result<Json<Vec<UserCouponView>>> {
    let coupons = CouponService::new(state.pool()).mine(claims.sub).await?;
    Ok(Json(coupons))
}
