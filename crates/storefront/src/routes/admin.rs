//! Admin route handlers.
//!
//! Every handler takes [`RequireAdmin`]: a missing token answers 401 and a
//! member token answers 403, before any body is read.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use tracing::instrument;

use clayhouse_core::{CouponId, OrderId, ProductId};

use super::extract::{JsonBody, PathParam, QueryParams};
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::coupon::{Coupon, CouponInput, IssueCoupon, UserCoupon};
use crate::models::order::{Order, OrderFilter, OrderWithItems, UpdateStatus};
use crate::models::product::{ProductDetail, ProductInput, ProductPatch};
use crate::services::catalog::CatalogService;
use crate::services::checkout::CheckoutService;
use crate::services::coupons::CouponService;
use crate::state::AppState;

// =============================================================================
// Products
// =============================================================================

#[instrument(skip_all, fields(admin = %admin.sub, slug = %input.slug))]
pub async fn create_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    JsonBody(input): JsonBody<ProductInput>,
) -> Result<(StatusCode, Json<Arc<ProductDetail>>)> {
    let product = CatalogService::new(state.pool(), state.catalog_cache())
        .create_product(&input)
        .await?;
    tracing::info!(product_id = %product.product.id, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// Patch scalar fields; any child list present replaces the stored one.
#[instrument(skip_all, fields(admin = %admin.sub, product_id = %id))]
pub async fn update_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    PathParam(id): PathParam<ProductId>,
    JsonBody(patch): JsonBody<ProductPatch>,
) -> Result<Json<Arc<ProductDetail>>> {
    let product = CatalogService::new(state.pool(), state.catalog_cache())
        .update_product(id, &patch)
        .await?;
    Ok(Json(product))
}

#[instrument(skip_all, fields(admin = %admin.sub, product_id = %id))]
pub async fn delete_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    PathParam(id): PathParam<ProductId>,
) -> Result<StatusCode> {
    CatalogService::new(state.pool(), state.catalog_cache())
        .delete_product(id)
        .await?;
    tracing::info!("Product deleted");
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Orders
// =============================================================================

/// All orders, newest first, optionally filtered by status.
pub async fn list_orders(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    QueryParams(filter): QueryParams<OrderFilter>,
) -> Result<Json<Vec<OrderWithItems>>> {
    let orders = CheckoutService::new(state.pool(), state.config().shipping)
        .all_orders(filter.status)
        .await?;
    Ok(Json(orders))
}

#[instrument(skip_all, fields(admin = %admin.sub, order_id = %id, status = %body.status))]
pub async fn update_order_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    PathParam(id): PathParam<OrderId>,
    JsonBody(body): JsonBody<UpdateStatus>,
) -> Result<Json<Order>> {
    let order = CheckoutService::new(state.pool(), state.config().shipping)
        .update_status(id, body.status)
        .await?;
    Ok(Json(order))
}

// =============================================================================
// Coupons
// =============================================================================

#[instrument(skip_all, fields(admin = %admin.sub))]
pub async fn create_coupon(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    JsonBody(input): JsonBody<CouponInput>,
) -> Result<(StatusCode, Json<Coupon>)> {
    let coupon = CouponService::new(state.pool()).create(&input).await?;
    Ok((StatusCode::CREATED, Json(coupon)))
}

/// Grant a coupon to one user.
#[instrument(skip_all, fields(admin = %admin.sub, coupon_id = %id))]
pub async fn issue_coupon(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    PathParam(id): PathParam<CouponId>,
    JsonBody(body): JsonBody<IssueCoupon>,
) -> Result<(StatusCode, Json<UserCoupon>)> {
    let grant = CouponService::new(state.pool())
        .issue(id, body.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(grant)))
}
