//! Order route handlers for the signed-in customer.

use axum::{Json, body::Bytes, extract::State, http::StatusCode};
use tracing::instrument;

use clayhouse_core::OrderId;

use super::extract::PathParam;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::order::{OrderWithItems, PlaceOrder};
use crate::services::checkout::CheckoutService;
use crate::state::AppState;

fn checkout(state: &AppState) -> CheckoutService<'_> {
    CheckoutService::new(state.pool(), state.config().shipping)
}

fn parse_place_order(body: &[u8]) -> Result<PlaceOrder> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(PlaceOrder::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("invalid order body: {e}")))
}

/// The caller's orders, newest first, with their items.
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
) -> Result<Json<Vec<OrderWithItems>>> {
    let orders = checkout(&state).my_orders(claims.sub).await?;
    Ok(Json(orders))
}

/// Turn the caller's cart into an order.
///
/// The body is optional; an empty body ships to the default address with no
/// coupon.
#[instrument(skip_all, fields(user_id = %claims.sub))]
pub async fn place(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    body: Bytes,
) -> Result<(StatusCode, Json<OrderWithItems>)> {
    let input = parse_place_order(&body)?;
    let order = checkout(&state).place_order(claims.sub, &input).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    PathParam(id): PathParam<OrderId>,
) -> Result<Json<OrderWithItems>> {
    let order = checkout(&state).cancel(claims.sub, id).await?;
    Ok(Json(order))
}
