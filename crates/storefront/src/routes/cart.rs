//! Cart route handlers.
//!
//! Every line belongs to the caller; another user's line id answers 404.

use axum::{Json, extract::State, http::StatusCode};
use tracing::instrument;

use clayhouse_core::CartItemId;

use super::extract::{JsonBody, PathParam};
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::cart::{AddToCart, CartItem, CartLine, UpdateQuantity};
use crate::services::cart::CartService;
use crate::state::AppState;

/// Cart lines, newest first, with product and option.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
) -> Result<Json<Vec<CartLine>>> {
    let lines = CartService::new(state.pool()).lines(claims.sub).await?;
    Ok(Json(lines))
}

/// Add a product, merging into an existing line for the same option.
#[instrument(skip_all, fields(product_id = %input.product_id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    JsonBody(input): JsonBody<AddToCart>,
) -> Result<(StatusCode, Json<CartItem>)> {
    let item = CartService::new(state.pool()).add(claims.sub, &input).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    PathParam(id): PathParam<CartItemId>,
    JsonBody(body): JsonBody<UpdateQuantity>,
) -> Result<Json<CartItem>> {
    let item = CartService::new(state.pool())
        .set_quantity(claims.sub, id, body.quantity)
        .await?;
    Ok(Json(item))
}

/// Remove a line and return it.
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    PathParam(id): PathParam<CartItemId>,
) -> Result<Json<CartItem>> {
    let item = CartService::new(state.pool()).remove(claims.sub, id).await?;
    Ok(Json(item))
}
