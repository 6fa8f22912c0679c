//! Review route handlers.

use axum::{Json, extract::State, http::StatusCode};

use clayhouse_core::ProductId;

use super::extract::{JsonBody, PathParam};
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::review::{MyReview, ReviewInput, ReviewView};
use crate::services::reviews::ReviewService;
use crate::state::AppState;

/// Review a product as the caller.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    PathParam(product_id): PathParam<ProductId>,
    JsonBody(input): JsonBody<ReviewInput>,
) -> Result<(StatusCode, Json<ReviewView>)> {
    let review = ReviewService::new(state.pool(), state.catalog_cache())
        .create(claims.sub, product_id, &input)
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn mine(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
) -> Result<Json<Vec<MyReview>>> {
    let reviews = ReviewService::new(state.pool(), state.catalog_cache())
        .mine(claims.sub)
        .await?;
    Ok(Json(reviews))
}
