//! Public catalog route handlers.

use std::sync::Arc;

use axum::{Json, extract::State};
use serde::Deserialize;

use clayhouse_core::{CategoryId, ProductId};

use super::extract::{PathParam, QueryParams};
use crate::error::Result;
use crate::models::product::{Category, ProductDetail, ProductSummary};
use crate::services::catalog::CatalogService;
use crate::state::AppState;

/// Query string of `GET /shop/products`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub category_id: Option<CategoryId>,
}

pub async fn categories(State(state): State<AppState>) -> Result<Json<Arc<Vec<Category>>>> {
    let categories = CatalogService::new(state.pool(), state.catalog_cache())
        .categories()
        .await?;
    Ok(Json(categories))
}

/// Active products, optionally within one category.
pub async fn products(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ProductQuery>,
) -> Result<Json<Vec<ProductSummary>>> {
    let products = CatalogService::new(state.pool(), state.catalog_cache())
        .products(query.category_id)
        .await?;
    Ok(Json(products))
}

/// Full product page: images, options, detail images, and reviews.
pub async fn product(
    State(state): State<AppState>,
    PathParam(id): PathParam<ProductId>,
) -> Result<Json<Arc<ProductDetail>>> {
    let product = CatalogService::new(state.pool(), state.catalog_cache())
        .product(id)
        .await?;
    Ok(Json(product))
}
