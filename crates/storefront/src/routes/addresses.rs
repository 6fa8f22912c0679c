//! Address book route handlers, scoped to the caller.

use axum::{Json, extract::State, http::StatusCode};

use clayhouse_core::AddressId;

use super::extract::{JsonBody, PathParam};
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::address::{Address, AddressInput, AddressPatch};
use crate::services::addresses::AddressService;
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
) -> Result<Json<Vec<Address>>> {
    let addresses = AddressService::new(state.pool()).list(claims.sub).await?;
    Ok(Json(addresses))
}

pub async fn create(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    JsonBody(input): JsonBody<AddressInput>,
) -> Result<(StatusCode, Json<Address>)> {
    let address = AddressService::new(state.pool())
        .create(claims.sub, &input)
        .await?;
    Ok((StatusCode::CREATED, Json(address)))
}

pub async fn update(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    PathParam(id): PathParam<AddressId>,
    JsonBody(patch): JsonBody<AddressPatch>,
) -> Result<Json<Address>> {
    let address = AddressService::new(state.pool())
        .update(claims.sub, id, &patch)
        .await?;
    Ok(Json(address))
}

/// Delete an address and return it.
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    PathParam(id): PathParam<AddressId>,
) -> Result<Json<Address>> {
    let address = AddressService::new(state.pool())
        .delete(claims.sub, id)
        .await?;
    Ok(Json(address))
}
