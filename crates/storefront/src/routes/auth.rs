//! Account route handlers.
//!
//! Register and login hand out a bearer token; `/auth/me` reads and edits the
//! signed-in profile.

use axum::{Json, extract::State, http::StatusCode};
use tracing::instrument;

use super::extract::JsonBody;
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::user::UserProfile;
use crate::services::auth::{AuthService, AuthSession, LoginInput, ProfileUpdate, RegisterInput};
use crate::state::AppState;

/// Create an email account and sign it in.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<RegisterInput>,
) -> Result<(StatusCode, Json<AuthSession>)> {
    let session = AuthService::new(state.pool(), state.tokens())
        .register(&input)
        .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// Exchange email and password for a token.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<LoginInput>,
) -> Result<Json<AuthSession>> {
    let session = AuthService::new(state.pool(), state.tokens())
        .login(&input)
        .await?;
    Ok(Json(session))
}

pub async fn me(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
) -> Result<Json<UserProfile>> {
    let profile = AuthService::new(state.pool(), state.tokens())
        .profile(claims.sub)
        .await?;
    Ok(Json(profile))
}

/// Update name, phone, or password.
pub async fn update_me(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    JsonBody(update): JsonBody<ProfileUpdate>,
) -> Result<Json<UserProfile>> {
    let profile = AuthService::new(state.pool(), state.tokens())
        .update_profile(claims.sub, &update)
        .await?;
    Ok(Json(profile))
}
