//! Authentication extractors.
//!
//! Requests authenticate with `Authorization: Bearer <token>`. The token is
//! verified against the state's keys; no database lookup happens here, so a
//! deleted account keeps working until its token expires. Handlers that need
//! the account itself load it and surface `UserNotFound`.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::{AppError, set_sentry_user};
use crate::services::auth::Claims;
use crate::state::AppState;

/// Extractor that requires a valid access token.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireAuth(claims): RequireAuth) -> String {
///     claims.email
/// }
/// ```
pub struct RequireAuth(pub Claims);

/// Extractor that requires a valid access token with the admin role.
pub struct RequireAdmin(pub Claims);

/// Pull the token out of an `Authorization` header value.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

fn claims_from_parts(parts: &Parts, state: &AppState) -> Result<Claims, AppError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("missing access token".to_string()))?;
    let token = header
        .to_str()
        .ok()
        .and_then(bearer_token)
        .ok_or_else(|| AppError::Unauthorized("malformed authorization header".to_string()))?;

    let claims = state.tokens().verify(token)?;
    set_sentry_user(&claims.sub, Some(&claims.email));
    tracing::Span::current().record("user_id", tracing::field::display(claims.sub));
    Ok(claims)
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        claims_from_parts(parts, state).map(Self)
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = claims_from_parts(parts, state)?;
        if !claims.is_admin() {
            return Err(AppError::Forbidden("admin role required".to_string()));
        }
        Ok(Self(claims))
    }
}
