//! Request extractors whose rejections use the API error body.
//!
//! Axum's own `Json`, `Path` and `Query` reject with plain-text bodies. These
//! wrappers route the rejection through [`AppError`] instead, so a malformed
//! body or a non-UUID path segment gets the same `{statusCode, message}` shape
//! as every other error.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

/// JSON request body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// Path parameters.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct PathParam<T>(pub T);

/// Query string parameters.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct QueryParams<T>(pub T);
