//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Password accounts and access tokens
//! - `addresses` - Address book with a single default per user
//! - `catalog` - Product reads (cached) and admin product writes
//! - `cart` - Cart merge and quantity updates
//! - `checkout` - Order placement, cancellation and status changes
//! - `reviews` - Product reviews
//! - `coupons` - Coupon definitions and grants
//!
//! Services validate input and own transactions. Each multi-statement write
//! begins a transaction on the pool and passes it to the `db` step functions.

pub mod addresses;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod coupons;
mod input;
pub mod reviews;

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors from the shop services.
#[derive(Debug, Error)]
pub enum ShopError {
    /// The entity does not exist or is not visible to the caller.
    #[error("{0} not found")]
    NotFound(String),

    /// Input failed validation or the operation is not allowed.
    #[error("{0}")]
    BadRequest(String),

    /// A unique value is already taken, or a row is still referenced.
    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl ShopError {
    pub(crate) fn not_found(what: &str) -> Self {
        Self::NotFound(what.to_string())
    }

    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }
}

impl From<sqlx::Error> for ShopError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}
