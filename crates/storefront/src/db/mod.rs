//! Database operations for the storefront `PostgreSQL`.
//!
//! # Tables
//!
//! - `users`, `addresses` - Accounts and address book
//! - `product_categories`, `products`, `product_images`,
//!   `product_detail_images`, `product_options` - Catalog
//! - `cart_items` - One row per (user, product, option)
//! - `product_reviews`, `product_review_images` - Reviews
//! - `coupons`, `user_coupons` - Discounts
//! - `orders`, `order_items` - Immutable purchase snapshots
//!
//! Repositories borrow the pool for reads and single-statement writes.
//! Steps of a multi-statement write are free functions that take the
//! caller's `&mut PgConnection`, so services can run several of them in one
//! transaction.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p clayhouse-cli -- migrate
//! ```

pub mod addresses;
pub mod cart;
pub mod catalog;
pub mod coupons;
pub mod orders;
pub mod reviews;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use addresses::AddressRepository;
pub use cart::CartRepository;
pub use catalog::CatalogRepository;
pub use coupons::CouponRepository;
pub use orders::OrderRepository;
pub use reviews::ReviewRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Unique constraint violation (e.g., duplicate slug).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// Foreign key violation (missing parent or row still referenced).
    #[error("foreign key violation: {0}")]
    ForeignKey(String),
}

impl RepositoryError {
    /// Classify a sqlx error, naming the entity for constraint violations.
    pub(crate) fn classify(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return Self::Conflict(format!("{what} already exists"));
            }
            if db_err.is_foreign_key_violation() {
                let constraint = db_err.constraint().unwrap_or("unknown");
                return Self::ForeignKey(format!("{what}: {constraint}"));
            }
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
