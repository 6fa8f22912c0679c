//! Clayhouse Storefront library.
//!
//! This crate provides the shop backend as a library, so the binary, the CLI
//! and the router-level tests share one implementation.
//!
//! # Layers
//!
//! - [`routes`] - axum handlers and the router with its middleware stack
//! - [`services`] - validation and transactions per feature
//! - [`db`] - `sqlx` repositories and transaction steps
//! - [`models`] - rows and request bodies

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use routes::router;
pub use state::AppState;
