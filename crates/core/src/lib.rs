//! Clayhouse Core - Shared domain types.
//!
//! This crate provides the types used across all Clayhouse components:
//! - `storefront` - REST backend for the studio shop
//! - `cli` - Command-line tools for migrations, seeding and user management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Database encoding for the newtypes is available
//! behind the `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, emails, money and statuses
//! - [`pricing`] - Line totals, shipping fees, coupon discounts and order totals

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod pricing;
pub mod types;

pub use pricing::{CouponTerms, DiscountError, OrderTotals, ShippingPolicy};
pub use types::*;
