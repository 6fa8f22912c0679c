//! Domain models for the storefront.
//!
//! Row types derive `sqlx::FromRow`; response types serialize with camelCase
//! field names. Request bodies live next to the model they create or patch.

pub mod address;
pub mod cart;
pub mod coupon;
pub mod order;
pub mod product;
pub mod review;
pub mod user;

pub use address::{Address, AddressInput, AddressPatch};
pub use cart::{CartItem, CartLine};
pub use coupon::{Coupon, CouponInput, UserCoupon, UserCouponView};
pub use order::{Order, OrderItem, OrderWithItems};
pub use product::{
    Category, ImageInput, OptionInput, Product, ProductDetail, ProductImage, ProductInput,
    ProductOption, ProductPatch, ProductSummary,
};
pub use review::{MyReview, Review, ReviewImage, ReviewInput, ReviewView};
pub use user::{AuthorSummary, User, UserProfile};
