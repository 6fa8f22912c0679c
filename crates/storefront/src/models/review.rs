//! Product reviews.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use clayhouse_core::{ProductId, ReviewId, UserId};

use super::user::AuthorSummary;

/// A review row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user_id: UserId,
    /// 1 to 5 stars, optional.
    pub rating: Option<i32>,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReviewImage {
    pub id: Uuid,
    pub review_id: ReviewId,
    pub url: String,
    pub sort_order: i32,
}

/// Review as shown on a product page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewView {
    #[serde(flatten)]
    pub review: Review,
    pub user: AuthorSummary,
    pub images: Vec<ReviewImage>,
}

/// Product reference inside "my reviews".
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReviewedProduct {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
}

/// Review as shown in the author's own list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyReview {
    #[serde(flatten)]
    pub review: Review,
    pub product: ReviewedProduct,
    pub images: Vec<ReviewImage>,
}

/// Body of `POST /shop/products/{id}/reviews`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewInput {
    pub body: String,
    pub rating: Option<i32>,
    #[serde(default)]
    pub image_urls: Vec<String>,
}
