//! Review persistence.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use clayhouse_core::{Email, ProductId, ReviewId, UserId};

use super::RepositoryError;
use crate::models::review::{MyReview, Review, ReviewImage, ReviewView, ReviewedProduct};
use crate::models::user::AuthorSummary;

/// A review joined with its author.
#[derive(Debug, sqlx::FromRow)]
struct ReviewAuthorRow {
    id: ReviewId,
    product_id: ProductId,
    user_id: UserId,
    rating: Option<i32>,
    body: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    author_full_name: Option<String>,
    author_email: Email,
}

impl ReviewAuthorRow {
    fn into_view(self, images: Vec<ReviewImage>) -> ReviewView {
        ReviewView {
            user: AuthorSummary {
                id: self.user_id,
                full_name: self.author_full_name,
                email: self.author_email,
            },
            review: Review {
                id: self.id,
                product_id: self.product_id,
                user_id: self.user_id,
                rating: self.rating,
                body: self.body,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
            images,
        }
    }
}

/// A review joined with the product it is about.
#[derive(Debug, sqlx::FromRow)]
struct ReviewProductRow {
    id: ReviewId,
    product_id: ProductId,
    user_id: UserId,
    rating: Option<i32>,
    body: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    product_name: String,
    product_slug: String,
}

/// Group image rows by review, keeping their order.
fn group_images(images: Vec<ReviewImage>) -> HashMap<ReviewId, Vec<ReviewImage>> {
    let mut grouped: HashMap<ReviewId, Vec<ReviewImage>> = HashMap::new();
    for image in images {
        grouped.entry(image.review_id).or_default().push(image);
    }
    grouped
}

/// Read access to reviews.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Reviews of a product, newest first, with author and images.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<ReviewView>, RepositoryError> {
        let rows = sqlx::query_as::<_, ReviewAuthorRow>(
            r"
            SELECT r.id, r.product_id, r.user_id, r.rating, r.body, r.created_at, r.updated_at,
                   u.full_name AS author_full_name, u.email AS author_email
            FROM product_reviews r
            JOIN users u ON u.id = r.user_id
            WHERE r.product_id = $1
            ORDER BY r.created_at DESC
            ",
        )
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        let ids: Vec<ReviewId> = rows.iter().map(|r| r.id).collect();
        let mut images = group_images(self.images_for(&ids).await?);

        Ok(rows
            .into_iter()
            .map(|row| {
                let own = images.remove(&row.id).unwrap_or_default();
                row.into_view(own)
            })
            .collect())
    }

    /// Reviews written by a user, newest first, with product and images.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<MyReview>, RepositoryError> {
        let rows = sqlx::query_as::<_, ReviewProductRow>(
            r"
            SELECT r.id, r.product_id, r.user_id, r.rating, r.body, r.created_at, r.updated_at,
                   p.name AS product_name, p.slug AS product_slug
            FROM product_reviews r
            JOIN products p ON p.id = r.product_id
            WHERE r.user_id = $1
            ORDER BY r.created_at DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        let ids: Vec<ReviewId> = rows.iter().map(|r| r.id).collect();
        let mut images = group_images(self.images_for(&ids).await?);

        Ok(rows
            .into_iter()
            .map(|row| MyReview {
                images: images.remove(&row.id).unwrap_or_default(),
                product: ReviewedProduct {
                    id: row.product_id,
                    name: row.product_name,
                    slug: row.product_slug,
                },
                review: Review {
                    id: row.id,
                    product_id: row.product_id,
                    user_id: row.user_id,
                    rating: row.rating,
                    body: row.body,
                    created_at: row.created_at,
                    updated_at: row.updated_at,
                },
            })
            .collect())
    }

    /// Images of the given reviews, in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn images_for(&self, review_ids: &[ReviewId]) -> Result<Vec<ReviewImage>, RepositoryError> {
        if review_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, ReviewImage>(
            r"
            SELECT id, review_id, url, sort_order
            FROM product_review_images
            WHERE review_id = ANY($1)
            ORDER BY review_id, sort_order, id
            ",
        )
        .bind(review_ids)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }
}

/// Insert the review row.
///
/// # Errors
///
/// Returns `RepositoryError::ForeignKey` if the product vanished concurrently.
/// Returns `RepositoryError::Database` for other database errors.
pub async fn insert(
    conn: &mut PgConnection,
    product_id: ProductId,
    user_id: UserId,
    rating: Option<i32>,
    body: &str,
) -> Result<Review, RepositoryError> {
    sqlx::query_as::<_, Review>(
        r"
        INSERT INTO product_reviews (product_id, user_id, rating, body)
        VALUES ($1, $2, $3, $4)
        RETURNING id, product_id, user_id, rating, body, created_at, updated_at
        ",
    )
    .bind(product_id)
    .bind(user_id)
    .bind(rating)
    .bind(body)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| RepositoryError::classify(e, "review"))
}

/// Attach image URLs to a review. `sort_order` starts at 1.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if an insert fails.
pub async fn insert_images(
    conn: &mut PgConnection,
    review_id: ReviewId,
    urls: &[String],
) -> Result<Vec<ReviewImage>, RepositoryError> {
    let mut images = Vec::with_capacity(urls.len());
    for (sort_order, url) in (1_i32..).zip(urls) {
        let image = sqlx::query_as::<_, ReviewImage>(
            r"
            INSERT INTO product_review_images (review_id, url, sort_order)
            VALUES ($1, $2, $3)
            RETURNING id, review_id, url, sort_order
            ",
        )
        .bind(review_id)
        .bind(url)
        .bind(sort_order)
        .fetch_one(&mut *conn)
        .await?;
        images.push(image);
    }
    Ok(images)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn image(review_id: ReviewId, sort_order: i32) -> ReviewImage {
        ReviewImage {
            id: Uuid::new_v4(),
            review_id,
            url: format!("https://cdn.example/{sort_order}.jpg"),
            sort_order,
        }
    }

    #[test]
    fn test_group_images_keeps_order_per_review() {
        let a = ReviewId::new();
        let b = ReviewId::new();
        let grouped = group_images(vec![image(a, 1), image(b, 1), image(a, 2)]);

        let a_orders: Vec<i32> = grouped.get(&a).unwrap().iter().map(|i| i.sort_order).collect();
        assert_eq!(a_orders, vec![1, 2]);
        assert_eq!(grouped.get(&b).unwrap().len(), 1);
    }
}
