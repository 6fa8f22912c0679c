//! Product reviews.

use sqlx::PgPool;
use tracing::instrument;

use clayhouse_core::{ProductId, UserId};

use super::ShopError;
use crate::cache::CatalogCache;
use crate::db::{CatalogRepository, RepositoryError, ReviewRepository, UserRepository, reviews};
use crate::models::review::{MyReview, ReviewInput, ReviewView};
use crate::models::user::AuthorSummary;

const MAX_BODY: usize = 2000;
const MAX_IMAGES: usize = 10;
const MAX_URL: usize = 2048;

/// A review ready to store: trimmed body and URLs.
#[derive(Debug, PartialEq, Eq)]
struct ValidReview {
    body: String,
    rating: Option<i32>,
    image_urls: Vec<String>,
}

fn validate(input: &ReviewInput) -> Result<ValidReview, ShopError> {
    let body = input.body.trim();
    if body.is_empty() {
        return Err(ShopError::bad_request("review body is required"));
    }
    if body.chars().count() > MAX_BODY {
        return Err(ShopError::bad_request(format!(
            "review body must be at most {MAX_BODY} characters"
        )));
    }
    if let Some(rating) = input.rating
        && !(1..=5).contains(&rating)
    {
        return Err(ShopError::bad_request("rating must be between 1 and 5"));
    }
    if input.image_urls.len() > MAX_IMAGES {
        return Err(ShopError::bad_request(format!(
            "a review can have at most {MAX_IMAGES} images"
        )));
    }
    let image_urls: Vec<String> = input
        .image_urls
        .iter()
        .map(|u| u.trim().to_string())
        .collect();
    if image_urls.iter().any(|u| u.is_empty() || u.len() > MAX_URL) {
        return Err(ShopError::bad_request("image url must be 1 to 2048 characters"));
    }

    Ok(ValidReview {
        body: body.to_string(),
        rating: input.rating,
        image_urls,
    })
}

/// Review service.
pub struct ReviewService<'a> {
    pool: &'a PgPool,
    cache: &'a CatalogCache,
}

impl<'a> ReviewService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, cache: &'a CatalogCache) -> Self {
        Self { pool, cache }
    }

    /// Post a review with its images.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::BadRequest` for invalid input.
    /// Returns `ShopError::NotFound` if the product does not exist.
    #[instrument(skip(self, input), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn create(
        &self,
        user_id: UserId,
        product_id: ProductId,
        input: &ReviewInput,
    ) -> Result<ReviewView, ShopError> {
        let valid = validate(input)?;

        CatalogRepository::new(self.pool)
            .get_product(product_id)
            .await?
            .ok_or_else(|| ShopError::not_found("product"))?;
        let author = UserRepository::new(self.pool)
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| ShopError::not_found("user"))?;

        let mut tx = self.pool.begin().await?;
        let review = reviews::insert(&mut tx, product_id, user_id, valid.rating, &valid.body)
            .await
            .map_err(|e| match e {
                RepositoryError::ForeignKey(_) => ShopError::not_found("product"),
                other => ShopError::Repository(other),
            })?;
        let images = reviews::insert_images(&mut tx, review.id, &valid.image_urls).await?;
        tx.commit().await?;

        self.cache.invalidate_product(product_id).await;

        Ok(ReviewView {
            review,
            user: AuthorSummary {
                id: author.id,
                full_name: author.full_name,
                email: author.email,
            },
            images,
        })
    }

    /// The caller's reviews, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Repository` if a query fails.
    pub async fn mine(&self, user_id: UserId) -> Result<Vec<MyReview>, ShopError> {
        Ok(ReviewRepository::new(self.pool).list_for_user(user_id).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input(body: &str) -> ReviewInput {
        ReviewInput {
            body: body.to_string(),
            rating: Some(5),
            image_urls: vec![" https://cdn.example/r1.jpg ".to_string()],
        }
    }

    #[test]
    fn test_validate_trims() {
        let valid = validate(&input("  Lovely glaze.  ")).unwrap();
        assert_eq!(valid.body, "Lovely glaze.");
        assert_eq!(valid.image_urls, vec!["https://cdn.example/r1.jpg".to_string()]);
    }

    #[test]
    fn test_validate_body_bounds() {
        assert!(validate(&input("   ")).is_err());
        assert!(validate(&input(&"가".repeat(MAX_BODY))).is_ok());
        assert!(validate(&input(&"가".repeat(MAX_BODY + 1))).is_err());
    }

    #[test]
    fn test_validate_rating() {
        let mut review = input("Nice");
        review.rating = None;
        assert!(validate(&review).is_ok());
        review.rating = Some(0);
        assert!(validate(&review).is_err());
        review.rating = Some(6);
        assert!(validate(&review).is_err());
    }

    #[test]
    fn test_validate_image_count() {
        let mut review = input("Nice");
        review.image_urls = vec!["https://cdn.example/x.jpg".to_string(); MAX_IMAGES + 1];
        assert!(validate(&review).is_err());
        review.image_urls.truncate(MAX_IMAGES);
        assert!(validate(&review).is_ok());
    }
}
