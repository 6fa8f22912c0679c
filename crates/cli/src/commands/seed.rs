//! Seed the catalog with starter data.
//!
//! Inserts the starter categories and one example product with gallery and
//! detail images. Running it again is harmless: existing categories are left
//! alone and an existing product slug is skipped.
//!
//! With `--reviewer-password`, a reviewer account is created (or reused) and
//! leaves one photo review on a freshly seeded product.

use clayhouse_core::{AuthProvider, CategoryId, Email, UserId, Won};
use clayhouse_storefront::cache::CatalogCache;
use clayhouse_storefront::db::{RepositoryError, users::UserRepository};
use clayhouse_storefront::models::product::{ImageInput, OptionInput, ProductInput};
use clayhouse_storefront::models::review::ReviewInput;
use clayhouse_storefront::services::ShopError;
use clayhouse_storefront::services::auth::{AuthError, hash_new_password};
use clayhouse_storefront::services::catalog::CatalogService;
use clayhouse_storefront::services::reviews::ReviewService;
use sqlx::PgPool;
use thiserror::Error;

use super::{CommandError, connect};

const CATEGORIES: &[(&str, &str, i32)] = &[
    ("all", "All", 0),
    ("vases", "Vases", 1),
    ("tableware", "Tableware", 2),
    ("objects", "Objects", 3),
];

const REVIEWER_EMAIL: &str = "reviewer@clayhouse.kr";

const PURCHASE_NOTICE: &str = "Every piece is thrown by hand, so no two are exactly alike.\n\
    This item cannot be refunded. Defective pieces can be exchanged within 7 days.";

const HANDLING_NOTICE: &str = "Shape and glaze may differ slightly from the photos.\n\
    Avoid sudden temperature changes and hard knocks; both can crack the body.\n\
    Wash with a soft sponge to avoid scratching the glaze.\n\
    Glazed surfaces can still stain over time.";

#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Shop error: {0}")]
    Shop(#[from] ShopError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),
}

/// Seed starter data.
pub async fn run(reviewer_password: Option<&str>) -> Result<(), SeedError> {
    let pool = connect().await?;

    let all = seed_categories(&pool).await?;
    tracing::info!(count = CATEGORIES.len(), "Categories ready");

    let cache = CatalogCache::new();
    let catalog = CatalogService::new(&pool, &cache);
    let product = match catalog.create_product(&example_product(all)).await {
        Ok(product) => {
            tracing::info!(product_id = %product.product.id, "Example product created");
            Some(product)
        }
        Err(ShopError::Conflict(_)) => {
            tracing::info!("Example product already exists, skipping");
            None
        }
        Err(e) => return Err(e.into()),
    };

    if let (Some(password), Some(product)) = (reviewer_password, product) {
        let reviewer = ensure_reviewer(&pool, password).await?;
        let review = ReviewInput {
            body: "Even lovelier in person, and the glaze is beautifully even. \
                   Would buy again as a gift."
                .to_string(),
            rating: Some(5),
            image_urls: vec!["https://picsum.photos/400/400?random=5".to_string()],
        };
        ReviewService::new(&pool, &cache)
            .create(reviewer, product.product.id, &review)
            .await?;
        tracing::info!(email = REVIEWER_EMAIL, "Example review created");
    }

    tracing::info!("Seeding complete!");
    Ok(())
}

/// Upsert the starter categories and return the id of the catch-all one.
async fn seed_categories(pool: &PgPool) -> Result<CategoryId, RepositoryError> {
    let mut all = None;
    for &(slug, name, sort_order) in CATEGORIES {
        let id = sqlx::query_scalar::<_, CategoryId>(
            r"
            INSERT INTO product_categories (slug, name, sort_order)
            VALUES ($1, $2, $3)
            ON CONFLICT (slug) DO UPDATE SET slug = EXCLUDED.slug
            RETURNING id
            ",
        )
        .bind(slug)
        .bind(name)
        .bind(sort_order)
        .fetch_one(pool)
        .await?;

        if slug == "all" {
            all = Some(id);
        }
    }
    all.ok_or_else(|| RepositoryError::DataCorruption("catch-all category missing".to_string()))
}

fn example_product(category_id: CategoryId) -> ProductInput {
    let image = |url: &str, alt: &str, sort_order: i32| ImageInput {
        url: url.to_string(),
        alt: Some(alt.to_string()),
        sort_order,
    };

    ProductInput {
        category_id,
        slug: "example-handcrafted-vase".to_string(),
        name: "Example Handcrafted Vase".to_string(),
        description: Some("A hand-thrown stoneware vase in a celadon glaze.".to_string()),
        price: Won::new(45_000),
        is_active: true,
        purchase_notice: Some(PURCHASE_NOTICE.to_string()),
        handling_notice: Some(HANDLING_NOTICE.to_string()),
        images: vec![
            image("https://picsum.photos/800/800?random=1", "Vase front", 1),
            image("https://picsum.photos/800/800?random=2", "Vase side", 2),
        ],
        options: vec![
            OptionInput {
                name: "Size".to_string(),
                value: "Small".to_string(),
                sort_order: 1,
            },
            OptionInput {
                name: "Size".to_string(),
                value: "Large".to_string(),
                sort_order: 2,
            },
        ],
        detail_images: vec![
            image("https://picsum.photos/1200/800?random=3", "Detail 1", 1),
            image("https://picsum.photos/1200/600?random=4", "Detail 2", 2),
        ],
    }
}

async fn ensure_reviewer(pool: &PgPool, password: &str) -> Result<UserId, SeedError> {
    let email = Email::parse(REVIEWER_EMAIL).map_err(AuthError::from)?;
    let users = UserRepository::new(pool);

    if let Some(user) = users.get_by_email(AuthProvider::Email, &email).await? {
        return Ok(user.id);
    }

    let hash = hash_new_password(password)?;
    let user = users
        .create_with_password(&email, &hash, Some("Example Reviewer"), None)
        .await?;
    Ok(user.id)
}
