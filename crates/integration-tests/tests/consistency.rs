//! Consistency rules enforced by the services against a real database.
//!
//! Every test creates its own users, products and coupons with random
//! identifiers, so the suite can share one database and run in parallel.

#![allow(clippy::unwrap_used)]

use chrono::{Duration, Utc};
use secrecy::SecretString;
use sqlx::PgPool;

use clayhouse_core::{
    AddressId, AuthProvider, CategoryId, DiscountType, Email, OptionId, ProductId, ShippingPolicy,
    UserId, Won,
};
use clayhouse_integration_tests::{TEST_JWT_SECRET, database_pool};
use clayhouse_storefront::cache::CatalogCache;
use clayhouse_storefront::config::JwtConfig;
use clayhouse_storefront::db::cart::MAX_LINE_QUANTITY;
use clayhouse_storefront::db::{CartRepository, UserRepository};
use clayhouse_storefront::models::address::{AddressInput, AddressPatch};
use clayhouse_storefront::models::cart::AddToCart;
use clayhouse_storefront::models::coupon::CouponInput;
use clayhouse_storefront::models::order::PlaceOrder;
use clayhouse_storefront::models::product::{ImageInput, OptionInput, ProductInput, ProductPatch};
use clayhouse_storefront::services::ShopError;
use clayhouse_storefront::services::addresses::AddressService;
use clayhouse_storefront::services::auth::{AuthError, AuthService, RegisterInput, TokenKeys};
use clayhouse_storefront::services::cart::CartService;
use clayhouse_storefront::services::catalog::CatalogService;
use clayhouse_storefront::services::checkout::CheckoutService;
use clayhouse_storefront::services::coupons::CouponService;

// ============================================================================
// Fixtures
// ============================================================================

async fn insert_user(pool: &PgPool) -> UserId {
    sqlx::query_scalar::<_, UserId>("INSERT INTO users (email) VALUES ($1) RETURNING id")
        .bind(format!("{}@clayhouse.test", UserId::new()))
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn test_category(pool: &PgPool) -> CategoryId {
    sqlx::query_scalar::<_, CategoryId>(
        r"
        INSERT INTO product_categories (slug, name, sort_order)
        VALUES ('test-wares', 'Test wares', 99)
        ON CONFLICT (slug) DO UPDATE SET slug = EXCLUDED.slug
        RETURNING id
        ",
    )
    .fetch_one(pool)
    .await
    .unwrap()
}

fn image(url: &str) -> ImageInput {
    ImageInput {
        url: url.to_string(),
        alt: None,
        sort_order: 0,
    }
}

/// A product with one gallery image, two glaze options and a detail image.
async fn insert_product(pool: &PgPool, price: i64) -> (ProductId, Vec<OptionId>) {
    let category_id = test_category(pool).await;
    let input = ProductInput {
        category_id,
        slug: format!("test-{}", ProductId::new()),
        name: "Test bowl".to_string(),
        description: None,
        price: Won::new(price),
        is_active: true,
        purchase_notice: None,
        handling_notice: None,
        images: vec![image("https://cdn.clayhouse.test/bowl.jpg")],
        options: vec![
            OptionInput {
                name: "glaze".to_string(),
                value: "celadon".to_string(),
                sort_order: 0,
            },
            OptionInput {
                name: "glaze".to_string(),
                value: "tenmoku".to_string(),
                sort_order: 1,
            },
        ],
        detail_images: vec![image("https://cdn.clayhouse.test/bowl-detail.jpg")],
    };
    let cache = CatalogCache::new();
    let detail = CatalogService::new(pool, &cache)
        .create_product(&input)
        .await
        .unwrap();
    let options = detail.options.iter().map(|o| o.id).collect();
    (detail.product.id, options)
}

fn add(product_id: ProductId, quantity: i32, option_id: Option<OptionId>) -> AddToCart {
    AddToCart {
        product_id,
        quantity,
        option_id,
    }
}

fn address(label: &str, is_default: bool) -> AddressInput {
    AddressInput {
        label: label.to_string(),
        address_line1: format!("{label} street 1"),
        is_default,
        ..AddressInput::default()
    }
}

async fn count_for_product(pool: &PgPool, table: &str, product_id: ProductId) -> i64 {
    let sql = format!("SELECT count(*) FROM {table} WHERE product_id = $1");
    sqlx::query_scalar::<_, i64>(&sql)
        .bind(product_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn defaults_for(pool: &PgPool, user_id: UserId) -> Vec<AddressId> {
    AddressService::new(pool)
        .list(user_id)
        .await
        .unwrap()
        .into_iter()
        .filter(|a| a.is_default)
        .map(|a| a.id)
        .collect()
}

// ============================================================================
// Cart Tests
// ============================================================================

#[tokio::test]
#[ignore = "Requires database"]
async fn test_cart_lines_merge_including_no_option() {
    let pool = database_pool().await;
    let user = insert_user(&pool).await;
    let (product, options) = insert_product(&pool, 12_000).await;
    let cart = CartService::new(&pool);

    let first = cart.add(user, &add(product, 2, None)).await.unwrap();
    let merged = cart.add(user, &add(product, 3, None)).await.unwrap();
    assert_eq!(merged.id, first.id);
    assert_eq!(merged.quantity, 5);

    let glazed = cart.add(user, &add(product, 1, Some(options[0]))).await.unwrap();
    assert_ne!(glazed.id, first.id);
    let glazed_again = cart.add(user, &add(product, 1, Some(options[0]))).await.unwrap();
    assert_eq!(glazed_again.id, glazed.id);
    assert_eq!(glazed_again.quantity, 2);

    assert_eq!(cart.lines(user).await.unwrap().len(), 2);
}

#[tokio::test]
#[ignore = "Requires database"]
async fn test_cart_merge_above_limit_leaves_line_unchanged() {
    let pool = database_pool().await;
    let user = insert_user(&pool).await;
    let (product, _) = insert_product(&pool, 12_000).await;
    let repo = CartRepository::new(&pool);

    let line = repo.merge(user, product, None, 5).await.unwrap().unwrap();
    let over = repo
        .merge(user, product, None, MAX_LINE_QUANTITY - 4)
        .await
        .unwrap();
    assert!(over.is_none());

    let at_cap = repo
        .merge(user, product, None, MAX_LINE_QUANTITY - 5)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(at_cap.id, line.id);
    assert_eq!(at_cap.quantity, MAX_LINE_QUANTITY);

    let result = CartService::new(&pool).add(user, &add(product, 1, None)).await;
    assert!(matches!(result, Err(ShopError::BadRequest(_))));
}

// ============================================================================
// Address Tests
// ============================================================================

#[tokio::test]
#[ignore = "Requires database"]
async fn test_single_default_address() {
    let pool = database_pool().await;
    let user = insert_user(&pool).await;
    let service = AddressService::new(&pool);

    let home = service.create(user, &address("home", false)).await.unwrap();
    assert!(home.is_default, "first address becomes the default");

    let studio = service.create(user, &address("studio", true)).await.unwrap();
    assert!(studio.is_default);
    assert_eq!(defaults_for(&pool, user).await, vec![studio.id]);

    let kiln = service.create(user, &address("kiln", false)).await.unwrap();
    assert!(!kiln.is_default);

    let home = service
        .update(
            user,
            home.id,
            &AddressPatch {
                is_default: Some(true),
                ..AddressPatch::default()
            },
        )
        .await
        .unwrap();
    assert!(home.is_default);
    assert_eq!(defaults_for(&pool, user).await, vec![home.id]);

    let unset = service
        .update(
            user,
            home.id,
            &AddressPatch {
                is_default: Some(false),
                ..AddressPatch::default()
            },
        )
        .await
        .unwrap();
    assert!(unset.is_default, "the default cannot be unset directly");

    service.delete(user, home.id).await.unwrap();
    assert_eq!(
        defaults_for(&pool, user).await,
        vec![kiln.id],
        "the newest remaining address is promoted"
    );
}

#[tokio::test]
#[ignore = "Requires database"]
async fn test_concurrent_first_addresses_both_succeed() {
    let pool = database_pool().await;

    for _ in 0..10 {
        let user = insert_user(&pool).await;
        let service = AddressService::new(&pool);

        let home = address("home", false);
        let studio = address("studio", false);
        let (first, second) = tokio::join!(
            service.create(user, &home),
            service.create(user, &studio),
        );
        let (first, second) = (first.unwrap(), second.unwrap());

        assert!(first.is_default ^ second.is_default);
        assert_eq!(defaults_for(&pool, user).await.len(), 1);
    }
}

// ============================================================================
// Catalog Tests
// ============================================================================

#[tokio::test]
#[ignore = "Requires database"]
async fn test_delete_product_removes_children_and_cart_rows() {
    let pool = database_pool().await;
    let user = insert_user(&pool).await;
    let (product, options) = insert_product(&pool, 18_000).await;
    let cart = CartService::new(&pool);
    cart.add(user, &add(product, 1, None)).await.unwrap();
    cart.add(user, &add(product, 2, Some(options[1]))).await.unwrap();

    let cache = CatalogCache::new();
    let catalog = CatalogService::new(&pool, &cache);
    catalog.delete_product(product).await.unwrap();

    for table in [
        "product_images",
        "product_options",
        "product_detail_images",
        "cart_items",
    ] {
        assert_eq!(count_for_product(&pool, table, product).await, 0, "{table}");
    }
    assert!(cart.lines(user).await.unwrap().is_empty());
    assert!(matches!(
        catalog.product(product).await,
        Err(ShopError::NotFound(_))
    ));
}

#[tokio::test]
#[ignore = "Requires database"]
async fn test_delete_ordered_product_conflicts() {
    let pool = database_pool().await;
    let user = insert_user(&pool).await;
    let (product, _) = insert_product(&pool, 18_000).await;
    CartService::new(&pool)
        .add(user, &add(product, 1, None))
        .await
        .unwrap();
    CheckoutService::new(&pool, ShippingPolicy::default())
        .place_order(user, &PlaceOrder::default())
        .await
        .unwrap();

    let cache = CatalogCache::new();
    let result = CatalogService::new(&pool, &cache).delete_product(product).await;

    assert!(matches!(result, Err(ShopError::Conflict(_))));
    assert_eq!(count_for_product(&pool, "product_options", product).await, 2);
    assert_eq!(count_for_product(&pool, "product_images", product).await, 1);
}

// ============================================================================
// Lock Ordering Tests
// ============================================================================

/// Checkout racing an admin write on the same product must never deadlock.
/// The loser sees a conflict or an empty cart, not a database error.
fn assert_not_database_error(result: &Result<impl std::fmt::Debug, ShopError>) {
    assert!(
        !matches!(result, Err(ShopError::Repository(_))),
        "unexpected database error: {result:?}"
    );
}

#[tokio::test]
#[ignore = "Requires database"]
async fn test_checkout_racing_product_delete() {
    let pool = database_pool().await;
    let user = insert_user(&pool).await;
    let cache = CatalogCache::new();
    let catalog = CatalogService::new(&pool, &cache);
    let checkout = CheckoutService::new(&pool, ShippingPolicy::default());

    for _ in 0..20 {
        let (product, options) = insert_product(&pool, 9_000).await;
        let cart = CartService::new(&pool);
        cart.add(user, &add(product, 1, None)).await.unwrap();
        cart.add(user, &add(product, 1, Some(options[0]))).await.unwrap();

        let place = PlaceOrder::default();
        let (placed, deleted) = tokio::join!(
            checkout.place_order(user, &place),
            catalog.delete_product(product),
        );

        assert_not_database_error(&placed);
        assert_not_database_error(&deleted);
        match (&placed, &deleted) {
            (Ok(_), Err(ShopError::Conflict(_))) | (Err(ShopError::BadRequest(_)), Ok(())) => {}
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}

#[tokio::test]
#[ignore = "Requires database"]
async fn test_checkout_racing_option_replacement() {
    let pool = database_pool().await;
    let user = insert_user(&pool).await;
    let cache = CatalogCache::new();
    let catalog = CatalogService::new(&pool, &cache);
    let checkout = CheckoutService::new(&pool, ShippingPolicy::default());
    let patch = ProductPatch {
        options: Some(vec![OptionInput {
            name: "glaze".to_string(),
            value: "ash".to_string(),
            sort_order: 0,
        }]),
        ..ProductPatch::default()
    };

    for _ in 0..20 {
        let (product, options) = insert_product(&pool, 9_000).await;
        CartService::new(&pool)
            .add(user, &add(product, 1, Some(options[0])))
            .await
            .unwrap();

        let place = PlaceOrder::default();
        let (placed, updated) = tokio::join!(
            checkout.place_order(user, &place),
            catalog.update_product(product, &patch),
        );

        assert_not_database_error(&placed);
        assert!(updated.is_ok(), "option replacement failed: {updated:?}");
        // Leave the cart empty for the next round.
        if placed.is_err() {
            assert!(CartService::new(&pool).lines(user).await.unwrap().is_empty());
        }
    }
}

// ============================================================================
// Account Tests
// ============================================================================

#[tokio::test]
#[ignore = "Requires database"]
async fn test_email_unique_per_provider_ignoring_case() {
    let pool = database_pool().await;
    let keys = TokenKeys::new(&JwtConfig {
        secret: SecretString::from(TEST_JWT_SECRET),
        ttl: std::time::Duration::from_secs(3600),
    });
    let auth = AuthService::new(&pool, &keys);
    let local = format!("potter-{}", UserId::new());
    let register = |email: String| RegisterInput {
        email,
        password: "wheel-thrown-42".to_string(),
        full_name: None,
        phone: None,
    };

    let session = auth
        .register(&register(format!("{local}@Clayhouse.test")))
        .await
        .unwrap();
    let duplicate = auth
        .register(&register(format!("{}@clayhouse.TEST", local.to_uppercase())))
        .await;
    assert!(matches!(duplicate, Err(AuthError::UserAlreadyExists)));

    sqlx::query("INSERT INTO users (email, provider, provider_id) VALUES ($1, 'kakao', $2)")
        .bind(format!("{local}@clayhouse.test"))
        .bind(local.clone())
        .execute(&pool)
        .await
        .unwrap();

    let email = Email::parse(&format!("{local}@clayhouse.test")).unwrap();
    let found = UserRepository::new(&pool)
        .get_by_email(AuthProvider::Email, &email)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, session.user.id);
}

// ============================================================================
// Checkout Tests
// ============================================================================

#[tokio::test]
#[ignore = "Requires database"]
async fn test_checkout_totals_and_coupon_redemption() {
    let pool = database_pool().await;
    let user = insert_user(&pool).await;
    let (product, options) = insert_product(&pool, 20_000).await;
    CartService::new(&pool)
        .add(user, &add(product, 2, Some(options[0])))
        .await
        .unwrap();

    let coupons = CouponService::new(&pool);
    let now = Utc::now();
    let coupon = coupons
        .create(&CouponInput {
            code: format!("T{}", UserId::new().as_uuid().simple()),
            discount_type: DiscountType::Fixed,
            discount_value: 5_000,
            min_order_amount: Some(Won::new(10_000)),
            valid_from: now - Duration::hours(1),
            valid_until: now + Duration::days(7),
            usage_limit: Some(10),
            is_active: true,
        })
        .await
        .unwrap();
    let grant = coupons.issue(coupon.id, user).await.unwrap();

    let placed = CheckoutService::new(&pool, ShippingPolicy::default())
        .place_order(
            user,
            &PlaceOrder {
                shipping_address_id: None,
                coupon_code: Some(format!(" {} ", coupon.code.to_lowercase())),
            },
        )
        .await
        .unwrap();
    let order = &placed.order;

    assert_eq!(order.subtotal, Won::new(40_000));
    assert_eq!(order.shipping_fee, Won::new(3_000));
    assert_eq!(order.discount_amount, Won::new(5_000));
    assert_eq!(order.total, Won::new(38_000));
    assert_eq!(order.coupon_id, Some(coupon.id));
    assert_eq!(placed.order_items.len(), 1);
    assert_eq!(
        placed.order_items[0].option_label.as_deref(),
        Some("glaze: celadon")
    );

    let wallet = coupons.mine(user).await.unwrap();
    let redeemed = wallet.iter().find(|v| v.grant.id == grant.id).unwrap();
    assert_eq!(redeemed.coupon.used_count, 1);
    assert!(redeemed.grant.used_at.is_some());
    assert_eq!(redeemed.grant.order_id, Some(order.id));

    assert!(
        CartService::new(&pool).lines(user).await.unwrap().is_empty(),
        "checkout clears the cart"
    );
}
