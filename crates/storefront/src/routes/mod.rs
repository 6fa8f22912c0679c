//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                         - Liveness
//! GET    /health/ready                   - Readiness (database ping)
//!
//! # Auth (register and login are rate limited)
//! POST   /auth/register                  - Create account, returns token
//! POST   /auth/login                     - Sign in, returns token
//! GET    /auth/me                        - Current profile
//! PATCH  /auth/me                        - Update profile or password
//! GET    /auth/addresses                 - Address book
//! POST   /auth/addresses                 - Add address
//! PATCH  /auth/addresses/{id}            - Edit address
//! DELETE /auth/addresses/{id}            - Remove address
//!
//! # Shop
//! GET    /shop/categories                - Categories by sort order
//! GET    /shop/products?categoryId=      - Active products
//! GET    /shop/products/{id}             - Product page
//! POST   /shop/products/{id}/reviews     - Write a review
//! GET    /shop/my-reviews                - Caller's reviews
//! GET    /shop/my-coupons                - Caller's coupons
//! GET    /shop/cart                      - Cart lines
//! POST   /shop/cart                      - Add to cart
//! PATCH  /shop/cart/{id}                 - Set line quantity
//! DELETE /shop/cart/{id}                 - Remove line
//! GET    /shop/orders                    - Caller's orders
//! POST   /shop/orders                    - Check out the cart
//! POST   /shop/orders/{id}/cancel        - Cancel an order
//!
//! # Admin (admin role required)
//! POST   /shop/admin/products            - Create product
//! PATCH  /shop/admin/products/{id}       - Update product
//! DELETE /shop/admin/products/{id}       - Delete product
//! GET    /shop/admin/orders?status=      - All orders
//! PATCH  /shop/admin/orders/{id}/status  - Move an order along
//! POST   /shop/admin/coupons             - Define a coupon
//! POST   /shop/admin/coupons/{id}/issue  - Grant a coupon to a user
//! ```

pub mod addresses;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod coupons;
pub mod extract;
pub mod health;
pub mod orders;
pub mod reviews;

use axum::{
    Router,
    body::Body,
    http::{HeaderValue, Method, Request, header},
    middleware,
    routing::{get, patch, post},
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::error::AppError;
use crate::middleware::{auth_rate_limiter, request_id_middleware, security_headers_middleware};
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    let credentials = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route_layer(auth_rate_limiter());

    Router::new()
        .merge(credentials)
        .route("/me", get(auth::me).patch(auth::update_me))
        .route("/addresses", get(addresses::list).post(addresses::create))
        .route(
            "/addresses/{id}",
            patch(addresses::update).delete(addresses::delete),
        )
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/products", post(admin::create_product))
        .route(
            "/products/{id}",
            patch(admin::update_product).delete(admin::delete_product),
        )
        .route("/orders", get(admin::list_orders))
        .route("/orders/{id}/status", patch(admin::update_order_status))
        .route("/coupons", post(admin::create_coupon))
        .route("/coupons/{id}/issue", post(admin::issue_coupon))
}

/// Create the shop routes router.
pub fn shop_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(catalog::categories))
        .route("/products", get(catalog::products))
        .route("/products/{id}", get(catalog::product))
        .route("/products/{id}/reviews", post(reviews::create))
        .route("/my-reviews", get(reviews::mine))
        .route("/my-coupons", get(coupons::mine))
        .route("/cart", get(cart::show).post(cart::add))
        .route("/cart/{id}", patch(cart::update).delete(cart::remove))
        .route("/orders", get(orders::list).post(orders::place))
        .route("/orders/{id}/cancel", post(orders::cancel))
        .nest("/admin", admin_routes())
}

/// CORS for the single configured frontend origin.
fn cors_layer(origin: &str) -> CorsLayer {
    let allow_origin = match origin.parse::<HeaderValue>() {
        Ok(value) => AllowOrigin::exact(value),
        Err(_) => {
            tracing::warn!(origin, "Invalid CORS origin, cross-origin requests disabled");
            AllowOrigin::list([])
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

async fn route_not_found() -> AppError {
    AppError::NotFound("route".to_string())
}

/// Build the full application router with its middleware stack.
///
/// Sentry layers are added by the binary, outside this stack.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config().cors_allowed_origin);

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/auth", auth_routes())
        .nest("/shop", shop_routes())
        .fallback(route_not_found)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(cors)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                    user_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}
