//! Bearer authentication, admin authorization, and the credential endpoints.

#![allow(clippy::unwrap_used)]

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::Utc;
use serde_json::json;

use clayhouse_core::{UserId, UserRole};
use clayhouse_integration_tests::{TestApp, request};
use clayhouse_storefront::services::auth::Claims;

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = TestApp::new();
    let response = app.send(request("GET", "/auth/me", None, None)).await;

    response.assert_error(StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["message"], "missing access token");
}

#[tokio::test]
async fn test_non_bearer_scheme_is_unauthorized() {
    let app = TestApp::new();
    let response = app
        .send(
            Request::get("/shop/cart")
                .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    response.assert_error(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_garbage_token_is_unauthorized() {
    let app = TestApp::new();
    let response = app
        .send(request("GET", "/shop/orders", Some("not.a.jwt"), None))
        .await;

    response.assert_error(StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["message"], "invalid token");
}

#[tokio::test]
async fn test_expired_token_is_unauthorized() {
    let app = TestApp::new();
    let issued = Utc::now().timestamp() - 7200;
    let token = app.sign(&Claims {
        sub: UserId::new(),
        email: "potter@clayhouse.kr".to_string(),
        role: UserRole::Member,
        iat: issued,
        exp: issued + 3600,
    });

    let response = app
        .send(request("GET", "/shop/my-coupons", Some(&token), None))
        .await;

    response.assert_error(StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["message"], "token expired");
}

#[tokio::test]
async fn test_token_from_another_secret_is_unauthorized() {
    let app = TestApp::new();
    // Admin claims signed with HS256 and the key "some-other-secret".
    let forged = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.\
        eyJzdWIiOiIwMDAwMDAwMC0wMDAwLTQwMDAtODAwMC0wMDAwMDAwMDAwMDEiLCJlbWFpbCI6ImFAYi5rciIsInJvbGUiOiJhZG1pbiIsImlhdCI6MCwiZXhwIjo0MTAyNDQ0ODAwfQ.\
        A1asDz9-szqOs5FtbqY2Dhp4ca9PrQphGUVg3eGRcIU";

    let response = app
        .send(request("GET", "/shop/admin/orders", Some(forged), None))
        .await;

    response.assert_error(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_member_token_is_forbidden_on_admin_routes() {
    let app = TestApp::new();
    let token = app.token(UserRole::Member);

    let cases = [
        ("GET", "/shop/admin/orders"),
        ("POST", "/shop/admin/products"),
        ("POST", "/shop/admin/coupons"),
    ];
    for (method, uri) in cases {
        let response = app
            .send(request(method, uri, Some(&token), Some(&json!({}))))
            .await;
        response.assert_error(StatusCode::FORBIDDEN);
    }
}

#[tokio::test]
async fn test_admin_routes_require_token_before_body() {
    let app = TestApp::new();
    let response = app
        .send(request("POST", "/shop/admin/products", None, Some(&json!({}))))
        .await;

    response.assert_error(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_rejects_invalid_email() {
    let app = TestApp::new();
    let body = json!({ "email": "not-an-email", "password": "longenough1" });
    let response = app
        .send(request("POST", "/auth/register", None, Some(&body)))
        .await;

    response.assert_error(StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "Invalid email address");
}

#[tokio::test]
async fn test_register_rejects_short_password() {
    let app = TestApp::new();
    let body = json!({ "email": "potter@clayhouse.kr", "password": "short" });
    let response = app
        .send(request("POST", "/auth/register", None, Some(&body)))
        .await;

    response.assert_error(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_rejects_malformed_json() {
    let app = TestApp::new();
    let response = app
        .send(
            Request::post("/auth/register")
                .header("x-forwarded-for", "203.0.113.20")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{\"email\":"))
                .unwrap(),
        )
        .await;

    response.assert_error(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_with_malformed_email_is_unauthorized() {
    let app = TestApp::new();
    let body = json!({ "email": "nobody", "password": "whatever1" });
    let response = app
        .send(request("POST", "/auth/login", None, Some(&body)))
        .await;

    response.assert_error(StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["message"], "Invalid credentials");
}

#[tokio::test]
async fn test_login_is_rate_limited_per_client() {
    let app = TestApp::new();
    let body = json!({ "email": "nobody", "password": "whatever1" });

    let login = || {
        Request::post("/auth/login")
            .header("cf-connecting-ip", "198.51.100.77")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    };

    for _ in 0..5 {
        let response = app.send(login()).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    }
    let limited = app.send(login()).await;
    assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);

    // A different client is unaffected.
    let other = app
        .send(
            Request::post("/auth/login")
                .header("cf-connecting-ip", "198.51.100.78")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await;
    assert_eq!(other.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_profile_routes_are_not_rate_limited() {
    let app = TestApp::new();
    for _ in 0..8 {
        let response = app.send(request("GET", "/auth/me", None, None)).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    }
}
