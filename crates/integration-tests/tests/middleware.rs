//! Health checks and the middleware stack.

#![allow(clippy::unwrap_used)]

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};

use clayhouse_integration_tests::{TEST_ORIGIN, TestApp, request};

#[tokio::test]
async fn test_liveness() {
    let app = TestApp::new();
    let response = app.send(request("GET", "/health", None, None)).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "ok");
}

#[tokio::test]
async fn test_readiness_reports_unreachable_database() {
    let app = TestApp::new();
    let response = app.send(request("GET", "/health/ready", None, None)).await;

    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_security_headers_present() {
    let app = TestApp::new();
    let response = app.send(request("GET", "/health", None, None)).await;

    let headers = &response.headers;
    assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
    assert_eq!(headers[header::CACHE_CONTROL], "no-store");
    assert!(headers.contains_key(header::CONTENT_SECURITY_POLICY));
}

#[tokio::test]
async fn test_request_id_generated_and_echoed() {
    let app = TestApp::new();

    let generated = app.send(request("GET", "/health", None, None)).await;
    assert!(generated.headers.contains_key("x-request-id"));

    let upstream = Request::get("/health")
        .header("x-request-id", "edge-7f3a")
        .body(Body::empty())
        .unwrap();
    let echoed = app.send(upstream).await;
    assert_eq!(echoed.headers["x-request-id"], "edge-7f3a");
}

#[tokio::test]
async fn test_request_id_on_error_responses() {
    let app = TestApp::new();
    let response = app.send(request("GET", "/auth/me", None, None)).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(response.headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_cors_preflight_for_frontend_origin() {
    let app = TestApp::new();
    let preflight = Request::builder()
        .method("OPTIONS")
        .uri("/shop/cart")
        .header(header::ORIGIN, TEST_ORIGIN)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization,content-type")
        .body(Body::empty())
        .unwrap();
    let response = app.send(preflight).await;

    assert_eq!(
        response.headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        TEST_ORIGIN
    );
}

#[tokio::test]
async fn test_cors_ignores_other_origins() {
    let app = TestApp::new();
    let response = app
        .send(
            Request::get("/health")
                .header(header::ORIGIN, "https://evil.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert!(
        !response
            .headers
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
    );
}

#[tokio::test]
async fn test_unknown_route_uses_error_body() {
    let app = TestApp::new();
    let response = app.send(request("GET", "/shop/nowhere", None, None)).await;

    response.assert_error(StatusCode::NOT_FOUND);
    assert_eq!(response.body["message"], "route not found");
}

#[tokio::test]
async fn test_database_failure_hides_details() {
    let app = TestApp::new();
    let response = app.send(request("GET", "/shop/categories", None, None)).await;

    response.assert_error(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["message"], "Internal server error");
}
