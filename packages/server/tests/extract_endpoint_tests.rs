use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use async_trait::async_trait;
use product_extraction::testing::MockFetcher;
use product_extraction::{IdentityResolver, Principal, ProductExtractor, UrlValidator};
use serde_json::{json, Value};
use server_core::auth::{JwtIdentityResolver, JwtService};
use server_core::server::{build_app, AppState};
use tower::ServiceExt;

const PRODUCT_URL: &str = "https://shop.example.com/product/1";

struct TestApp {
    router: Router,
    fetcher: MockFetcher,
    jwt: Arc<JwtService>,
}

fn test_app() -> TestApp {
    let fetcher = MockFetcher::new().with_page(
        PRODUCT_URL,
        r#"<html><head>
            <script type="application/ld+json">
            {"@type": "Product", "name": "Wireless Mouse",
             "image": "/img/m.jpg", "offers": {"price": "1999"}}
            </script>
        </head></html>"#,
    );
    let extractor = ProductExtractor::new(UrlValidator::new(), Arc::new(fetcher.clone()));

    let jwt = Arc::new(JwtService::new("test_secret", "test_issuer".to_string()));
    let identity = JwtIdentityResolver::new(jwt.clone(), vec!["listed@example.com".to_string()]);

    let state = AppState::new(Arc::new(extractor), Arc::new(identity));
    TestApp {
        router: build_app(state, &[], Duration::from_secs(30)),
        fetcher,
        jwt,
    }
}

fn extract_request(token: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/products/extract")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_admin_extracts_product() {
    let app = test_app();
    let token = app.jwt.create_token("ops@example.com", true).unwrap();
    let body = json!({ "url": PRODUCT_URL }).to_string();

    let (status, json) = send(app.router, extract_request(Some(&token), &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["sourceUrl"], PRODUCT_URL);
    assert_eq!(json["product"]["name"], "Wireless Mouse");
    assert_eq!(json["product"]["price"], 1999.0);
    assert_eq!(
        json["product"]["imageUrl"],
        "https://shop.example.com/img/m.jpg"
    );
}

#[tokio::test]
async fn test_listed_admin_identifier_is_accepted() {
    let app = test_app();
    let token = app.jwt.create_token("listed@example.com", false).unwrap();
    let body = json!({ "url": PRODUCT_URL }).to_string();

    let (status, _) = send(app.router, extract_request(Some(&token), &body)).await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_missing_token_is_401() {
    let app = test_app();
    let body = json!({ "url": PRODUCT_URL }).to_string();

    let (status, json) = send(app.router, extract_request(None, &body)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["success"], false);
    assert!(json.get("partial").is_none());
    assert_eq!(app.fetcher.fetch_call_count(), 0);
}

#[tokio::test]
async fn test_forged_token_is_401() {
    let app = test_app();
    let other = JwtService::new("other_secret", "test_issuer".to_string());
    let token = other.create_token("ops@example.com", true).unwrap();
    let body = json!({ "url": PRODUCT_URL }).to_string();

    let (status, _) = send(app.router, extract_request(Some(&token), &body)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.fetcher.fetch_call_count(), 0);
}

#[tokio::test]
async fn test_non_admin_is_403() {
    let app = test_app();
    let token = app.jwt.create_token("shopper@example.com", false).unwrap();
    let body = json!({ "url": PRODUCT_URL }).to_string();

    let (status, json) = send(app.router, extract_request(Some(&token), &body)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["success"], false);
    assert_eq!(app.fetcher.fetch_call_count(), 0);
}

#[tokio::test]
async fn test_auth_runs_before_body_is_inspected() {
    let app = test_app();

    let (status, _) = send(app.router, extract_request(None, "not json")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_body_is_400() {
    let app = test_app();
    let token = app.jwt.create_token("ops@example.com", true).unwrap();

    let (status, json) = send(app.router, extract_request(Some(&token), r#"{"link": 1}"#)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(app.fetcher.fetch_call_count(), 0);
}

#[tokio::test]
async fn test_metadata_url_is_400_without_fetch() {
    let app = test_app();
    let token = app.jwt.create_token("ops@example.com", true).unwrap();
    let body = json!({ "url": "http://169.254.169.254/latest/meta-data/" }).to_string();

    let (status, json) = send(app.router, extract_request(Some(&token), &body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("invalid URL"));
    assert_eq!(app.fetcher.fetch_call_count(), 0);
}

#[tokio::test]
async fn test_incomplete_extraction_returns_partial() {
    let fetcher = MockFetcher::new().with_page(
        PRODUCT_URL,
        r#"<html><body><span data-price="350"></span></body></html>"#,
    );
    let extractor = ProductExtractor::new(UrlValidator::new(), Arc::new(fetcher));
    let jwt = Arc::new(JwtService::new("test_secret", "test_issuer".to_string()));
    let identity = JwtIdentityResolver::new(jwt.clone(), vec![]);
    let router = build_app(
        AppState::new(Arc::new(extractor), Arc::new(identity)),
        &[],
        Duration::from_secs(30),
    );
    let token = jwt.create_token("ops@example.com", true).unwrap();
    let body = json!({ "url": PRODUCT_URL }).to_string();

    let (status, json) = send(router, extract_request(Some(&token), &body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(json["partial"]["price"], 350.0);
}

#[tokio::test]
async fn test_health() {
    let app = test_app();
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let (status, json) = send(app.router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["model_configured"], false);
}

/// Resolver that stalls long enough to trip the request deadline.
struct StalledResolver;

#[async_trait]
impl IdentityResolver for StalledResolver {
    async fn resolve_principal(&self, _credential: &str) -> Option<Principal> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        None
    }

    async fn has_admin_role(&self, _principal: &Principal) -> bool {
        false
    }
}

#[tokio::test]
async fn test_request_timeout_uses_failure_body() {
    let fetcher = MockFetcher::new();
    let extractor = ProductExtractor::new(UrlValidator::new(), Arc::new(fetcher.clone()));
    let router = build_app(
        AppState::new(Arc::new(extractor), Arc::new(StalledResolver)),
        &[],
        Duration::from_millis(100),
    );
    let body = json!({ "url": PRODUCT_URL }).to_string();

    let (status, json) = send(router, extract_request(Some("anything"), &body)).await;

    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("timed out"));
    assert!(json.get("partial").is_none());
    assert_eq!(fetcher.fetch_call_count(), 0);
}
