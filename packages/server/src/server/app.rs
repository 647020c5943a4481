//! Application setup and server configuration.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::Extension,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware,
    routing::{get, post},
    Router,
};
use product_extraction::{IdentityResolver, ProductExtractor};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::middleware::request_deadline;
use crate::server::routes::{extract_handler, health_handler};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub extractor: Arc<ProductExtractor>,
    pub identity: Arc<dyn IdentityResolver>,
}

impl AppState {
    pub fn new(extractor: Arc<ProductExtractor>, identity: Arc<dyn IdentityResolver>) -> Self {
        Self {
            extractor,
            identity,
        }
    }
}

/// Build the CORS layer. No configured origins means any origin.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}

/// Build the Axum application router
pub fn build_app(
    state: AppState,
    allowed_origins: &[String],
    request_timeout: Duration,
) -> Router {
    Router::new()
        .route("/api/products/extract", post(extract_handler))
        .route("/health", get(health_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(Extension(state))
        .layer(middleware::from_fn(move |req, next| {
            request_deadline(request_timeout, req, next)
        }))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
}
