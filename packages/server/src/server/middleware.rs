//! Request deadline that answers in the same failure shape as the routes.

use std::time::Duration;

use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};
use tracing::warn;

use crate::server::routes::extract::failure;

/// Abort the inner handler once `timeout` elapses and reply 408.
pub async fn request_deadline(timeout: Duration, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();

    match tokio::time::timeout(timeout, next.run(req)).await {
        Ok(response) => response,
        Err(_) => {
            warn!(path = %path, timeout_ms = timeout.as_millis(), "Request timed out");
            failure(
                StatusCode::REQUEST_TIMEOUT,
                format!("request timed out after {}ms", timeout.as_millis()),
                None,
            )
        }
    }
}
