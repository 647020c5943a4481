use axum::{extract::Extension, Json};
use serde::Serialize;

use crate::server::app::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    model_configured: bool,
}

/// Health check endpoint
///
/// Reports whether the generative fallback is available. The service runs
/// either way, so this always returns 200.
pub async fn health_handler(Extension(state): Extension<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        model_configured: state.extractor.has_completion(),
    })
}
