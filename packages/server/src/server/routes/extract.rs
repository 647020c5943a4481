use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use product_extraction::{authorize, ExtractedProduct, ExtractionRequest, PipelineError};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::server::app::AppState;

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractSuccess {
    success: bool,
    product: ExtractedProduct,
    source_url: String,
}

#[derive(Debug, Serialize)]
pub struct ExtractFailure {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    partial: Option<ExtractedProduct>,
}

pub(crate) fn failure(
    status: StatusCode,
    error: String,
    partial: Option<ExtractedProduct>,
) -> Response {
    (
        status,
        Json(ExtractFailure {
            success: false,
            error,
            partial,
        }),
    )
        .into_response()
}

fn pipeline_failure(err: PipelineError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        error!(error = %err, "Extraction failed unexpectedly");
    }
    failure(status, err.to_string(), err.partial().cloned())
}

/// Extract a product from a page URL
///
/// The caller is authorized before the request body is looked at.
pub async fn extract_handler(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ExtractRequest>, JsonRejection>,
) -> Response {
    let credential = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let caller = match authorize(state.identity.as_ref(), credential).await {
        Ok(caller) => caller,
        Err(e) => return pipeline_failure(e),
    };

    let Json(body) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return failure(StatusCode::BAD_REQUEST, rejection.body_text(), None);
        }
    };

    info!(caller = %caller.subject(), url = %body.url, "Extraction requested");

    match state
        .extractor
        .extract(&ExtractionRequest::new(body.url, caller))
        .await
    {
        Ok(outcome) => (
            StatusCode::OK,
            Json(ExtractSuccess {
                success: true,
                product: outcome.product,
                source_url: outcome.source_url,
            }),
        )
            .into_response(),
        Err(e) => pipeline_failure(e),
    }
}
