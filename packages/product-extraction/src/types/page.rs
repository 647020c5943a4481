//! Page and request types.

use url::Url;

use crate::auth::AdminPrincipal;

/// A validated extraction request.
///
/// Holding an [`AdminPrincipal`] is the proof that the caller passed the
/// admin gate; there is no way to build one otherwise.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub target_url: String,
    pub caller: AdminPrincipal,
}

impl ExtractionRequest {
    pub fn new(target_url: impl Into<String>, caller: AdminPrincipal) -> Self {
        Self {
            target_url: target_url.into(),
            caller,
        }
    }
}

/// Raw page body as retrieved by a fetcher.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL after redirects. May differ from the requested URL.
    pub final_url: Url,

    /// Response body, decoded lossily as UTF-8.
    pub html: String,

    /// User agent of the attempt that succeeded.
    pub fetched_with_agent: String,
}

impl FetchedPage {
    pub fn new(final_url: Url, html: impl Into<String>) -> Self {
        Self {
            final_url,
            html: html.into(),
            fetched_with_agent: String::new(),
        }
    }

    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.fetched_with_agent = agent.into();
        self
    }
}

/// Successful pipeline output.
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    pub product: super::product::ExtractedProduct,
    pub source_url: String,
}
