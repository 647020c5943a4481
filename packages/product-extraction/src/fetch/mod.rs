//! Page fetching.
//!
//! - `PageFetcher` - trait the pipeline fetches through
//! - `HttpFetcher` - reqwest implementation with user-agent rotation,
//!   a shared deadline and per-hop redirect validation

pub mod http;

use async_trait::async_trait;
use url::Url;

use crate::error::FetchResult;
use crate::types::page::FetchedPage;

pub use http::HttpFetcher;

/// Retrieves the raw body of a single, already-validated URL.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> FetchResult<FetchedPage>;

    /// Name of this fetcher (for logging).
    fn name(&self) -> &str;
}
