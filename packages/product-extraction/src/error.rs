//! Typed errors for the extraction pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can map
//! each failure onto a response without string matching.

use thiserror::Error;

use crate::types::product::ExtractedProduct;

/// Errors surfaced by a single extraction request.
///
/// Every variant is terminal for the request. Nothing is retried.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Target URL failed validation
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] SecurityError),

    /// Missing or unverifiable credential
    #[error("authentication required")]
    Unauthorized,

    /// Authenticated, but not an administrator
    #[error("admin access required")]
    Forbidden,

    /// No user agent produced a usable page
    #[error("failed to fetch page: {reason}")]
    FetchFailed { reason: String },

    /// A redirect (or the final URL) pointed at a blocked address
    #[error("redirect blocked: {url} ({reason})")]
    BlockedRedirect { url: String, reason: SecurityError },

    /// No product name could be determined
    #[error("could not extract product details from page")]
    ExtractionIncomplete { partial: Box<ExtractedProduct> },

    /// Generative fallback was needed but could not be reached
    #[error("extraction service unavailable")]
    UpstreamServiceUnavailable { partial: Option<Box<ExtractedProduct>> },

    /// Unexpected internal failure
    #[error("internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// HTTP-style status for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            PipelineError::Unauthorized => 401,
            PipelineError::Forbidden => 403,
            PipelineError::InvalidUrl(_)
            | PipelineError::FetchFailed { .. }
            | PipelineError::BlockedRedirect { .. }
            | PipelineError::ExtractionIncomplete { .. }
            | PipelineError::UpstreamServiceUnavailable { .. } => 400,
            PipelineError::Internal(_) => 500,
        }
    }

    /// Fields recovered before the failure, if any.
    pub fn partial(&self) -> Option<&ExtractedProduct> {
        match self {
            PipelineError::ExtractionIncomplete { partial } => Some(partial),
            PipelineError::UpstreamServiceUnavailable { partial } => partial.as_deref(),
            _ => None,
        }
    }
}

/// Errors raised by a page fetcher.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The shared fetch budget elapsed
    #[error("timed out fetching {url}")]
    Timeout { url: String },

    /// A redirect hop or the final URL failed validation
    #[error("redirect to {url} blocked: {reason}")]
    BlockedRedirect { url: String, reason: SecurityError },

    /// The host resolved only to blocked addresses
    #[error("{url} resolves to a blocked address: {reason}")]
    BlockedAddress { url: String, reason: String },

    /// Every user agent was tried without a usable response
    #[error("all {} attempts failed for {url}", attempts.len())]
    AllAgentsFailed { url: String, attempts: Vec<String> },

    /// HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl From<FetchError> for PipelineError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::BlockedRedirect { url, reason } => {
                PipelineError::BlockedRedirect { url, reason }
            }
            FetchError::BlockedAddress { reason, .. } => {
                PipelineError::InvalidUrl(SecurityError::BlockedCidr(reason))
            }
            FetchError::Client(msg) => PipelineError::Internal(msg),
            other => PipelineError::FetchFailed {
                reason: other.to_string(),
            },
        }
    }
}

/// Security-related errors, primarily for SSRF protection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecurityError {
    /// URL scheme not allowed (e.g., file://, ftp://)
    #[error("disallowed URL scheme: {0}")]
    DisallowedScheme(String),

    /// Host is blocked (e.g., localhost, metadata services, internal suffixes)
    #[error("blocked host: {0}")]
    BlockedHost(String),

    /// IP in blocked CIDR range (e.g., 10.0.0.0/8)
    #[error("blocked IP range: {0}")]
    BlockedCidr(String),

    /// URL has no host
    #[error("URL has no host")]
    NoHost,

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Errors from the generative completion service.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// No API key configured
    #[error("completion service not configured")]
    Unconfigured,

    /// Network error (connection failed, timeout)
    #[error("network error: {0}")]
    Network(String),

    /// API error (non-2xx response, rate limit, invalid request)
    #[error("API error: {0}")]
    Api(String),

    /// Response body did not have the expected shape
    #[error("parse error: {0}")]
    Parse(String),

    /// HTTP client could not be built
    #[error("client error: {0}")]
    Client(String),
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for security operations.
pub type SecurityResult<T> = std::result::Result<T, SecurityError>;
