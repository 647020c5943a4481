//! HTTP fetcher with user-agent rotation.
//!
//! One deadline covers the whole rotation. Every redirect hop is validated
//! by the redirect policy, every resolved address by the DNS resolver, and
//! the final URL once more before the body is read.

use std::error::Error as StdError;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::header::{ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, REFERER, USER_AGENT};
use reqwest::redirect::Policy;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

use super::PageFetcher;
use crate::error::{FetchError, FetchResult, SecurityError};
use crate::security::UrlValidator;
use crate::types::config::PipelineConfig;
use crate::types::page::FetchedPage;

const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

type BoxError = Box<dyn StdError + Send + Sync>;

/// Raised from the redirect policy when a hop fails validation.
#[derive(Debug, thiserror::Error)]
#[error("redirect to {url} blocked: {reason}")]
struct RedirectBlocked {
    url: String,
    reason: SecurityError,
}

#[derive(Debug, thiserror::Error)]
#[error("too many redirects (limit {0})")]
struct TooManyRedirects(usize);

/// Raised from the resolver when a host maps to a blocked address.
#[derive(Debug, thiserror::Error)]
#[error("{host} resolved to blocked address {ip}")]
struct BlockedResolution {
    host: String,
    ip: std::net::IpAddr,
}

/// DNS resolver that refuses names resolving into blocked ranges.
struct GuardedResolver {
    validator: UrlValidator,
}

impl Resolve for GuardedResolver {
    fn resolve(&self, name: Name) -> Resolving {
        Box::pin(resolve_guarded(
            self.validator.clone(),
            name.as_str().to_string(),
        ))
    }
}

async fn resolve_guarded(validator: UrlValidator, host: String) -> Result<Addrs, BoxError> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host.as_str(), 0)).await?.collect();

    if !validator.is_allowed_host(&host) {
        if let Some(blocked) = addrs.iter().find(|a| validator.is_blocked_ip(a.ip())) {
            warn!(host = %host, ip = %blocked.ip(), "DNS resolved to blocked address");
            return Err(Box::new(BlockedResolution {
                host,
                ip: blocked.ip(),
            }));
        }
    }

    Ok(Box::new(addrs.into_iter()))
}

enum AttemptFailure {
    /// Stop the rotation immediately.
    Fatal(FetchError),
    /// Try the next user agent.
    Retryable(String),
}

/// Fetches product pages over HTTP.
///
/// # Example
///
/// ```rust,ignore
/// use product_extraction::{HttpFetcher, PipelineConfig, UrlValidator};
///
/// let fetcher = HttpFetcher::new(&PipelineConfig::default(), UrlValidator::new())?;
/// let page = fetcher.fetch(&"https://shop.example.com/p/1".parse()?).await?;
/// ```
pub struct HttpFetcher {
    client: reqwest::Client,
    validator: UrlValidator,
    user_agents: Vec<String>,
    timeout: Duration,
    max_body_bytes: usize,
}

impl HttpFetcher {
    /// Create a fetcher. The validator is applied to every hop.
    pub fn new(config: &PipelineConfig, validator: UrlValidator) -> FetchResult<Self> {
        let policy_validator = validator.clone();
        let max_redirects = config.max_redirects;
        let policy = Policy::custom(move |attempt| {
            if attempt.previous().len() > max_redirects {
                return attempt.error(TooManyRedirects(max_redirects));
            }
            let next = attempt.url().clone();
            match policy_validator.validate_url(&next) {
                Ok(()) => attempt.follow(),
                Err(reason) => {
                    warn!(url = %next, reason = %reason, "Blocked redirect hop");
                    attempt.error(RedirectBlocked {
                        url: next.to_string(),
                        reason,
                    })
                }
            }
        });

        let client = reqwest::Client::builder()
            .redirect(policy)
            .dns_resolver(Arc::new(GuardedResolver {
                validator: validator.clone(),
            }))
            // Proxies resolve on our behalf, which would bypass the resolver guard.
            .no_proxy()
            .connect_timeout(config.fetch_timeout)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            client,
            validator,
            user_agents: config.user_agents.clone(),
            timeout: config.fetch_timeout,
            max_body_bytes: config.max_body_bytes,
        })
    }

    async fn attempt(&self, url: &Url, agent: &str) -> Result<FetchedPage, AttemptFailure> {
        let referer = format!("{}/", url.origin().ascii_serialization());

        let mut response = self
            .client
            .get(url.clone())
            .header(USER_AGENT, agent)
            .header(ACCEPT, ACCEPT_HTML)
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .header(ACCEPT_ENCODING, "gzip, deflate, br")
            .header(REFERER, referer)
            .send()
            .await
            .map_err(|e| classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptFailure::Retryable(format!("HTTP {}", status)));
        }

        // Checked before any of the body is read.
        let final_url = response.url().clone();
        if let Err(reason) = self.validator.validate_url(&final_url) {
            warn!(url = %url, final_url = %final_url, "Final URL failed validation");
            return Err(AttemptFailure::Fatal(FetchError::BlockedRedirect {
                url: final_url.to_string(),
                reason,
            }));
        }

        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| AttemptFailure::Retryable(e.to_string()))?
        {
            let remaining = self.max_body_bytes.saturating_sub(body.len());
            if chunk.len() >= remaining {
                body.extend_from_slice(&chunk[..remaining]);
                debug!(url = %final_url, limit = self.max_body_bytes, "Body truncated");
                break;
            }
            body.extend_from_slice(&chunk);
        }

        let html = String::from_utf8_lossy(&body).into_owned();
        if html.trim().is_empty() {
            return Err(AttemptFailure::Retryable("empty body".to_string()));
        }

        Ok(FetchedPage::new(final_url, html).with_agent(agent))
    }
}

/// Sort a transport error into "stop now" or "try the next agent".
fn classify(target: &Url, err: reqwest::Error) -> AttemptFailure {
    if let Some(blocked) = find_cause::<RedirectBlocked>(&err) {
        return AttemptFailure::Fatal(FetchError::BlockedRedirect {
            url: blocked.url.clone(),
            reason: blocked.reason.clone(),
        });
    }

    if let Some(blocked) = find_cause::<BlockedResolution>(&err) {
        return AttemptFailure::Fatal(blocked_resolution(target, err.url(), blocked));
    }

    AttemptFailure::Retryable(err.to_string())
}

/// A blocked lookup for the target's own host is a bad target; for any
/// other host it can only have come from a redirect.
fn blocked_resolution(target: &Url, failed_url: Option<&Url>, blocked: &BlockedResolution) -> FetchError {
    let is_target = failed_url.map_or(true, |u| u.host_str() == target.host_str());
    if is_target {
        FetchError::BlockedAddress {
            url: target.to_string(),
            reason: blocked.to_string(),
        }
    } else {
        FetchError::BlockedRedirect {
            url: failed_url.map(|u| u.to_string()).unwrap_or_default(),
            reason: SecurityError::BlockedCidr(blocked.ip.to_string()),
        }
    }
}

fn find_cause<'a, T: StdError + 'static>(err: &'a (dyn StdError + 'static)) -> Option<&'a T> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(found) = e.downcast_ref::<T>() {
            return Some(found);
        }
        current = e.source();
    }
    None
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> FetchResult<FetchedPage> {
        info!(url = %url, agents = self.user_agents.len(), "HTTP fetch starting");

        let deadline = Instant::now() + self.timeout;
        let mut failures = Vec::new();

        for agent in &self.user_agents {
            // Dropping the attempt on timeout aborts the in-flight request.
            match tokio::time::timeout_at(deadline, self.attempt(url, agent)).await {
                Err(_) => {
                    warn!(url = %url, timeout_ms = self.timeout.as_millis(), "Fetch budget exhausted");
                    return Err(FetchError::Timeout {
                        url: url.to_string(),
                    });
                }
                Ok(Ok(page)) => {
                    info!(
                        url = %url,
                        final_url = %page.final_url,
                        bytes = page.html.len(),
                        "Page fetched"
                    );
                    return Ok(page);
                }
                Ok(Err(AttemptFailure::Fatal(e))) => return Err(e),
                Ok(Err(AttemptFailure::Retryable(reason))) => {
                    debug!(url = %url, agent = %agent, reason = %reason, "Attempt failed");
                    failures.push(reason);
                }
            }
        }

        warn!(url = %url, attempts = failures.len(), "All user agents failed");
        Err(FetchError::AllAgentsFailed {
            url: url.to_string(),
            attempts: failures,
        })
    }

    fn name(&self) -> &str {
        "http"
    }
}
