//! Testing utilities including mock implementations.
//!
//! These let applications exercise the pipeline without making real
//! network, model, or identity calls. Every mock records its calls so tests
//! can assert that a gate stopped the request before any I/O happened.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use url::Url;

use crate::ai::CompletionService;
use crate::auth::{IdentityResolver, Principal};
use crate::error::{CompletionError, FetchError, FetchResult, SecurityError};
use crate::fetch::PageFetcher;
use crate::types::page::FetchedPage;

/// Canned failure for [`MockFetcher`].
#[derive(Debug, Clone)]
pub enum MockFetchFailure {
    Timeout,
    AllAgentsFailed,
    BlockedRedirect { to: String },
}

#[derive(Debug, Clone)]
struct MockPage {
    final_url: String,
    html: String,
}

/// A mock fetcher serving pages from memory.
///
/// Unknown URLs fail as if every user agent got a 404.
#[derive(Default, Clone)]
pub struct MockFetcher {
    pages: Arc<RwLock<HashMap<String, MockPage>>>,
    failure: Arc<RwLock<Option<MockFetchFailure>>>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `html` for `url`.
    pub fn with_page(self, url: &str, html: impl Into<String>) -> Self {
        self.with_redirect(url, url, html)
    }

    /// Serve `html` for `url` as though the client was redirected to `final_url`.
    pub fn with_redirect(self, url: &str, final_url: &str, html: impl Into<String>) -> Self {
        self.pages.write().unwrap().insert(
            normalize_key(url),
            MockPage {
                final_url: final_url.to_string(),
                html: html.into(),
            },
        );
        self
    }

    /// Fail every fetch.
    pub fn failing(self, failure: MockFetchFailure) -> Self {
        *self.failure.write().unwrap() = Some(failure);
        self
    }

    /// URLs requested so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }

    pub fn fetch_call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }
}

fn normalize_key(url: &str) -> String {
    Url::parse(url)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| url.to_string())
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, url: &Url) -> FetchResult<FetchedPage> {
        self.calls.write().unwrap().push(url.to_string());

        if let Some(failure) = self.failure.read().unwrap().clone() {
            return Err(match failure {
                MockFetchFailure::Timeout => FetchError::Timeout {
                    url: url.to_string(),
                },
                MockFetchFailure::AllAgentsFailed => FetchError::AllAgentsFailed {
                    url: url.to_string(),
                    attempts: vec!["mock failure".to_string()],
                },
                MockFetchFailure::BlockedRedirect { to } => FetchError::BlockedRedirect {
                    url: to.clone(),
                    reason: SecurityError::BlockedHost(to),
                },
            });
        }

        let page = self.pages.read().unwrap().get(url.as_str()).cloned();
        let Some(page) = page else {
            return Err(FetchError::AllAgentsFailed {
                url: url.to_string(),
                attempts: vec!["HTTP 404 Not Found".to_string()],
            });
        };

        let final_url = Url::parse(&page.final_url).map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(FetchedPage::new(final_url, page.html).with_agent("mock"))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Record of a call made to [`MockCompletion`].
#[derive(Debug, Clone)]
pub struct MockCompletionCall {
    pub system_prompt: String,
    pub user_prompt: String,
}

/// A mock completion service returning a fixed answer.
#[derive(Clone)]
pub struct MockCompletion {
    response: Arc<RwLock<Option<String>>>,
    calls: Arc<RwLock<Vec<MockCompletionCall>>>,
}

impl Default for MockCompletion {
    fn default() -> Self {
        Self {
            response: Arc::new(RwLock::new(Some("{}".to_string()))),
            calls: Arc::default(),
        }
    }
}

impl MockCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    /// A service whose every call fails.
    pub fn unavailable() -> Self {
        let mock = Self::default();
        *mock.response.write().unwrap() = None;
        mock
    }

    pub fn with_response(self, text: impl Into<String>) -> Self {
        *self.response.write().unwrap() = Some(text.into());
        self
    }

    pub fn calls(&self) -> Vec<MockCompletionCall> {
        self.calls.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }
}

#[async_trait]
impl CompletionService for MockCompletion {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, CompletionError> {
        self.calls.write().unwrap().push(MockCompletionCall {
            system_prompt: system_prompt.to_string(),
            user_prompt: user_prompt.to_string(),
        });

        self.response
            .read()
            .unwrap()
            .clone()
            .ok_or_else(|| CompletionError::Network("mock service unavailable".into()))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Identity resolver backed by a fixed credential table.
///
/// A principal is an admin when it carries the `admin` role.
#[derive(Default, Clone)]
pub struct StaticIdentityResolver {
    principals: Arc<RwLock<HashMap<String, Principal>>>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl StaticIdentityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_principal(self, credential: impl Into<String>, principal: Principal) -> Self {
        self.principals
            .write()
            .unwrap()
            .insert(credential.into(), principal);
        self
    }

    /// Credentials presented so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl IdentityResolver for StaticIdentityResolver {
    async fn resolve_principal(&self, credential: &str) -> Option<Principal> {
        self.calls.write().unwrap().push(credential.to_string());
        self.principals.read().unwrap().get(credential).cloned()
    }

    async fn has_admin_role(&self, principal: &Principal) -> bool {
        principal.roles.iter().any(|r| r == "admin")
    }
}
