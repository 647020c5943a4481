//! Configuration for the extraction pipeline.

use std::time::Duration;

/// Browser-like identities tried in order until one gets a usable page.
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)",
];

/// Configuration for a [`crate::ProductExtractor`] and its fetcher.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Total wall-clock budget shared by every user-agent attempt.
    ///
    /// Default: 15 seconds.
    pub fetch_timeout: Duration,

    /// User agents tried in sequence.
    pub user_agents: Vec<String>,

    /// Maximum redirect hops followed per attempt.
    ///
    /// Default: 5.
    pub max_redirects: usize,

    /// Response bodies are truncated past this many bytes.
    ///
    /// Default: 5 MiB.
    pub max_body_bytes: usize,

    /// Characters of sanitized markup sent to the completion service.
    ///
    /// Default: 80,000.
    pub model_content_budget: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(15),
            user_agents: DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect(),
            max_redirects: 5,
            max_body_bytes: 5 * 1024 * 1024,
            model_content_budget: 80_000,
        }
    }
}

impl PipelineConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the shared fetch timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Replace the user-agent rotation.
    pub fn with_user_agents(mut self, agents: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.user_agents = agents.into_iter().map(|a| a.into()).collect();
        self
    }

    /// Set the redirect hop limit.
    pub fn with_max_redirects(mut self, hops: usize) -> Self {
        self.max_redirects = hops;
        self
    }

    /// Set the response body cap.
    pub fn with_max_body_bytes(mut self, bytes: usize) -> Self {
        self.max_body_bytes = bytes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.fetch_timeout, Duration::from_secs(15));
        assert_eq!(config.model_content_budget, 80_000);
        assert_eq!(config.max_redirects, 5);
        assert!(config.user_agents.iter().any(|ua| ua.contains("Googlebot")));
    }

    #[test]
    fn test_builder() {
        let config = PipelineConfig::new()
            .with_fetch_timeout(Duration::from_secs(2))
            .with_user_agents(["a", "b"])
            .with_max_redirects(2);
        assert_eq!(config.fetch_timeout, Duration::from_secs(2));
        assert_eq!(config.max_redirects, 2);
        assert_eq!(config.user_agents, vec!["a".to_string(), "b".to_string()]);
    }
}
