//! Pipeline orchestrator.
//!
//! One request runs straight through:
//!
//! ```text
//! validate ─► fetch ─► re-validate final URL ─► deterministic merge
//!          ─► (fallback if name/price missing) ─► assemble
//! ```
//!
//! Nothing is shared between requests and nothing is retried.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::ai::CompletionService;
use crate::assemble::assemble;
use crate::auth::{authorize, IdentityResolver};
use crate::error::{PipelineError, Result};
use crate::extractors::{merge_title_fallback, run_deterministic};
use crate::fetch::{HttpFetcher, PageFetcher};
use crate::security::UrlValidator;
use crate::synthesis::FallbackSynthesizer;
use crate::types::config::PipelineConfig;
use crate::types::page::{ExtractionOutcome, ExtractionRequest};

/// Extracts a product from a single page.
pub struct ProductExtractor {
    validator: UrlValidator,
    fetcher: Arc<dyn PageFetcher>,
    synthesizer: Option<FallbackSynthesizer>,
}

impl ProductExtractor {
    /// Create an extractor over any fetcher, with no generative fallback.
    pub fn new(validator: UrlValidator, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            validator,
            fetcher,
            synthesizer: None,
        }
    }

    /// Build the production extractor: default validator, HTTP fetcher, and
    /// an optional completion service.
    pub fn from_config(
        config: &PipelineConfig,
        completion: Option<Arc<dyn CompletionService>>,
    ) -> Result<Self> {
        let validator = UrlValidator::new();
        let fetcher = HttpFetcher::new(config, validator.clone())?;

        let mut extractor = Self::new(validator, Arc::new(fetcher));
        if let Some(service) = completion {
            extractor = extractor.with_completion(service, config.model_content_budget);
        }
        Ok(extractor)
    }

    /// Enable the generative fallback.
    pub fn with_completion(mut self, service: Arc<dyn CompletionService>, content_budget: usize) -> Self {
        self.synthesizer = Some(FallbackSynthesizer::new(service, content_budget));
        self
    }

    pub fn has_completion(&self) -> bool {
        self.synthesizer.is_some()
    }

    /// Authorize the caller, then extract.
    ///
    /// Both identity checks complete before the URL is even parsed.
    pub async fn handle(
        &self,
        resolver: &dyn IdentityResolver,
        credential: Option<&str>,
        target_url: &str,
    ) -> Result<ExtractionOutcome> {
        let caller = authorize(resolver, credential).await?;
        self.extract(&ExtractionRequest::new(target_url, caller)).await
    }

    /// Run the pipeline for an already-authorized request.
    pub async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionOutcome> {
        info!(
            url = %request.target_url,
            caller = %request.caller.subject(),
            "Extracting product"
        );

        let target = self.validator.validate(request.target_url.trim()).map_err(|e| {
            warn!(url = %request.target_url, error = %e, "Rejected target URL");
            PipelineError::InvalidUrl(e)
        })?;

        let page = self.fetcher.fetch(&target).await?;

        // Fetchers validate redirects themselves; check again so any
        // implementation is held to the same rule.
        if let Err(reason) = self.validator.validate_url(&page.final_url) {
            warn!(
                url = %target,
                final_url = %page.final_url,
                error = %reason,
                "Redirected to a blocked address"
            );
            return Err(PipelineError::BlockedRedirect {
                url: page.final_url.to_string(),
                reason,
            });
        }

        debug!(
            final_url = %page.final_url,
            agent = %page.fetched_with_agent,
            bytes = page.html.len(),
            "Fetched page"
        );

        let mut candidate = run_deterministic(&page.html, &page.final_url);

        if candidate.needs_fallback() {
            candidate = match &self.synthesizer {
                Some(synthesizer) => {
                    synthesizer
                        .synthesize(&page.html, &page.final_url, candidate)
                        .await?
                }
                None => {
                    debug!("No completion service configured, using title fallback");
                    merge_title_fallback(&page.html, &page.final_url, candidate)
                }
            };
        }

        let product = assemble(candidate, &page.final_url).map_err(|e| {
            warn!(url = %target, error = %e, "Extraction incomplete");
            e
        })?;

        info!(
            url = %target,
            name = product.name.as_deref().unwrap_or_default(),
            has_price = product.price.is_some(),
            "Product extracted"
        );

        Ok(ExtractionOutcome {
            product,
            source_url: target.to_string(),
        })
    }
}
