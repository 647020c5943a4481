//! SSRF-safe product page extraction.
//!
//! Given a product page URL from an authorized administrator, fetch the page
//! and turn it into a normalized product record.
//!
//! # Design
//!
//! - Fail closed: the admin gate and URL validation both run before any
//!   network call, and redirects are re-validated before a body is trusted
//! - Deterministic first: linked data, then page metadata, then heuristics,
//!   each only filling gaps left by the previous step
//! - The generative model is a last resort and never overrides a value
//!   found in the markup
//!
//! # Usage
//!
//! ```rust,ignore
//! use product_extraction::{PipelineConfig, ProductExtractor, OpenAICompletion};
//! use std::sync::Arc;
//!
//! let completion = OpenAICompletion::from_env().map(|c| Arc::new(c) as _);
//! let extractor = ProductExtractor::from_config(&PipelineConfig::default(), completion)?;
//!
//! let outcome = extractor
//!     .handle(&resolver, Some("Bearer <token>"), "https://shop.example.com/p/1")
//!     .await?;
//! println!("{:?}", outcome.product);
//! ```
//!
//! # Modules
//!
//! - [`security`] - URL validation and credential handling
//! - [`auth`] - Admin gate over an identity collaborator
//! - [`fetch`] - Page fetchers (user-agent rotation, shared deadline)
//! - [`extractors`] - Linked data, page metadata, heuristics
//! - [`synthesis`] - Generative fallback
//! - [`assemble`] - Normalization and completeness check
//! - [`pipeline`] - The orchestrator
//! - [`testing`] - Mock implementations for testing

pub mod ai;
pub mod assemble;
pub mod auth;
pub mod error;
pub mod extractors;
pub mod fetch;
pub mod pipeline;
pub mod security;
pub mod synthesis;
pub mod testing;
pub mod types;

pub use ai::{CompletionService, OpenAICompletion};
pub use auth::{authorize, AdminPrincipal, IdentityResolver, Principal};
pub use error::{CompletionError, FetchError, PipelineError, Result, SecurityError};
pub use fetch::{HttpFetcher, PageFetcher};
pub use pipeline::ProductExtractor;
pub use security::{SecretString, UrlValidator};
pub use synthesis::FallbackSynthesizer;
pub use types::{
    config::PipelineConfig,
    page::{ExtractionOutcome, ExtractionRequest, FetchedPage},
    product::{ExtractedProduct, ProductCandidate, RawPrice},
};
