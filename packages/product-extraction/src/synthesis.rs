//! Generative fallback for pages the deterministic extractors could not finish.
//!
//! The model only ever fills gaps: a value found deterministically is never
//! replaced by a generated one.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};
use url::Url;

use crate::ai::CompletionService;
use crate::assemble::normalize;
use crate::error::{PipelineError, Result};
use crate::extractors::html::{clean_text, resolve_url, sanitize_for_model, truncate_chars, MAX_DESCRIPTION_CHARS};
use crate::extractors::merge_title_fallback;
use crate::types::product::{ProductCandidate, RawPrice};

pub const SYSTEM_PROMPT: &str = r#"You extract product details from e-commerce page HTML.
Respond with a single JSON object and nothing else: no prose, no markdown, no code fences.
Use exactly this shape, with null for anything not present on the page:
{
  "name": string | null,
  "description": string | null (at most 500 characters),
  "price": number | null (current selling price, digits only, no currency symbol),
  "original_price": number | null (price before discount, if shown),
  "image_url": string | null (main product image),
  "brand": string | null,
  "specifications": object mapping specification names to string values
}
Never invent values that do not appear on the page."#;

/// Model answer, read leniently: a field of the wrong shape is dropped.
#[derive(Debug, Default, Deserialize)]
struct SynthesizedProduct {
    #[serde(default, deserialize_with = "lenient")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    description: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    price: Option<RawPrice>,
    #[serde(default, deserialize_with = "lenient")]
    original_price: Option<RawPrice>,
    #[serde(default, deserialize_with = "lenient")]
    image_url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    brand: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    specifications: Option<IndexMap<String, Value>>,
}

fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

impl SynthesizedProduct {
    fn into_candidate(self, base_url: &Url) -> ProductCandidate {
        let specifications = self
            .specifications
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(key, value)| {
                let value = match value {
                    Value::String(s) => clean_text(&s)?,
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => return None,
                };
                Some((clean_text(&key)?, value))
            })
            .collect();

        ProductCandidate {
            name: self.name.as_deref().and_then(clean_text),
            description: self
                .description
                .as_deref()
                .and_then(clean_text)
                .map(|d| truncate_chars(&d, MAX_DESCRIPTION_CHARS)),
            price: self.price,
            original_price: self.original_price,
            image_url: self
                .image_url
                .as_deref()
                .and_then(|img| resolve_url(base_url, img)),
            brand: self.brand.as_deref().and_then(clean_text),
            specifications,
        }
    }
}

/// Remove markdown code fences and any prose around the JSON object.
pub fn strip_code_fences(text: &str) -> &str {
    let text = text
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

fn parse_response(text: &str) -> Option<SynthesizedProduct> {
    let value: Value = serde_json::from_str(strip_code_fences(text)).ok()?;
    if !value.is_object() {
        return None;
    }
    SynthesizedProduct::deserialize(&value).ok()
}

/// Fills gaps using a generative completion service.
pub struct FallbackSynthesizer {
    service: Arc<dyn CompletionService>,
    content_budget: usize,
}

impl FallbackSynthesizer {
    pub fn new(service: Arc<dyn CompletionService>, content_budget: usize) -> Self {
        Self {
            service,
            content_budget,
        }
    }

    /// Ask the model for the missing fields and merge them beneath `known`.
    ///
    /// The page title and heuristics fill whatever is still missing after
    /// the model, on every path. If the service fails and there is still no
    /// name, this returns [`PipelineError::UpstreamServiceUnavailable`].
    pub async fn synthesize(
        &self,
        html: &str,
        base_url: &Url,
        known: ProductCandidate,
    ) -> Result<ProductCandidate> {
        let content = sanitize_for_model(html, self.content_budget);
        let user_prompt = format!(
            "Extract the product from this page.\n\nURL: {}\n\nHTML:\n{}",
            base_url, content
        );

        info!(
            url = %base_url,
            service = self.service.name(),
            content_chars = content.chars().count(),
            "Running generative fallback"
        );

        let text = match self.service.complete(SYSTEM_PROMPT, &user_prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(url = %base_url, error = %e, "Completion service unavailable");
                let known = merge_title_fallback(html, base_url, known);
                if known.name.is_some() {
                    return Ok(known);
                }
                let partial = normalize(known, base_url);
                return Err(PipelineError::UpstreamServiceUnavailable {
                    partial: (partial != Default::default()).then(|| Box::new(partial)),
                });
            }
        };

        let merged = match parse_response(&text) {
            Some(synthesized) => known.fill_gaps(synthesized.into_candidate(base_url)),
            None => {
                warn!(url = %base_url, "Could not parse completion response, using title fallback");
                known
            }
        };
        Ok(merge_title_fallback(html, base_url, merged))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockCompletion;

    fn base() -> Url {
        Url::parse("https://shop.example.com/product/1").unwrap()
    }

    fn synthesizer(mock: &MockCompletion, budget: usize) -> FallbackSynthesizer {
        FallbackSynthesizer::new(Arc::new(mock.clone()), budget)
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("Here you go: {\"a\":1} hope it helps"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1}  "), "{\"a\":1}");
        assert_eq!(strip_code_fences("```json {\"name\":\"X\"}```"), "{\"name\":\"X\"}");
        assert_eq!(strip_code_fences("```{\"a\":1}```"), "{\"a\":1}");
    }

    #[tokio::test]
    async fn test_single_line_fenced_answer_is_used() {
        let mock = MockCompletion::new().with_response("```json {\"price\": 75}```");
        let known = ProductCandidate::new().with_name("Lamp");

        let result = synthesizer(&mock, 80_000)
            .synthesize("<html></html>", &base(), known)
            .await
            .unwrap();

        assert_eq!(result.price.and_then(|p| p.to_number()), Some(75.0));
    }

    #[tokio::test]
    async fn test_fills_gaps_without_overwriting() {
        let mock = MockCompletion::new().with_response(
            r#"```json
            {"name": "Generated", "price": "1,200", "brand": "Acme",
             "image_url": "/img/g.jpg", "specifications": {"RAM": "8GB", "Cores": 4, "Bad": [1]}}
            ```"#,
        );
        let known = ProductCandidate::new().with_name("Deterministic");

        let result = synthesizer(&mock, 80_000)
            .synthesize("<html></html>", &base(), known)
            .await
            .unwrap();

        assert_eq!(result.name.as_deref(), Some("Deterministic"));
        assert_eq!(result.price.and_then(|p| p.to_number()), Some(1200.0));
        assert_eq!(result.brand.as_deref(), Some("Acme"));
        assert_eq!(
            result.image_url.as_deref(),
            Some("https://shop.example.com/img/g.jpg")
        );
        assert_eq!(result.specifications["RAM"], "8GB");
        assert_eq!(result.specifications["Cores"], "4");
        assert!(!result.specifications.contains_key("Bad"));
    }

    #[tokio::test]
    async fn test_prompt_is_sanitized_and_bounded() {
        let mock = MockCompletion::new().with_response("{}");
        let html = format!(
            "<script>secret()</script><nav>menu</nav><main>{}</main>",
            "p".repeat(500)
        );

        synthesizer(&mock, 100)
            .synthesize(&html, &base(), ProductCandidate::new())
            .await
            .unwrap();

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].system_prompt, SYSTEM_PROMPT);
        assert!(!calls[0].user_prompt.contains("secret()"));
        assert!(!calls[0].user_prompt.contains("menu"));
        let html_part = calls[0].user_prompt.split("HTML:\n").nth(1).unwrap();
        assert_eq!(html_part.chars().count(), 100);
    }

    #[tokio::test]
    async fn test_unparseable_answer_uses_title_and_heuristics() {
        let mock = MockCompletion::new().with_response("I could not find a product, sorry.");
        let html = r#"<title>Desk Lamp</title><span data-price="45"></span>"#;

        let result = synthesizer(&mock, 80_000)
            .synthesize(html, &base(), ProductCandidate::new())
            .await
            .unwrap();

        assert_eq!(result.name.as_deref(), Some("Desk Lamp"));
        assert_eq!(result.price.and_then(|p| p.to_number()), Some(45.0));
    }

    #[tokio::test]
    async fn test_unavailable_keeps_named_partial() {
        let mock = MockCompletion::unavailable();
        let known = ProductCandidate::new().with_name("Mouse");

        let result = synthesizer(&mock, 80_000)
            .synthesize("<html></html>", &base(), known)
            .await
            .unwrap();

        assert_eq!(result.name.as_deref(), Some("Mouse"));
        assert!(result.price.is_none());
    }

    #[tokio::test]
    async fn test_unavailable_falls_back_to_title() {
        let mock = MockCompletion::unavailable();
        let html = r#"<title>Desk Lamp</title><span data-price="45"></span>"#;

        let result = synthesizer(&mock, 80_000)
            .synthesize(html, &base(), ProductCandidate::new())
            .await
            .unwrap();

        assert_eq!(mock.call_count(), 1);
        assert_eq!(result.name.as_deref(), Some("Desk Lamp"));
        assert_eq!(result.price.and_then(|p| p.to_number()), Some(45.0));
    }

    #[tokio::test]
    async fn test_null_name_answer_falls_back_to_title() {
        let mock = MockCompletion::new().with_response(r#"{"name": null, "brand": "Lumo"}"#);
        let html = r#"<title>Desk Lamp</title><span data-price="45"></span>"#;

        let result = synthesizer(&mock, 80_000)
            .synthesize(html, &base(), ProductCandidate::new())
            .await
            .unwrap();

        assert_eq!(result.name.as_deref(), Some("Desk Lamp"));
        assert_eq!(result.brand.as_deref(), Some("Lumo"));
        assert_eq!(result.price.and_then(|p| p.to_number()), Some(45.0));
    }

    #[tokio::test]
    async fn test_model_name_beats_page_title() {
        let mock = MockCompletion::new().with_response(r#"{"name": "Lumo Desk Lamp"}"#);
        let html = r#"<title>Shop | Home</title>"#;

        let result = synthesizer(&mock, 80_000)
            .synthesize(html, &base(), ProductCandidate::new())
            .await
            .unwrap();

        assert_eq!(result.name.as_deref(), Some("Lumo Desk Lamp"));
    }

    #[tokio::test]
    async fn test_unavailable_without_name_fails() {
        let mock = MockCompletion::unavailable();
        let known = ProductCandidate::new().with_price(99.0);

        let err = synthesizer(&mock, 80_000)
            .synthesize("<html></html>", &base(), known)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::UpstreamServiceUnavailable { .. }));
        assert_eq!(err.partial().and_then(|p| p.price), Some(99.0));
    }
}
