//! Social-preview metadata (`og:*`, `product:*`, `twitter:*`) extraction.

use indexmap::IndexMap;
use scraper::{Html, Selector};

use super::html::clean_text;

/// Collect preview meta tags into a flat map.
///
/// `og:` prefixes are stripped (`og:title` becomes `title`); `product:` and
/// `twitter:` keys are kept whole. A plain `<meta name="description">`
/// fills `description` when no `og:description` exists. The first
/// occurrence of a key wins. Returns `None` when the page has no such tags.
pub fn extract_page_metadata(html: &str) -> Option<IndexMap<String, String>> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("meta[content]").ok()?;

    let mut tags: IndexMap<String, String> = IndexMap::new();
    let mut plain_description = None;

    for meta in document.select(&selector) {
        let element = meta.value();
        let Some(key) = element.attr("property").or_else(|| element.attr("name")) else {
            continue;
        };
        let Some(content) = element.attr("content").and_then(clean_text) else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();

        if let Some(stripped) = key.strip_prefix("og:") {
            tags.entry(stripped.to_string()).or_insert(content);
        } else if key.starts_with("product:") || key.starts_with("twitter:") {
            tags.entry(key).or_insert(content);
        } else if key == "description" && plain_description.is_none() {
            plain_description = Some(content);
        }
    }

    if let Some(description) = plain_description {
        tags.entry("description".to_string()).or_insert(description);
    }

    (!tags.is_empty()).then_some(tags)
}
