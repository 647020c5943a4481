//! Regex heuristics for pages with no structured price or image.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use super::html::resolve_url;

const NUMBER: &str = r"([0-9][0-9,]*(?:\.[0-9]+)?)";

// Tried in order; the first positive match wins.
static PRICE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // JSON-ish "price": "1,299.00"
        format!(r#""price"\s*:\s*"?\s*{NUMBER}"#),
        // data-price="1299"
        format!(r#"(?i)data-price\s*=\s*["']\s*{NUMBER}"#),
        // <span class="product-price"><span>৳</span> 1,299</span>
        format!(r#"(?is)class\s*=\s*["'][^"']*price[^"']*["'][^>]*>(?:<[^>]+>|[^0-9<]){{0,80}}?{NUMBER}"#),
        // Taka, dollar, rupee
        format!(r"৳\s*{NUMBER}"),
        format!(r"\$\s*{NUMBER}"),
        format!(r"₹\s*{NUMBER}"),
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

const IMAGE_HINT: &str = r"(?:product|main|primary|featured|gallery|hero)";

static IMAGE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // <img class="product-image" src="...">
        format!(
            r#"(?is)<img\b[^>]*\b(?:class|id)\s*=\s*["'][^"']*{IMAGE_HINT}[^"']*["'][^>]*\bsrc\s*=\s*["']([^"']+)["']"#
        ),
        // <img src="..." class="product-image">
        format!(
            r#"(?is)<img\b[^>]*\bsrc\s*=\s*["']([^"']+)["'][^>]*\b(?:class|id)\s*=\s*["'][^"']*{IMAGE_HINT}[^"']*["']"#
        ),
        // Zoom / large-image data attributes
        r#"(?i)data-zoom-image\s*=\s*["']([^"']+)["']"#.to_string(),
        r#"(?i)data-large[-_]image\s*=\s*["']([^"']+)["']"#.to_string(),
        r#"(?i)data-full-image\s*=\s*["']([^"']+)["']"#.to_string(),
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

fn parse_number(raw: &str) -> Option<f64> {
    let value: f64 = raw.replace(',', "").parse().ok()?;
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Find a price in raw markup.
pub fn extract_price(html: &str) -> Option<f64> {
    PRICE_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures_iter(html)
            .filter_map(|cap| cap.get(1))
            .find_map(|m| parse_number(m.as_str()))
    })
}

/// Find the main product image and resolve it against the page URL.
pub fn extract_image(html: &str, base_url: &Url) -> Option<String> {
    IMAGE_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures_iter(html)
            .filter_map(|cap| cap.get(1))
            .find_map(|m| resolve_url(base_url, m.as_str()))
    })
}
