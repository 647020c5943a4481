//! Small HTML helpers shared by the extractors.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

/// Maximum description length kept from any source.
pub const MAX_DESCRIPTION_CHARS: usize = 500;

static RE_SCRIPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("valid regex"));
static RE_STYLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").expect("valid regex"));
static RE_NOSCRIPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<noscript\b[^>]*>.*?</noscript\s*>").expect("valid regex")
});
static RE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));
static RE_NAV: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<nav\b[^>]*>.*?</nav\s*>").expect("valid regex"));
static RE_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<header\b[^>]*>.*?</header\s*>").expect("valid regex"));
static RE_FOOTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<footer\b[^>]*>.*?</footer\s*>").expect("valid regex"));
static RE_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Resolve a possibly-relative URL against the page URL.
///
/// Returns `None` for anything that does not end up as http(s), such as
/// `data:` or `javascript:` URIs.
pub fn resolve_url(base: &Url, raw: &str) -> Option<String> {
    let raw = decode_entities(raw.trim());
    if raw.is_empty() {
        return None;
    }

    let resolved = base.join(&raw).ok()?;
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

/// Text of the page `<title>`, trimmed.
pub fn page_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty())
}

/// Decode the handful of entities that show up in attribute values.
pub fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

pub fn collapse_whitespace(text: &str) -> String {
    RE_WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Truncate to at most `max` characters, on a character boundary.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Cleaned, whitespace-collapsed text, or `None` when empty.
pub fn clean_text(text: &str) -> Option<String> {
    let cleaned = collapse_whitespace(&decode_entities(text));
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Strip markup that carries no product data and bound the size.
///
/// Scripts, styles, comments, navigation, headers and footers are removed,
/// whitespace is collapsed, and the result is cut to `budget` characters.
pub fn sanitize_for_model(html: &str, budget: usize) -> String {
    let mut text = html.to_string();
    for pattern in [
        &RE_SCRIPT,
        &RE_STYLE,
        &RE_NOSCRIPT,
        &RE_COMMENT,
        &RE_NAV,
        &RE_HEADER,
        &RE_FOOTER,
    ] {
        text = pattern.replace_all(&text, " ").into_owned();
    }

    truncate_chars(&collapse_whitespace(&text), budget)
}
