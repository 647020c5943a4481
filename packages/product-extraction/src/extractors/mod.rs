//! Deterministic extractors and the ordered merge steps built on them.
//!
//! Each step takes the accumulator and only fills fields that are still
//! absent, so an earlier step always wins:
//!
//! 1. linked data (JSON-LD)
//! 2. page metadata (`og:*`)
//! 3. heuristic price / image
//!
//! All extractors are pure: same markup in, same candidate out.

pub mod heuristics;
pub mod html;
pub mod json_ld;
pub mod meta;

use tracing::debug;
use url::Url;

use crate::types::product::{ProductCandidate, RawPrice};

pub use heuristics::{extract_image, extract_price};
pub use json_ld::extract_linked_data;
pub use meta::extract_page_metadata;

/// A pure `(html, base_url, accumulator) -> accumulator` transform.
pub type MergeStep = fn(&str, &Url, ProductCandidate) -> ProductCandidate;

/// Deterministic steps, in priority order.
pub const DETERMINISTIC_STEPS: &[(&str, MergeStep)] = &[
    ("linked_data", merge_linked_data),
    ("page_metadata", merge_page_metadata),
    ("heuristics", merge_heuristics),
];

/// Run [`DETERMINISTIC_STEPS`] over a page.
pub fn run_deterministic(html: &str, base_url: &Url) -> ProductCandidate {
    DETERMINISTIC_STEPS
        .iter()
        .fold(ProductCandidate::new(), |acc, (name, step)| {
            let next = step(html, base_url, acc);
            debug!(
                step = *name,
                has_name = next.name.is_some(),
                has_price = next.price.is_some(),
                has_image = next.image_url.is_some(),
                "Merge step complete"
            );
            next
        })
}

pub fn merge_linked_data(html: &str, base_url: &Url, acc: ProductCandidate) -> ProductCandidate {
    match extract_linked_data(html, base_url) {
        Some(found) => acc.fill_gaps(found),
        None => acc,
    }
}

pub fn merge_page_metadata(html: &str, base_url: &Url, acc: ProductCandidate) -> ProductCandidate {
    let Some(mut tags) = extract_page_metadata(html) else {
        return acc;
    };

    let image = tags
        .swap_remove("image")
        .or_else(|| tags.swap_remove("image:secure_url"))
        .or_else(|| tags.swap_remove("twitter:image"))
        .and_then(|img| html::resolve_url(base_url, &img));

    acc.fill_gaps(ProductCandidate {
        name: tags.swap_remove("title"),
        description: tags
            .swap_remove("description")
            .map(|d| html::truncate_chars(&d, html::MAX_DESCRIPTION_CHARS)),
        image_url: image,
        ..Default::default()
    })
}

pub fn merge_heuristics(html: &str, base_url: &Url, mut acc: ProductCandidate) -> ProductCandidate {
    if acc.price.is_none() {
        acc.price = extract_price(html).map(RawPrice::Number);
    }
    if acc.image_url.is_none() {
        acc.image_url = extract_image(html, base_url);
    }
    acc
}

/// Last deterministic resort: page `<title>` as name, then heuristics.
///
/// Runs after the generative fallback too, whatever the model answered.
pub fn merge_title_fallback(html: &str, base_url: &Url, mut acc: ProductCandidate) -> ProductCandidate {
    if acc.name.is_none() {
        acc.name = html::page_title(html);
    }
    merge_heuristics(html, base_url, acc)
}
