//! Product data at each stage of the pipeline.
//!
//! [`ProductCandidate`] is the accumulator that the merge steps fill in.
//! [`ExtractedProduct`] is the normalized output handed back to the caller.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A price as it appeared in the source: already numeric, or still text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawPrice {
    Number(f64),
    Text(String),
}

impl RawPrice {
    /// Coerce to a positive, finite number.
    ///
    /// Text is stripped of everything except digits and `.` before parsing,
    /// so `"৳ 2,499.00"` becomes `2499.0`. Anything that does not yield a
    /// positive number is treated as missing.
    pub fn to_number(&self) -> Option<f64> {
        let value = match self {
            RawPrice::Number(n) => *n,
            RawPrice::Text(text) => {
                let cleaned: String = text
                    .chars()
                    .filter(|c| c.is_ascii_digit() || *c == '.')
                    .collect();
                cleaned.parse::<f64>().ok()?
            }
        };

        (value.is_finite() && value > 0.0).then_some(value)
    }
}

impl From<f64> for RawPrice {
    fn from(n: f64) -> Self {
        RawPrice::Number(n)
    }
}

impl From<&str> for RawPrice {
    fn from(s: &str) -> Self {
        RawPrice::Text(s.to_string())
    }
}

/// Partially extracted product fields, accumulated across merge steps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductCandidate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<RawPrice>,
    pub original_price: Option<RawPrice>,
    pub image_url: Option<String>,
    pub brand: Option<String>,
    pub specifications: IndexMap<String, String>,
}

impl ProductCandidate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill every absent field from `other`. Present fields are never replaced.
    pub fn fill_gaps(mut self, other: ProductCandidate) -> Self {
        fill(&mut self.name, other.name);
        fill(&mut self.description, other.description);
        fill(&mut self.price, other.price);
        fill(&mut self.original_price, other.original_price);
        fill(&mut self.image_url, other.image_url);
        fill(&mut self.brand, other.brand);
        for (key, value) in other.specifications {
            self.specifications.entry(key).or_insert(value);
        }
        self
    }

    /// True when the deterministic stages left a required gap.
    pub fn needs_fallback(&self) -> bool {
        self.name.is_none() || self.price.is_none()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_price(mut self, price: impl Into<RawPrice>) -> Self {
        self.price = Some(price.into());
        self
    }

    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }
}

fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
    if slot.is_none() {
        *slot = value;
    }
}

/// Normalized product fields returned to the caller.
///
/// On failure the same shape carries whatever was recovered, so `name`
/// stays optional here; a successful result always has it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedProduct {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default)]
    pub specifications: IndexMap<String, String>,
}
