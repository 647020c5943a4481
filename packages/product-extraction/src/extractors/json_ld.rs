//! Linked-data (JSON-LD) product extraction.
//!
//! Blocks are parsed as loose JSON, searched for a `Product` node, and then
//! read through lenient DTOs: a field with an unexpected shape is dropped
//! on its own instead of failing the whole node.

use indexmap::IndexMap;
use scraper::{Html, Selector};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::html::{clean_text, resolve_url, truncate_chars, MAX_DESCRIPTION_CHARS};
use crate::types::product::{ProductCandidate, RawPrice};

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LdScalar {
    Text(String),
    Number(serde_json::Number),
    Bool(bool),
}

impl LdScalar {
    fn into_text(self) -> Option<String> {
        match self {
            LdScalar::Text(s) => clean_text(&s),
            LdScalar::Number(n) => Some(n.to_string()),
            LdScalar::Bool(b) => Some(b.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LdImage {
    Url(String),
    List(Vec<LdImage>),
    Object {
        #[serde(default, alias = "contentUrl")]
        url: Option<String>,
    },
}

impl LdImage {
    fn first(self) -> Option<String> {
        match self {
            LdImage::Url(url) => Some(url),
            LdImage::List(items) => items.into_iter().find_map(LdImage::first),
            LdImage::Object { url } => url,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LdBrand {
    Name(String),
    List(Vec<LdBrand>),
    Object {
        #[serde(default)]
        name: Option<String>,
    },
}

impl LdBrand {
    fn name(self) -> Option<String> {
        match self {
            LdBrand::Name(name) => clean_text(&name),
            LdBrand::Object { name } => name.and_then(|n| clean_text(&n)),
            LdBrand::List(items) => items.into_iter().find_map(LdBrand::name),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LdPriceSpecification {
    #[serde(default, deserialize_with = "lenient")]
    price: Option<RawPrice>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LdOffer {
    #[serde(default, deserialize_with = "lenient")]
    price: Option<RawPrice>,
    #[serde(default, deserialize_with = "lenient")]
    low_price: Option<RawPrice>,
    #[serde(default, deserialize_with = "lenient")]
    high_price: Option<RawPrice>,
    #[serde(default, deserialize_with = "lenient")]
    price_specification: Option<OneOrMany<LdPriceSpecification>>,
}

/// A node that may appear alone or as a list.
///
/// `Many` must come first: derived structs also accept a sequence, so a
/// list tried as `One` would be read positionally into the first field.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn first(self) -> Option<T> {
        match self {
            OneOrMany::Many(items) => items.into_iter().next(),
            OneOrMany::One(item) => Some(item),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LdProperty {
    #[serde(default, deserialize_with = "lenient")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    value: Option<LdScalar>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LdProduct {
    #[serde(default, deserialize_with = "lenient")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    description: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    image: Option<LdImage>,
    #[serde(default, deserialize_with = "lenient")]
    brand: Option<LdBrand>,
    #[serde(default, deserialize_with = "lenient")]
    offers: Option<OneOrMany<LdOffer>>,
    #[serde(default, deserialize_with = "lenient")]
    additional_property: Option<Vec<LdProperty>>,
    #[serde(default, deserialize_with = "lenient")]
    sku: Option<LdScalar>,
    #[serde(default, deserialize_with = "lenient")]
    mpn: Option<LdScalar>,
    #[serde(default, deserialize_with = "lenient")]
    gtin: Option<LdScalar>,
    #[serde(default, deserialize_with = "lenient")]
    gtin13: Option<LdScalar>,
    #[serde(default, deserialize_with = "lenient")]
    color: Option<LdScalar>,
    #[serde(default, deserialize_with = "lenient")]
    material: Option<LdScalar>,
    #[serde(default, deserialize_with = "lenient")]
    model: Option<LdScalar>,
}

impl LdProduct {
    fn into_candidate(self, base_url: &Url) -> ProductCandidate {
        let offer = self.offers.and_then(OneOrMany::first).unwrap_or_default();
        let specified_price = offer
            .price_specification
            .and_then(OneOrMany::first)
            .and_then(|spec| spec.price);
        let price = offer.price.or(offer.low_price).or(specified_price);

        let mut specifications = IndexMap::new();
        for property in self.additional_property.unwrap_or_default() {
            let name = property.name.and_then(|n| clean_text(&n));
            let value = property.value.and_then(LdScalar::into_text);
            if let (Some(name), Some(value)) = (name, value) {
                specifications.entry(name).or_insert(value);
            }
        }
        let identifiers = [
            ("SKU", self.sku),
            ("MPN", self.mpn),
            ("GTIN", self.gtin13.or(self.gtin)),
            ("Color", self.color),
            ("Material", self.material),
            ("Model", self.model),
        ];
        for (key, value) in identifiers {
            if let Some(value) = value.and_then(LdScalar::into_text) {
                specifications.entry(key.to_string()).or_insert(value);
            }
        }

        ProductCandidate {
            name: self.name.and_then(|n| clean_text(&n)),
            description: self
                .description
                .and_then(|d| clean_text(&d))
                .map(|d| truncate_chars(&d, MAX_DESCRIPTION_CHARS)),
            price,
            original_price: offer.high_price,
            image_url: self
                .image
                .and_then(LdImage::first)
                .and_then(|img| resolve_url(base_url, &img)),
            brand: self.brand.and_then(LdBrand::name),
            specifications,
        }
    }
}

/// Whether an `@type` value names a Product.
fn is_product_type(value: &Value) -> bool {
    match value {
        Value::String(t) => {
            let t = t.rsplit(['/', ':']).next().unwrap_or(t);
            t.eq_ignore_ascii_case("Product")
        }
        Value::Array(types) => types.iter().any(is_product_type),
        _ => false,
    }
}

/// Depth-first search for the first Product node.
fn find_product(value: &Value) -> Option<&Value> {
    match value {
        Value::Object(map) => {
            if map.get("@type").is_some_and(is_product_type) {
                return Some(value);
            }
            map.get("@graph").and_then(find_product)
        }
        Value::Array(items) => items.iter().find_map(find_product),
        _ => None,
    }
}

fn parse_block(text: &str) -> Option<Value> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    serde_json::from_str(text).ok().or_else(|| {
        // Raw newlines inside strings are common and invalid JSON.
        let flattened: String = text
            .chars()
            .map(|c| if c.is_control() { ' ' } else { c })
            .collect();
        serde_json::from_str(&flattened).ok()
    })
}

/// Extract the first embedded Product description, if any.
pub fn extract_linked_data(html: &str, base_url: &Url) -> Option<ProductCandidate> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(r#"script[type="application/ld+json"]"#).ok()?;

    for (index, script) in document.select(&selector).enumerate() {
        let text: String = script.text().collect();
        let Some(block) = parse_block(&text) else {
            debug!(block = index, "Skipping malformed linked-data block");
            continue;
        };
        let Some(product) = find_product(&block) else {
            continue;
        };
        let Ok(product) = LdProduct::deserialize(product) else {
            debug!(block = index, "Product node is not an object");
            continue;
        };

        debug!(block = index, "Found linked-data product");
        return Some(product.into_candidate(base_url));
    }

    None
}
