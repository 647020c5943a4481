//! Final normalization and completeness check.

use url::Url;

use crate::error::{PipelineError, Result};
use crate::extractors::html::{clean_text, resolve_url, truncate_chars, MAX_DESCRIPTION_CHARS};
use crate::types::product::{ExtractedProduct, ProductCandidate};

/// Normalize a candidate without checking completeness.
///
/// - relative image URLs are made absolute against `base_url`
/// - string prices are coerced to numbers; unreadable prices become `None`
/// - text fields are trimmed and the description is bounded
pub fn normalize(candidate: ProductCandidate, base_url: &Url) -> ExtractedProduct {
    ExtractedProduct {
        name: candidate.name.as_deref().and_then(clean_text),
        description: candidate
            .description
            .as_deref()
            .and_then(clean_text)
            .map(|d| truncate_chars(&d, MAX_DESCRIPTION_CHARS)),
        price: candidate.price.as_ref().and_then(|p| p.to_number()),
        original_price: candidate.original_price.as_ref().and_then(|p| p.to_number()),
        image_url: candidate
            .image_url
            .as_deref()
            .and_then(|img| resolve_url(base_url, img)),
        brand: candidate.brand.as_deref().and_then(clean_text),
        specifications: candidate.specifications,
    }
}

/// Normalize and require a name.
///
/// Fails with [`PipelineError::ExtractionIncomplete`] carrying whatever was
/// recovered, so an operator can see how far extraction got.
pub fn assemble(candidate: ProductCandidate, base_url: &Url) -> Result<ExtractedProduct> {
    let product = normalize(candidate, base_url);

    if product.name.is_none() {
        return Err(PipelineError::ExtractionIncomplete {
            partial: Box::new(product),
        });
    }

    Ok(product)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::product::RawPrice;

    fn base() -> Url {
        Url::parse("https://shop.example.com/product/1").unwrap()
    }

    #[test]
    fn test_resolves_relative_image() {
        let candidate = ProductCandidate::new()
            .with_name("Mouse")
            .with_image_url("/img/p.jpg");
        let product = assemble(candidate, &base()).unwrap();
        assert_eq!(
            product.image_url.as_deref(),
            Some("https://shop.example.com/img/p.jpg")
        );
    }

    #[test]
    fn test_coerces_string_price() {
        let candidate = ProductCandidate::new()
            .with_name("Mouse")
            .with_price("BDT 1,999.50");
        let product = assemble(candidate, &base()).unwrap();
        assert_eq!(product.price, Some(1999.5));
    }

    #[test]
    fn test_non_numeric_price_becomes_missing_not_zero() {
        let candidate = ProductCandidate::new()
            .with_name("Mouse")
            .with_price("Out of stock");
        let product = assemble(candidate, &base()).unwrap();
        assert_eq!(product.price, None);
    }

    #[test]
    fn test_missing_name_is_incomplete_with_partial() {
        let mut candidate = ProductCandidate::new()
            .with_price(RawPrice::Number(250.0))
            .with_image_url("/img/p.jpg");
        candidate.name = Some("   ".into());

        let err = assemble(candidate, &base()).unwrap_err();
        let partial = err.partial().unwrap();
        assert!(matches!(err, PipelineError::ExtractionIncomplete { .. }));
        assert_eq!(partial.price, Some(250.0));
        assert_eq!(
            partial.image_url.as_deref(),
            Some("https://shop.example.com/img/p.jpg")
        );
    }

    #[test]
    fn test_bounds_description() {
        let mut candidate = ProductCandidate::new().with_name("Mouse");
        candidate.description = Some("x".repeat(2_000));
        let product = assemble(candidate, &base()).unwrap();
        assert_eq!(product.description.unwrap().len(), 500);
    }
}
