//! Record-level validation applied before records leave the extractor.
//!
//! Validation never fails loudly: it returns a list of issues and the caller
//! drops records that carry any [`IssueSeverity::Error`].

use std::collections::HashSet;

use rust_decimal::Decimal;

use crate::products::ProductRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    /// The record is kept; the issue is only reported.
    Warning,
    /// The record must be dropped.
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub severity: IssueSeverity,
    pub field: &'static str,
    pub message: String,
}

impl ValidationIssue {
    fn error(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: IssueSeverity::Error,
            field,
            message: message.into(),
        }
    }

    fn warning(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: IssueSeverity::Warning,
            field,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == IssueSeverity::Error
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Checks a completed record against the output contract.
///
/// Errors: empty SKU or name, negative price, non-absolute or duplicated
/// image URL. Warnings: missing price, no images.
#[must_use]
pub fn validate_record(record: &ProductRecord) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if record.sku.trim().is_empty() {
        issues.push(ValidationIssue::error("sku", "sku is required"));
    }

    if record.name.trim().is_empty() {
        issues.push(ValidationIssue::error("name", "name is required"));
    }

    match record.price {
        Some(price) if price < Decimal::ZERO => {
            issues.push(ValidationIssue::error(
                "price",
                format!("price must be non-negative, got {price}"),
            ));
        }
        Some(_) => {}
        None => issues.push(ValidationIssue::warning("price", "no price found")),
    }

    if record.all_image_urls.is_empty() {
        issues.push(ValidationIssue::warning("all_image_urls", "no images found"));
    }

    let mut seen = HashSet::new();
    for url in &record.all_image_urls {
        if !is_absolute_http_url(url) {
            issues.push(ValidationIssue::error(
                "all_image_urls",
                format!("image URL is not absolute: \"{url}\""),
            ));
        } else if !seen.insert(url.as_str()) {
            issues.push(ValidationIssue::error(
                "all_image_urls",
                format!("duplicate image URL: \"{url}\""),
            ));
        }
    }

    issues
}

fn is_absolute_http_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    rest.is_some_and(|r| !r.is_empty() && !r.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::products::{Availability, SizeSelection};

    fn valid_record() -> ProductRecord {
        ProductRecord {
            sku: "1234-BLK".to_string(),
            name: "Wool Coat".to_string(),
            price: Some(Decimal::new(12900, 2)),
            currency: "EUR".to_string(),
            availability: Availability::InStock,
            color: Some("Black".to_string()),
            composition: Some("80% wool, 20% polyamide".to_string()),
            item: None,
            available_sizes: SizeSelection::Absent,
            all_image_urls: vec![
                "https://cdn.example.com/1.jpg".to_string(),
                "https://cdn.example.com/2.jpg".to_string(),
            ],
            description: "Long coat".to_string(),
            product_url: "https://www.example.com/coat".to_string(),
        }
    }

    #[test]
    fn valid_record_has_no_issues() {
        assert!(validate_record(&valid_record()).is_empty());
    }

    #[test]
    fn empty_sku_is_an_error() {
        let mut record = valid_record();
        record.sku = "  ".to_string();
        let issues = validate_record(&record);
        assert!(issues.iter().any(|i| i.is_error() && i.field == "sku"));
    }

    #[test]
    fn negative_price_is_an_error() {
        let mut record = valid_record();
        record.price = Some(Decimal::new(-100, 2));
        let issues = validate_record(&record);
        assert!(issues.iter().any(|i| i.is_error() && i.field == "price"));
    }

    #[test]
    fn missing_price_is_only_a_warning() {
        let mut record = valid_record();
        record.price = None;
        let issues = validate_record(&record);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, IssueSeverity::Warning);
    }

    #[test]
    fn relative_and_duplicate_image_urls_are_errors() {
        let mut record = valid_record();
        record.all_image_urls = vec![
            "/img/1.jpg".to_string(),
            "https://cdn.example.com/1.jpg".to_string(),
            "https://cdn.example.com/1.jpg".to_string(),
        ];
        let issues = validate_record(&record);
        let errors: Vec<_> = issues.iter().filter(|i| i.is_error()).collect();
        assert_eq!(errors.len(), 2, "got: {issues:?}");
    }
}
