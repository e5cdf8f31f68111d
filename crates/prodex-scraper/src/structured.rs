//! Structured-data reader: schema.org `Product` blocks embedded as JSON-LD.
//!
//! A missing or malformed block is a recoverable absence, never an error;
//! callers fall back to DOM-only extraction.

use std::str::FromStr;
use std::time::Duration;

use prodex_core::{Availability, StructuredDataMode};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::fields::parse_price_text;
use crate::page::PageHandle;
use crate::poll::poll_until;

/// Interval between structured-data polls.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

const JSON_LD_SELECTOR: &str = r#"script[type="application/ld+json"]"#;

/// Product fields read from a JSON-LD block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuredProduct {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub mpn: Option<String>,
    pub product_id: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub material: Option<String>,
    pub category: Option<String>,
    /// Image URLs as written in the block (may be relative).
    pub images: Vec<String>,
    pub offers: Vec<StructuredOffer>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuredOffer {
    pub price: Option<Decimal>,
    pub currency: Option<String>,
    pub availability: Option<Availability>,
    pub sku: Option<String>,
}

impl StructuredProduct {
    /// First of `sku`, `mpn`, `productID`.
    #[must_use]
    pub fn identifier(&self) -> Option<&str> {
        self.sku
            .as_deref()
            .or(self.mpn.as_deref())
            .or(self.product_id.as_deref())
    }

    #[must_use]
    pub fn price(&self) -> Option<Decimal> {
        self.offers.iter().find_map(|o| o.price)
    }

    #[must_use]
    pub fn currency(&self) -> Option<&str> {
        self.offers.iter().find_map(|o| o.currency.as_deref())
    }

    #[must_use]
    pub fn availability(&self) -> Option<Availability> {
        self.offers.iter().find_map(|o| o.availability)
    }

    /// Builds a product from a JSON-LD node typed `Product` or `ProductGroup`.
    #[must_use]
    pub fn from_json(item: &Value) -> Option<Self> {
        let type_node = item.get("@type")?;
        let is_group = type_matches(type_node, "ProductGroup");
        if !is_group && !type_matches(type_node, "Product") {
            return None;
        }

        let mut product = StructuredProduct {
            name: string_field(item, "name"),
            sku: string_field(item, "sku"),
            mpn: string_field(item, "mpn"),
            product_id: string_field(item, "productID")
                .or_else(|| string_field(item, "productGroupID")),
            description: string_field(item, "description"),
            color: string_field(item, "color"),
            material: string_field(item, "material"),
            category: string_field(item, "category"),
            images: item.get("image").map(image_urls).unwrap_or_default(),
            offers: item.get("offers").map(offers).unwrap_or_default(),
        };

        // A group usually carries offers and images on its variants only.
        if is_group {
            if let Some(first) = item
                .get("hasVariant")
                .and_then(Value::as_array)
                .and_then(|variants| variants.iter().find_map(StructuredProduct::from_json))
            {
                if product.offers.is_empty() {
                    product.offers = first.offers;
                }
                if product.images.is_empty() {
                    product.images = first.images;
                }
                if product.sku.is_none() {
                    product.sku = first.sku;
                }
            }
        }

        Some(product)
    }
}

/// `@type` may be a string or an array, with or without a schema.org prefix.
fn type_matches(type_node: &Value, wanted: &str) -> bool {
    let matches = |s: &str| {
        s.rsplit(['/', ':'])
            .next()
            .is_some_and(|t| t.eq_ignore_ascii_case(wanted))
    };
    match type_node {
        Value::String(s) => matches(s),
        Value::Array(items) => items.iter().filter_map(Value::as_str).any(matches),
        _ => false,
    }
}

fn string_field(item: &Value, key: &str) -> Option<String> {
    let value = item.get(key)?;
    let s = match value {
        Value::String(s) => s.trim().to_owned(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

fn image_urls(node: &Value) -> Vec<String> {
    match node {
        Value::String(s) if !s.trim().is_empty() => vec![s.trim().to_owned()],
        Value::Array(items) => items.iter().flat_map(image_urls).collect(),
        Value::Object(_) => string_field(node, "url")
            .or_else(|| string_field(node, "contentUrl"))
            .into_iter()
            .collect(),
        _ => Vec::new(),
    }
}

fn offers(node: &Value) -> Vec<StructuredOffer> {
    match node {
        Value::Array(items) => items.iter().flat_map(offers).collect(),
        Value::Object(_) => vec![StructuredOffer {
            price: node
                .get("price")
                .or_else(|| node.get("lowPrice"))
                .and_then(price_value),
            currency: string_field(node, "priceCurrency"),
            availability: node
                .get("availability")
                .and_then(Value::as_str)
                .and_then(Availability::from_schema_org),
            sku: string_field(node, "sku"),
        }],
        _ => Vec::new(),
    }
}

fn price_value(node: &Value) -> Option<Decimal> {
    match node {
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        Value::String(s) => Decimal::from_str(s.trim())
            .ok()
            .or_else(|| parse_price_text(s)),
        _ => None,
    }
}

/// Parses JSON-LD block texts and returns the first product found.
///
/// Each block may be an object, an array, or an `@graph` container.
/// Unparseable blocks are skipped.
pub fn parse_structured_blocks<'a>(blocks: impl IntoIterator<Item = &'a str>) -> Option<StructuredProduct> {
    for text in blocks {
        let value: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(error = %e, "skipping malformed JSON-LD block");
                continue;
            }
        };

        let mut candidates: Vec<&Value> = match &value {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        };

        let mut expanded = Vec::new();
        for item in &candidates {
            if let Some(graph) = item.get("@graph").and_then(Value::as_array) {
                expanded.extend(graph.iter());
            }
        }
        candidates.extend(expanded);

        if let Some(product) = candidates.into_iter().find_map(StructuredProduct::from_json) {
            return Some(product);
        }
    }
    None
}

/// Reads the page's structured product data once.
pub async fn read_structured_data(page: &dyn PageHandle) -> Option<StructuredProduct> {
    let scripts = page.query_all(JSON_LD_SELECTOR).await;
    parse_structured_blocks(scripts.iter().map(|s| s.text.as_str()))
}

/// Polls until a `Product` block appears, returning `None` after `timeout`.
pub async fn wait_for_structured_data(
    page: &dyn PageHandle,
    timeout: Duration,
) -> Option<StructuredProduct> {
    let found = poll_until(POLL_INTERVAL, timeout, || read_structured_data(page)).await;
    if found.is_none() {
        tracing::warn!(
            timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            "structured product data did not appear before timeout"
        );
    }
    found
}

/// Obtains structured data the way the site's capabilities say to.
pub async fn load_structured_data(
    page: &dyn PageHandle,
    mode: StructuredDataMode,
) -> Option<StructuredProduct> {
    match mode {
        StructuredDataMode::Poll { timeout_ms } => {
            wait_for_structured_data(page, Duration::from_millis(timeout_ms)).await
        }
        StructuredDataMode::Immediate => read_structured_data(page).await,
        StructuredDataMode::Absent => None,
    }
}
