use super::*;
use crate::options::OptionSelectors;
use crate::page::SnapshotPage;
use crate::parser::SiteSelectors;
use async_trait::async_trait;
use prodex_core::{Availability, CapabilityFlags};
use rust_decimal::Decimal;

struct Minimal {
    flags: CapabilityFlags,
}

const SELECTORS: SiteSelectors = SiteSelectors {
    product_marker: "main.product",
    name: "h1",
    price: ".price",
    description: None,
    composition: None,
    images: "img",
    colors: None,
    sizes: Some(OptionSelectors::text(".size")),
    size_matrix: None,
    labelled_fields: None,
    sku_labels: &[],
    url_sku_pattern: None,
};

#[async_trait]
impl Parser for Minimal {
    fn site_id(&self) -> &str {
        "minimal"
    }
    fn capabilities(&self) -> &CapabilityFlags {
        &self.flags
    }
    fn selectors(&self) -> &SiteSelectors {
        &SELECTORS
    }
}

fn minimal() -> Minimal {
    Minimal {
        flags: CapabilityFlags {
            structured_data: StructuredDataMode::Immediate,
            ..CapabilityFlags::default()
        },
    }
}

fn capture(color: &str, code: Option<&str>, sizes: &[&str]) -> VariantCapture {
    VariantCapture {
        color: Some(color.to_owned()),
        color_code: code.map(str::to_owned),
        base_sku: Some("4387251-800".to_owned()),
        name: Some("Shirt".to_owned()),
        price: Some(Decimal::new(2995, 2)),
        currency: "EUR".to_owned(),
        availability: Availability::InStock,
        composition: None,
        item: None,
        description: String::new(),
        sizes: SizeSelection::from_flat(sizes.iter().map(|s| (*s).to_owned()).collect()),
        images: vec!["https://cdn.example.com/1.jpg".to_owned()],
        url: "https://shop.example.com/p/shirt".to_owned(),
    }
}

#[test]
fn single_record_keeps_base_sku() {
    let records = assemble_records(
        &minimal(),
        true,
        &[capture("Black", Some("800"), &["M"])],
        "https://shop.example.com/p/shirt",
    );
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].sku, "4387251-800");
}

#[test]
fn colors_use_code_segment_and_sizes_expand_when_multi_size() {
    let captures = [
        capture("Black", Some("800"), &["S", "M"]),
        capture("Light Blue", None, &["S"]),
    ];
    let records = assemble_records(&minimal(), true, &captures, "https://shop.example.com/p/shirt");
    let skus: Vec<&str> = records.iter().map(|r| r.sku.as_str()).collect();
    assert_eq!(skus, vec!["4387251-800-S", "4387251-800-M", "4387251-Light_Blue"]);
    assert_eq!(records[1].available_sizes, SizeSelection::Flat(vec!["M".into()]));
}

#[test]
fn sizes_stay_on_one_record_without_multi_size() {
    let captures = [
        capture("Black", Some("800"), &["S", "M"]),
        capture("Ecru", Some("251"), &["S", "M"]),
    ];
    let records = assemble_records(&minimal(), false, &captures, "https://shop.example.com/p/shirt");
    let skus: Vec<&str> = records.iter().map(|r| r.sku.as_str()).collect();
    assert_eq!(skus, vec!["4387251-800", "4387251-251"]);
}

#[test]
fn missing_sku_everywhere_uses_url_fallback() {
    let mut only = capture("Black", None, &[]);
    only.base_sku = None;
    let records = assemble_records(&minimal(), false, &[only], "https://shop.example.com/p/shirt?x=1");
    assert_eq!(records[0].sku, fallback_sku("https://shop.example.com/p/shirt"));
}

#[tokio::test]
async fn invalid_page_yields_no_records() {
    let page = SnapshotPage::new("https://shop.example.com/help", "<h1>Help centre</h1>");
    let outcome = extract_product(&minimal(), &page).await;
    assert!(outcome.records.is_empty());
    assert_eq!(outcome.warnings, vec![MISSING_STRUCTURED_DATA.to_owned()]);
}

#[tokio::test]
async fn record_failing_validation_is_dropped() {
    // No name anywhere: the record cannot pass validation.
    let page = SnapshotPage::new(
        "https://shop.example.com/p/shirt-p12345678.html",
        r#"<main class="product"><p class="price">10 EUR</p></main>"#,
    );
    let outcome = extract_product(&minimal(), &page).await;
    assert!(outcome.records.is_empty());
    assert_eq!(outcome.dropped, 1);
}

#[tokio::test]
async fn parse_product_returns_validated_records() {
    let page = SnapshotPage::new(
        "https://shop.example.com/p/shirt-p12345678.html",
        r#"<main class="product"><h1>Shirt</h1><p class="price">10 EUR</p>
           <img src="/a.jpg"></main>"#,
    );
    let records = minimal().parse_product(&page).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].sku, "12345678");
    assert_eq!(records[0].all_image_urls, vec!["https://shop.example.com/a.jpg"]);
}
