//! The shared `parse_product` pipeline: structured data, validity check,
//! enumeration, identifier synthesis, validation.

use prodex_core::{validate_record, ProductRecord, SizeSelection, StructuredDataMode};

use crate::identifier::{ensure_unique, fallback_sku, variant_sku};
use crate::page::PageHandle;
use crate::parser::{PageContext, Parser};
use crate::structured::load_structured_data;
use crate::variants::{capture_variant, enumerate_variants, VariantCapture};

pub const MISSING_STRUCTURED_DATA: &str =
    "no structured product data found; using DOM-only extraction";

/// Records plus the non-fatal problems met while producing them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionOutcome {
    pub records: Vec<ProductRecord>,
    pub warnings: Vec<String>,
    /// Records removed by validation.
    pub dropped: usize,
}

pub async fn extract_product<P: Parser + ?Sized>(parser: &P, page: &dyn PageHandle) -> ExtractionOutcome {
    let flags = *parser.capabilities();
    let site = parser.site_id();
    let url = page.current_url().await;
    let mut outcome = ExtractionOutcome::default();

    let structured = load_structured_data(page, flags.structured_data).await;
    if structured.is_none() && flags.structured_data != StructuredDataMode::Absent {
        tracing::warn!(site, url = %url, "{MISSING_STRUCTURED_DATA}");
        outcome.warnings.push(MISSING_STRUCTURED_DATA.to_owned());
    }

    let mut ctx = PageContext::new(page, structured);
    if !parser.is_valid_product_page(&ctx).await {
        tracing::info!(site, url = %url, "not a product page");
        return outcome;
    }

    let captures = if flags.enumerates_variants() {
        let result = enumerate_variants(parser, &mut ctx).await;
        outcome.warnings.extend(
            result
                .skipped_colors
                .iter()
                .map(|color| format!("color '{color}' skipped: switch not confirmed")),
        );
        result.captures
    } else {
        vec![capture_variant(parser, &ctx).await]
    };

    let mut records = assemble_records(parser, flags.multi_size, &captures, &url);
    ensure_unique(&mut records);

    for record in records {
        let issues = validate_record(&record);
        if issues.iter().any(|issue| issue.is_error()) {
            let summary = issues
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            tracing::warn!(site, sku = %record.sku, issues = %summary, "record dropped");
            outcome.dropped += 1;
        } else {
            outcome.records.push(record);
        }
    }

    tracing::info!(
        site,
        url = %url,
        records = outcome.records.len(),
        dropped = outcome.dropped,
        "extraction complete"
    );
    outcome
}

/// Expands captures into records and assigns SKUs.
///
/// Identity fields missing from a later color fall back to the first
/// capture's. A product that yields exactly one record keeps its base SKU.
pub fn assemble_records<P: Parser + ?Sized>(
    parser: &P,
    multi_size: bool,
    captures: &[VariantCapture],
    page_url: &str,
) -> Vec<ProductRecord> {
    let Some(base) = captures.first() else {
        return Vec::new();
    };

    let base_sku = captures
        .iter()
        .find_map(|c| c.base_sku.clone())
        .unwrap_or_else(|| fallback_sku(page_url));
    let unique_id = if captures.iter().any(|c| c.base_sku.is_some()) {
        parser.unique_product_id(&base_sku)
    } else {
        base_sku.clone()
    };

    // (record, color segment, size segment)
    let mut rows: Vec<(ProductRecord, Option<String>, Option<String>)> = Vec::new();
    for capture in captures {
        let color_segment = capture.color_code.clone().or_else(|| capture.color.clone());
        let record = ProductRecord {
            sku: String::new(),
            name: capture
                .name
                .clone()
                .or_else(|| base.name.clone())
                .unwrap_or_default(),
            price: capture.price.or(base.price),
            currency: capture.currency.clone(),
            availability: capture.availability,
            color: capture.color.clone(),
            composition: capture.composition.clone().or_else(|| base.composition.clone()),
            item: capture.item.clone().or_else(|| base.item.clone()),
            available_sizes: capture.sizes.clone(),
            all_image_urls: capture.images.clone(),
            description: if capture.description.is_empty() {
                base.description.clone()
            } else {
                capture.description.clone()
            },
            product_url: capture.url.clone(),
        };

        match capture.sizes.as_flat() {
            Some(sizes) if multi_size && sizes.len() > 1 => {
                for size in sizes {
                    let mut per_size = record.clone();
                    per_size.available_sizes = SizeSelection::Flat(vec![size.clone()]);
                    rows.push((per_size, color_segment.clone(), Some(size.clone())));
                }
            }
            _ => rows.push((record, color_segment, None)),
        }
    }

    if rows.len() == 1 {
        rows[0].0.sku = base_sku;
    } else {
        for (record, color, size) in &mut rows {
            record.sku = variant_sku(&unique_id, color.as_deref(), size.as_deref());
        }
    }

    rows.into_iter().map(|(record, _, _)| record).collect()
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
