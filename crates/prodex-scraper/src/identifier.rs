//! Stable identifiers for variant records.

use std::collections::HashSet;

use prodex_core::ProductRecord;
use sha2::{Digest, Sha256};

/// Derives the product-level id shared by every variant from a base SKU.
///
/// Assumes retailers prefix variant SKUs with the product code followed by a
/// hyphen (`04387251-251` -> `04387251`). Sites that break this rule override
/// [`crate::Parser::unique_product_id`].
#[must_use]
pub fn unique_product_id(base_sku: &str) -> String {
    let trimmed = base_sku.trim();
    trimmed
        .split('-')
        .find(|segment| !segment.is_empty())
        .unwrap_or(trimmed)
        .to_owned()
}

/// ASCII alphanumerics kept; every other run becomes a single `_`.
#[must_use]
pub fn sanitize_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for c in raw.trim().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(c);
        } else {
            pending_sep = true;
        }
    }
    out
}

/// `{id}-{color}` or `{id}-{color}-{size}`; empty segments are left out.
#[must_use]
pub fn variant_sku(unique_id: &str, color: Option<&str>, size: Option<&str>) -> String {
    let mut sku = unique_id.to_owned();
    for segment in [color, size].into_iter().flatten() {
        let clean = sanitize_segment(segment);
        if !clean.is_empty() {
            sku.push('-');
            sku.push_str(&clean);
        }
    }
    sku
}

/// SKU for pages that expose no identifier anywhere: `P` followed by the first
/// 12 hex digits of the SHA-256 of the URL without query or fragment.
#[must_use]
pub fn fallback_sku(url: &str) -> String {
    let canonical = url.split(['?', '#']).next().unwrap_or(url).trim_end_matches('/');
    let digest = format!("{:x}", Sha256::digest(canonical.as_bytes()));
    format!("P{}", &digest[..12]).to_ascii_uppercase()
}

/// Makes SKUs pairwise distinct by suffixing `-2`, `-3`, ... on collision.
pub fn ensure_unique(records: &mut [ProductRecord]) {
    let mut seen: HashSet<String> = HashSet::new();
    for record in records.iter_mut() {
        if seen.insert(record.sku.clone()) {
            continue;
        }
        let original = record.sku.clone();
        let mut n = 2u32;
        let candidate = loop {
            let candidate = format!("{original}-{n}");
            if !seen.contains(&candidate) {
                break candidate;
            }
            n += 1;
        };
        tracing::warn!(sku = %original, renamed = %candidate, "duplicate SKU renamed");
        seen.insert(candidate.clone());
        record.sku = candidate;
    }
}
