//! Field-level parsing helpers shared by the default extractors and adapters.
//!
//! Source priority for a field is fixed:
//! 1. the live DOM, for price-sensitive fields (it reflects the selected variant),
//! 2. the structured-data block,
//! 3. a URL pattern (trailing SKU-like path segment),
//! 4. labelled DOM fields (`"Ref. 1234/567"`, `"SKU: ..."`).

use std::collections::HashSet;
use std::str::FromStr;

use regex::Regex;
use rust_decimal::Decimal;

/// Where a field value came from; logged at debug level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    LiveDom,
    StructuredData,
    UrlPattern,
    DomLabel,
}

impl std::fmt::Display for FieldSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FieldSource::LiveDom => "live_dom",
            FieldSource::StructuredData => "structured_data",
            FieldSource::UrlPattern => "url_pattern",
            FieldSource::DomLabel => "dom_label",
        };
        f.write_str(s)
    }
}

pub(crate) fn log_source(field: &'static str, source: FieldSource) {
    tracing::debug!(field, source = %source, "resolved field");
}

/// Matches a trailing digit-led product code in the last path segment:
/// `linen-shirt-p04387251.html`, `productpage.0970819001.html`, `/p/412345-09`.
pub const DEFAULT_URL_SKU_PATTERN: &str = r"(?i)(?:^|[^a-z0-9])p?(\d{5,}(?:-[a-z0-9]+)*)(?:\.html?)?$";

/// Parses a displayed price such as `"€ 1.234,56"`, `"$1,299.00"`,
/// `"39,95 EUR"` or `"12"`.
///
/// Only the first number in the text is read, so a struck-through price
/// followed by the sale price (`"49.99 39.99"`) yields the first. The last
/// `.`/`,` followed by one or two digits is the decimal separator; every other
/// separator is a thousands mark. A space groups thousands only when exactly
/// three digits follow it. Returns `None` when the text has no digits.
#[must_use]
pub fn parse_price_text(text: &str) -> Option<Decimal> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let chars: Vec<char> = text[start..].chars().collect();
    let raw = first_number(&chars);

    let normalized = match raw.rfind(['.', ',']) {
        Some(pos) if (1..=2).contains(&(raw.len() - pos - 1)) => {
            let (int_part, frac_part) = raw.split_at(pos);
            let int_digits: String = int_part.chars().filter(char::is_ascii_digit).collect();
            format!("{int_digits}.{}", &frac_part[1..])
        }
        _ => raw.chars().filter(char::is_ascii_digit).collect(),
    };

    Decimal::from_str(&normalized).ok()
}

/// Digits and `.`/`,` separators of the number starting at `chars[0]`.
/// Apostrophes and space groups are dropped.
fn first_number(chars: &[char]) -> String {
    let mut out = String::new();
    // Digits read since the last `.`/`,`.
    let mut since_separator: Option<usize> = None;
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_digit() {
            out.push(c);
            if let Some(n) = since_separator.as_mut() {
                *n += 1;
            }
            continue;
        }
        let digit_follows = chars.get(i + 1).is_some_and(char::is_ascii_digit);
        match c {
            '.' | ',' if digit_follows => {
                out.push(c);
                since_separator = Some(0);
            }
            '\'' if digit_follows => {}
            ' ' | '\u{a0}'
                if is_thousands_group(&chars[i + 1..]) && !matches!(since_separator, Some(1 | 2)) => {}
            _ => break,
        }
    }
    out
}

fn is_thousands_group(rest: &[char]) -> bool {
    rest.len() >= 3
        && rest[..3].iter().all(char::is_ascii_digit)
        && !rest.get(3).is_some_and(char::is_ascii_digit)
}

/// Maps a currency symbol or ISO code found in price text to its ISO code.
#[must_use]
pub fn currency_from_text(text: &str) -> Option<&'static str> {
    const CODES: [&str; 8] = ["EUR", "USD", "GBP", "CHF", "SEK", "PLN", "JPY", "CAD"];
    let upper = text.to_ascii_uppercase();
    if let Some(code) = CODES.into_iter().find(|c| upper.contains(c)) {
        return Some(code);
    }
    if text.contains('€') {
        Some("EUR")
    } else if text.contains('£') {
        Some("GBP")
    } else if text.contains('¥') {
        Some("JPY")
    } else if text.contains('$') {
        Some("USD")
    } else {
        None
    }
}

/// Extracts a SKU-like code from the last path segment of `url`.
///
/// `pattern` must have one capture group holding the code. Query string and
/// fragment are ignored. An invalid pattern is logged and yields `None`.
#[must_use]
pub fn sku_from_url(url: &str, pattern: &str) -> Option<String> {
    let re = match Regex::new(pattern) {
        Ok(re) => re,
        Err(e) => {
            tracing::warn!(pattern, error = %e, "invalid URL SKU pattern");
            return None;
        }
    };
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let segment = path.trim_end_matches('/').rsplit('/').next()?;
    re.captures(segment)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_owned())
}

/// Finds the value following one of `labels` in a list of labelled texts.
///
/// `"Ref. 4387/251"` with label `"Ref."` yields `"4387/251"`; separators
/// (`:`, `#`, whitespace) after the label are skipped. Matching is
/// case-insensitive.
#[must_use]
pub fn labelled_value<'a>(texts: impl IntoIterator<Item = &'a str>, labels: &[&str]) -> Option<String> {
    for text in texts {
        let trimmed = text.trim();
        for label in labels {
            let Some(head) = trimmed.get(..label.len()) else {
                continue;
            };
            if !head.eq_ignore_ascii_case(label) {
                continue;
            }
            let value = trimmed[label.len()..]
                .trim_start_matches(|c: char| c == ':' || c == '#' || c.is_whitespace())
                .trim();
            if !value.is_empty() {
                return Some(value.to_owned());
            }
        }
    }
    None
}

/// Resolves `href` against `base`, returning an absolute `http(s)` URL.
#[must_use]
pub fn absolutize(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with("data:") || href.starts_with("javascript:") {
        return None;
    }
    let resolved = match reqwest::Url::parse(base) {
        Ok(base) => base.join(href).ok()?,
        Err(_) => reqwest::Url::parse(href).ok()?,
    };
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

/// Removes later duplicates, keeping first-seen order.
#[must_use]
pub fn dedupe_preserving_order(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Whether an image load target is empty or a known placeholder.
#[must_use]
pub fn is_placeholder_src(src: &str) -> bool {
    const MARKERS: [&str; 5] = ["placeholder", "blank.gif", "spacer", "transparent", "empty.png"];
    let src = src.trim();
    if src.is_empty() || src.starts_with("data:") || src == "about:blank" {
        return true;
    }
    let lower = src.to_ascii_lowercase();
    MARKERS.iter().any(|m| lower.contains(m))
}

/// Picks the best candidate from a `srcset`: the last listed (widest) entry.
#[must_use]
pub fn largest_srcset_candidate(srcset: &str) -> Option<&str> {
    srcset
        .split(',')
        .filter_map(|entry| entry.split_whitespace().next())
        .filter(|url| !url.is_empty())
        .last()
}
