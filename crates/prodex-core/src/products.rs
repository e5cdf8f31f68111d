use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single extracted product variant, normalized for ingestion.
///
/// One record is produced per reachable (color, size) or (color, size matrix)
/// combination of a product page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Variant-level SKU; unique per (base product, color, size).
    pub sku: String,
    pub name: String,
    /// Current selling price; `None` when no source exposed one.
    #[serde(with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    /// ISO 4217 currency code (e.g., `"EUR"`).
    pub currency: String,
    pub availability: Availability,
    pub color: Option<String>,
    /// Fabric / material composition as displayed, e.g. `"100% cotton"`.
    pub composition: Option<String>,
    /// Retailer item category, e.g. `"Dress"`.
    pub item: Option<String>,
    pub available_sizes: SizeSelection,
    /// Absolute, de-duplicated image URLs in page order.
    pub all_image_urls: Vec<String>,
    pub description: String,
    pub product_url: String,
}

/// Sizes offered for one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum SizeSelection {
    /// The page exposes no size selector.
    #[default]
    Absent,
    /// A single size dimension, in page order.
    Flat(Vec<String>),
    /// Two dependent dimensions (e.g., band × cup).
    Matrix(SizeCombinationMatrix),
}

impl SizeSelection {
    /// Builds a selection from a flat list, mapping an empty list to `Absent`.
    #[must_use]
    pub fn from_flat(sizes: Vec<String>) -> Self {
        if sizes.is_empty() {
            Self::Absent
        } else {
            Self::Flat(sizes)
        }
    }

    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// The flat size list, if this is a one-dimensional selection.
    #[must_use]
    pub fn as_flat(&self) -> Option<&[String]> {
        match self {
            Self::Flat(sizes) => Some(sizes),
            _ => None,
        }
    }
}

/// Valid (primary, secondary) size pairs of a two-dimensional selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeCombinationMatrix {
    /// Label of the primary dimension, e.g. `"band"`.
    pub size1_type: String,
    /// Label of the secondary dimension, e.g. `"cup"`.
    pub size2_type: String,
    /// Primary value → secondary values that stay enabled when it is selected.
    pub combinations: BTreeMap<String, Vec<String>>,
}

impl SizeCombinationMatrix {
    #[must_use]
    pub fn new(size1_type: impl Into<String>, size2_type: impl Into<String>) -> Self {
        Self {
            size1_type: size1_type.into(),
            size2_type: size2_type.into(),
            combinations: BTreeMap::new(),
        }
    }

    /// Total number of valid pairs.
    #[must_use]
    pub fn pair_count(&self) -> usize {
        self.combinations.values().map(Vec::len).sum()
    }

    /// `true` when every recorded secondary value belongs to `all_secondary`.
    #[must_use]
    pub fn is_consistent_with(&self, all_secondary: &[String]) -> bool {
        self.combinations
            .values()
            .flatten()
            .all(|value| all_secondary.contains(value))
    }
}

/// Stock state of a variant, using the schema.org `ItemAvailability` names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Availability {
    #[default]
    InStock,
    OutOfStock,
    SoldOut,
    PreOrder,
    PreSale,
    BackOrder,
    MadeToOrder,
    Discontinued,
    InStoreOnly,
    OnlineOnly,
    LimitedAvailability,
    Reserved,
}

impl Availability {
    pub const ALL: [Availability; 12] = [
        Availability::InStock,
        Availability::OutOfStock,
        Availability::SoldOut,
        Availability::PreOrder,
        Availability::PreSale,
        Availability::BackOrder,
        Availability::MadeToOrder,
        Availability::Discontinued,
        Availability::InStoreOnly,
        Availability::OnlineOnly,
        Availability::LimitedAvailability,
        Availability::Reserved,
    ];

    /// The schema.org token, e.g. `"InStock"`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Availability::InStock => "InStock",
            Availability::OutOfStock => "OutOfStock",
            Availability::SoldOut => "SoldOut",
            Availability::PreOrder => "PreOrder",
            Availability::PreSale => "PreSale",
            Availability::BackOrder => "BackOrder",
            Availability::MadeToOrder => "MadeToOrder",
            Availability::Discontinued => "Discontinued",
            Availability::InStoreOnly => "InStoreOnly",
            Availability::OnlineOnly => "OnlineOnly",
            Availability::LimitedAvailability => "LimitedAvailability",
            Availability::Reserved => "Reserved",
        }
    }

    /// Parses a schema.org availability value.
    ///
    /// Accepts bare tokens (`"InStock"`), full IRIs
    /// (`"https://schema.org/InStock"`) and loose display text
    /// (`"in stock"`, `"Sold-out"`). Returns `None` for anything else so the
    /// caller can apply its own fallback.
    #[must_use]
    pub fn from_schema_org(raw: &str) -> Option<Self> {
        let token = raw
            .trim()
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect::<String>()
            .to_ascii_lowercase();

        Self::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(&token))
    }

    /// Whether a shopper can currently buy this variant online.
    #[must_use]
    pub fn is_purchasable(self) -> bool {
        matches!(
            self,
            Availability::InStock
                | Availability::PreOrder
                | Availability::PreSale
                | Availability::BackOrder
                | Availability::MadeToOrder
                | Availability::OnlineOnly
                | Availability::LimitedAvailability
        )
    }
}

impl std::fmt::Display for Availability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
