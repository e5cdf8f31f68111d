//! The adapter contract.
//!
//! An adapter is mostly data: a [`SiteSelectors`] table plus
//! [`CapabilityFlags`]. Every extractor has a default built on those, so an
//! adapter only overrides what its site does differently. The default
//! implementations are also exported as free functions so an override can
//! post-process the default result.

use async_trait::async_trait;
use prodex_core::{Availability, CapabilityFlags, ProductRecord};
use rust_decimal::Decimal;

use crate::fields::{
    absolutize, currency_from_text, dedupe_preserving_order, is_placeholder_src,
    labelled_value, largest_srcset_candidate, log_source, parse_price_text, sku_from_url,
    FieldSource, DEFAULT_URL_SKU_PATTERN,
};
use crate::identifier;
use crate::options::{enabled_values, read_options, OptionSelectors, PageOption};
use crate::page::{ElementSnapshot, PageHandle};
use crate::pipeline;
use crate::structured::StructuredProduct;

/// Currency reported when neither structured data nor price text names one.
pub const DEFAULT_CURRENCY: &str = "USD";

/// The page being extracted plus whatever structured data it carried.
pub struct PageContext<'a> {
    pub page: &'a dyn PageHandle,
    pub structured: Option<StructuredProduct>,
}

impl<'a> PageContext<'a> {
    #[must_use]
    pub fn new(page: &'a dyn PageHandle, structured: Option<StructuredProduct>) -> Self {
        Self { page, structured }
    }
}

/// Two dependent size dimensions (band × cup, waist × length).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixSelectors {
    pub primary_type: &'static str,
    pub secondary_type: &'static str,
    pub primary: OptionSelectors,
    pub secondary: OptionSelectors,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeLayout {
    None,
    Flat(OptionSelectors),
    Matrix(MatrixSelectors),
}

/// CSS selectors describing one retailer's product page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteSelectors {
    /// Present only on product pages.
    pub product_marker: &'static str,
    pub name: &'static str,
    pub price: &'static str,
    pub description: Option<&'static str>,
    pub composition: Option<&'static str>,
    /// Gallery image carriers (also what the lazy-image loader counts).
    pub images: &'static str,
    pub colors: Option<OptionSelectors>,
    pub sizes: Option<OptionSelectors>,
    pub size_matrix: Option<MatrixSelectors>,
    /// Elements holding labelled values such as `"Ref. 4387/251"`.
    pub labelled_fields: Option<&'static str>,
    pub sku_labels: &'static [&'static str],
    /// Overrides [`DEFAULT_URL_SKU_PATTERN`].
    pub url_sku_pattern: Option<&'static str>,
}

impl SiteSelectors {
    /// Regions whose content changes when a different color is shown.
    #[must_use]
    pub fn variant_regions(&self) -> Vec<&'static str> {
        let mut regions = vec![self.images, self.price];
        if let Some(sizes) = self.sizes {
            regions.push(sizes.options);
        }
        if let Some(matrix) = self.size_matrix {
            regions.push(matrix.primary.options);
            regions.push(matrix.secondary.options);
        }
        regions
    }
}

#[async_trait]
pub trait Parser: Send + Sync {
    fn site_id(&self) -> &str;

    fn capabilities(&self) -> &CapabilityFlags;

    fn selectors(&self) -> &SiteSelectors;

    async fn is_valid_product_page(&self, ctx: &PageContext<'_>) -> bool {
        ctx.structured.is_some()
            || ctx
                .page
                .query_one(self.selectors().product_marker)
                .await
                .is_some()
    }

    async fn extract_name(&self, ctx: &PageContext<'_>) -> Option<String> {
        default_name(self.selectors(), ctx).await
    }

    async fn extract_sku(&self, ctx: &PageContext<'_>) -> Option<String> {
        default_sku(self.selectors(), ctx).await
    }

    async fn extract_price(&self, ctx: &PageContext<'_>) -> Option<Decimal> {
        default_price(self.selectors(), ctx).await
    }

    async fn extract_currency(&self, ctx: &PageContext<'_>) -> String {
        default_currency(self.selectors(), ctx).await
    }

    async fn extract_availability(&self, ctx: &PageContext<'_>) -> Availability {
        default_availability(self.selectors(), ctx).await
    }

    async fn extract_color(&self, ctx: &PageContext<'_>) -> Option<String> {
        if let Some(option) = self.selected_color(ctx.page).await {
            log_source("color", FieldSource::LiveDom);
            return Some(option.value);
        }
        ctx.structured.as_ref().and_then(|s| s.color.clone())
    }

    async fn extract_color_code(&self, ctx: &PageContext<'_>) -> Option<String> {
        self.selected_color(ctx.page).await.and_then(|o| o.code)
    }

    async fn extract_composition(&self, ctx: &PageContext<'_>) -> Option<String> {
        if let Some(selector) = self.selectors().composition {
            if let Some(text) = dom_text(ctx.page, selector).await {
                return Some(text);
            }
        }
        ctx.structured.as_ref().and_then(|s| s.material.clone())
    }

    async fn extract_item(&self, ctx: &PageContext<'_>) -> Option<String> {
        ctx.structured.as_ref().and_then(|s| s.category.clone())
    }

    async fn extract_description(&self, ctx: &PageContext<'_>) -> String {
        if let Some(description) = ctx.structured.as_ref().and_then(|s| s.description.clone()) {
            return description;
        }
        match self.selectors().description {
            Some(selector) => dom_text(ctx.page, selector).await.unwrap_or_default(),
            None => String::new(),
        }
    }

    async fn extract_images(&self, ctx: &PageContext<'_>) -> Vec<String> {
        default_images(self.selectors(), ctx).await
    }

    /// Enabled sizes of the flat size selector, in page order.
    async fn extract_sizes(&self, ctx: &PageContext<'_>) -> Vec<String> {
        match self.selectors().sizes {
            Some(sizes) => enabled_values(&read_options(ctx.page, &sizes).await),
            None => Vec::new(),
        }
    }

    /// Every color control on the page, including disabled ones.
    async fn color_options(&self, page: &dyn PageHandle) -> Vec<PageOption> {
        match self.selectors().colors {
            Some(colors) => read_options(page, &colors).await,
            None => Vec::new(),
        }
    }

    async fn selected_color(&self, page: &dyn PageHandle) -> Option<PageOption> {
        self.color_options(page).await.into_iter().find(|o| o.selected)
    }

    fn size_layout(&self) -> SizeLayout {
        let selectors = self.selectors();
        match (selectors.size_matrix, selectors.sizes) {
            (Some(matrix), _) => SizeLayout::Matrix(matrix),
            (None, Some(sizes)) => SizeLayout::Flat(sizes),
            (None, None) => SizeLayout::None,
        }
    }

    /// Product-level id shared by every variant SKU.
    fn unique_product_id(&self, base_sku: &str) -> String {
        identifier::unique_product_id(base_sku)
    }

    /// Extracts every variant record the page offers. Never fails: an empty
    /// list means nothing could be extracted.
    async fn parse_product(&self, page: &dyn PageHandle) -> Vec<ProductRecord> {
        pipeline::extract_product(self, page).await.records
    }
}

/// Text of the first element matching `selector`, if non-empty.
pub async fn dom_text(page: &dyn PageHandle, selector: &str) -> Option<String> {
    page.query_one(selector)
        .await
        .map(|e| e.text)
        .filter(|t| !t.is_empty())
}

pub async fn default_name(selectors: &SiteSelectors, ctx: &PageContext<'_>) -> Option<String> {
    if let Some(name) = ctx.structured.as_ref().and_then(|s| s.name.clone()) {
        log_source("name", FieldSource::StructuredData);
        return Some(name);
    }
    let name = dom_text(ctx.page, selectors.name).await;
    if name.is_some() {
        log_source("name", FieldSource::LiveDom);
    }
    name
}

/// Structured identifier, then URL pattern, then labelled DOM fields.
pub async fn default_sku(selectors: &SiteSelectors, ctx: &PageContext<'_>) -> Option<String> {
    if let Some(sku) = ctx.structured.as_ref().and_then(StructuredProduct::identifier) {
        log_source("sku", FieldSource::StructuredData);
        return Some(sku.to_owned());
    }

    let url = ctx.page.current_url().await;
    let pattern = selectors.url_sku_pattern.unwrap_or(DEFAULT_URL_SKU_PATTERN);
    if let Some(sku) = sku_from_url(&url, pattern) {
        log_source("sku", FieldSource::UrlPattern);
        return Some(sku);
    }

    let labelled = selectors.labelled_fields?;
    let texts: Vec<String> = ctx
        .page
        .query_all(labelled)
        .await
        .into_iter()
        .map(|e| e.text)
        .collect();
    let sku = labelled_value(texts.iter().map(String::as_str), selectors.sku_labels);
    if sku.is_some() {
        log_source("sku", FieldSource::DomLabel);
    }
    sku
}

/// Live price text first; it reflects the selected variant.
pub async fn default_price(selectors: &SiteSelectors, ctx: &PageContext<'_>) -> Option<Decimal> {
    if let Some(price) = dom_text(ctx.page, selectors.price)
        .await
        .as_deref()
        .and_then(parse_price_text)
    {
        log_source("price", FieldSource::LiveDom);
        return Some(price);
    }
    let price = ctx.structured.as_ref().and_then(StructuredProduct::price);
    if price.is_some() {
        log_source("price", FieldSource::StructuredData);
    }
    price
}

/// Live size controls first: a variant whose sizes are all disabled is out of
/// stock, and one with an enabled size is buyable even when the structured
/// block (possibly describing another color) says otherwise.
pub async fn default_availability(selectors: &SiteSelectors, ctx: &PageContext<'_>) -> Availability {
    let structured = ctx.structured.as_ref().and_then(StructuredProduct::availability);
    match (live_size_stock(selectors, ctx.page).await, structured) {
        (Some(false), _) => {
            log_source("availability", FieldSource::LiveDom);
            Availability::OutOfStock
        }
        (Some(true), Some(availability)) if !availability.is_purchasable() => {
            log_source("availability", FieldSource::LiveDom);
            Availability::InStock
        }
        (_, Some(availability)) => {
            log_source("availability", FieldSource::StructuredData);
            availability
        }
        (_, None) => Availability::InStock,
    }
}

/// Whether any size option is enabled; `None` when the page shows no sizes.
async fn live_size_stock(selectors: &SiteSelectors, page: &dyn PageHandle) -> Option<bool> {
    let group = selectors
        .size_matrix
        .map(|matrix| matrix.primary)
        .or(selectors.sizes)?;
    let options = read_options(page, &group).await;
    (!options.is_empty()).then(|| options.iter().any(|o| o.enabled))
}

pub async fn default_currency(selectors: &SiteSelectors, ctx: &PageContext<'_>) -> String {
    if let Some(currency) = ctx.structured.as_ref().and_then(StructuredProduct::currency) {
        return currency.to_ascii_uppercase();
    }
    dom_text(ctx.page, selectors.price)
        .await
        .as_deref()
        .and_then(currency_from_text)
        .unwrap_or(DEFAULT_CURRENCY)
        .to_owned()
}

/// Best load target of an image carrier: `src`, else the widest `srcset`
/// candidate, else a `data-src` style attribute.
#[must_use]
pub fn image_source(element: &ElementSnapshot) -> Option<&str> {
    if let Some(src) = element.non_empty_attr("src").filter(|s| !is_placeholder_src(s)) {
        return Some(src);
    }
    if let Some(candidate) = element
        .attr("srcset")
        .and_then(largest_srcset_candidate)
        .filter(|s| !is_placeholder_src(s))
    {
        return Some(candidate);
    }
    element
        .non_empty_attr("data-src")
        .filter(|s| !is_placeholder_src(s))
}

/// Gallery images from the DOM, falling back to the structured block.
/// URLs are absolutized and de-duplicated.
pub async fn default_images(selectors: &SiteSelectors, ctx: &PageContext<'_>) -> Vec<String> {
    let base = ctx.page.current_url().await;
    let from_dom: Vec<String> = ctx
        .page
        .query_all(selectors.images)
        .await
        .iter()
        .filter_map(image_source)
        .filter_map(|src| absolutize(&base, src))
        .collect();
    if !from_dom.is_empty() {
        log_source("images", FieldSource::LiveDom);
        return dedupe_preserving_order(from_dom);
    }

    let from_structured: Vec<String> = ctx
        .structured
        .iter()
        .flat_map(|s| s.images.iter())
        .filter_map(|src| absolutize(&base, src))
        .collect();
    if !from_structured.is_empty() {
        log_source("images", FieldSource::StructuredData);
    }
    dedupe_preserving_order(from_structured)
}
