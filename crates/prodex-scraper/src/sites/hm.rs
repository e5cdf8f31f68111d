//! H&M: one document per color, article code in the URL, one record per size.

use std::sync::Arc;

use async_trait::async_trait;
use prodex_core::{
    CapabilityFlags, ColorObservation, LazyImageSettings, NavigationStyle, StructuredDataMode,
};

use crate::fields::{log_source, sku_from_url, FieldSource};
use crate::identifier;
use crate::options::OptionSelectors;
use crate::parser::{default_sku, PageContext, Parser, SiteSelectors};
use crate::registry::SiteRegistration;

pub const SITE_ID: &str = "hm";

/// `productpage.0970819001.html`
pub const ARTICLE_URL_PATTERN: &str = r"(?i)^productpage\.(\d{7,})\.html?$";

/// Article codes are the product number followed by a three-digit color number.
const COLOR_DIGITS: usize = 3;
const ARTICLE_DIGITS: usize = 10;

const SELECTORS: SiteSelectors = SiteSelectors {
    product_marker: "#product-schema, .product-detail-main",
    name: "h1.product-item-headline",
    price: "#product-price .price-value",
    description: Some(".pdp-description-text"),
    composition: Some("#section-materialsAndSuppliersAccordion .composition"),
    images: ".product-detail-main-image-container img, figure.pdp-secondary-image img",
    colors: Some(OptionSelectors {
        options: ".product-colors a.filter-option",
        value_attr: Some("title"),
        code_attr: None,
        href_attr: Some("href"),
        selected_class: "active",
        disabled_classes: &["is-disabled"],
    }),
    sizes: Some(OptionSelectors {
        options: ".picker-list .picker-item button",
        value_attr: None,
        code_attr: None,
        href_attr: None,
        selected_class: "is-selected",
        disabled_classes: &["sold-out", "out-of-stock"],
    }),
    size_matrix: None,
    labelled_fields: Some(".product-detail-meta li"),
    sku_labels: &["Art. No.", "Article number"],
    url_sku_pattern: Some(ARTICLE_URL_PATTERN),
};

#[must_use]
pub fn default_capabilities() -> CapabilityFlags {
    CapabilityFlags {
        structured_data: StructuredDataMode::Immediate,
        navigation: NavigationStyle::FullReload,
        color_observation: ColorObservation::UrlChange,
        multi_color: true,
        multi_size: true,
        lazy_images: LazyImageSettings::default(),
        route_settle_delay_ms: 0,
    }
}

#[must_use]
pub fn registration() -> SiteRegistration {
    SiteRegistration {
        id: SITE_ID.to_owned(),
        name: "H&M".to_owned(),
        domain: "hm.com".to_owned(),
        capabilities: default_capabilities(),
        factory: Arc::new(|flags: &CapabilityFlags| Ok(Box::new(HmParser::new(*flags)) as Box<dyn Parser>)),
    }
}

pub struct HmParser {
    flags: CapabilityFlags,
}

impl HmParser {
    #[must_use]
    pub fn new(flags: CapabilityFlags) -> Self {
        Self { flags }
    }
}

fn is_article_code(code: &str) -> bool {
    code.len() == ARTICLE_DIGITS && code.bytes().all(|b| b.is_ascii_digit())
}

#[async_trait]
impl Parser for HmParser {
    fn site_id(&self) -> &str {
        SITE_ID
    }

    fn capabilities(&self) -> &CapabilityFlags {
        &self.flags
    }

    fn selectors(&self) -> &SiteSelectors {
        &SELECTORS
    }

    /// The URL names the article shown, even when the embedded block still
    /// describes the first color.
    async fn extract_sku(&self, ctx: &PageContext<'_>) -> Option<String> {
        let url = ctx.page.current_url().await;
        if let Some(article) = sku_from_url(&url, ARTICLE_URL_PATTERN) {
            log_source("sku", FieldSource::UrlPattern);
            return Some(article);
        }
        default_sku(&SELECTORS, ctx).await
    }

    async fn extract_color_code(&self, ctx: &PageContext<'_>) -> Option<String> {
        let url = ctx.page.current_url().await;
        sku_from_url(&url, ARTICLE_URL_PATTERN)
            .filter(|code| is_article_code(code))
            .map(|code| code[ARTICLE_DIGITS - COLOR_DIGITS..].to_owned())
    }

    fn unique_product_id(&self, base_sku: &str) -> String {
        if is_article_code(base_sku) {
            base_sku[..ARTICLE_DIGITS - COLOR_DIGITS].to_owned()
        } else {
            identifier::unique_product_id(base_sku)
        }
    }
}
