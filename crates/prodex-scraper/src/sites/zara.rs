//! Zara: client-side color routing, lazily loaded media gallery.

use std::sync::Arc;

use async_trait::async_trait;
use prodex_core::{
    CapabilityFlags, ColorObservation, LazyImageSettings, NavigationStyle, StructuredDataMode,
};

use crate::options::OptionSelectors;
use crate::parser::{PageContext, Parser, SiteSelectors};
use crate::registry::SiteRegistration;

pub const SITE_ID: &str = "zara";

const SELECTORS: SiteSelectors = SiteSelectors {
    product_marker: ".product-detail-view",
    name: "h1.product-detail-info__header-name",
    price: ".product-detail-info__price .money-amount__main",
    description: Some(".product-detail-description"),
    composition: None,
    images: ".product-detail-images img.media-image__image",
    colors: Some(OptionSelectors {
        options: ".product-detail-color-selector__color-button",
        value_attr: Some("aria-label"),
        code_attr: Some("data-color-code"),
        href_attr: None,
        selected_class: "product-detail-color-selector__color-button--is-selected",
        disabled_classes: &["product-detail-color-selector__color-button--is-disabled"],
    }),
    sizes: Some(OptionSelectors {
        options: ".size-selector-list__item",
        value_attr: Some("data-size"),
        code_attr: None,
        href_attr: None,
        selected_class: "size-selector-list__item--is-selected",
        disabled_classes: &[
            "size-selector-list__item--is-disabled",
            "size-selector-list__item--out-of-stock",
        ],
    }),
    size_matrix: None,
    labelled_fields: Some(".product-detail-info__reference"),
    sku_labels: &["Ref."],
    url_sku_pattern: None,
};

/// `"Ecru | 4387/251"`: color name, then the reference whose last part is the color code.
const EXTENDED_COLOR: &str = ".product-color-extended-name";
const COMPOSITION_PARTS: &str = ".product-detail-composition li";

#[must_use]
pub fn default_capabilities() -> CapabilityFlags {
    CapabilityFlags {
        structured_data: StructuredDataMode::Poll { timeout_ms: 5_000 },
        navigation: NavigationStyle::ClientSide,
        color_observation: ColorObservation::RegionChange,
        multi_color: true,
        multi_size: false,
        lazy_images: LazyImageSettings {
            enabled: true,
            threshold: 0.4,
        },
        route_settle_delay_ms: 0,
    }
}

#[must_use]
pub fn registration() -> SiteRegistration {
    SiteRegistration {
        id: SITE_ID.to_owned(),
        name: "Zara".to_owned(),
        domain: "zara.com".to_owned(),
        capabilities: default_capabilities(),
        factory: Arc::new(|flags: &CapabilityFlags| Ok(Box::new(ZaraParser::new(*flags)) as Box<dyn Parser>)),
    }
}

pub struct ZaraParser {
    flags: CapabilityFlags,
}

impl ZaraParser {
    #[must_use]
    pub fn new(flags: CapabilityFlags) -> Self {
        Self { flags }
    }
}

/// Splits `"Ecru | 4387/251"` into `("Ecru", Some("251"))`.
fn split_extended_color(text: &str) -> (Option<&str>, Option<&str>) {
    let mut parts = text.splitn(2, '|');
    let name = parts.next().map(str::trim).filter(|s| !s.is_empty());
    let code = parts
        .next()
        .and_then(|reference| reference.trim().rsplit('/').next())
        .map(str::trim)
        .filter(|s| !s.is_empty());
    (name, code)
}

#[async_trait]
impl Parser for ZaraParser {
    fn site_id(&self) -> &str {
        SITE_ID
    }

    fn capabilities(&self) -> &CapabilityFlags {
        &self.flags
    }

    fn selectors(&self) -> &SiteSelectors {
        &SELECTORS
    }

    async fn extract_color(&self, ctx: &PageContext<'_>) -> Option<String> {
        if let Some(el) = ctx.page.query_one(EXTENDED_COLOR).await {
            if let (Some(name), _) = split_extended_color(&el.text) {
                return Some(name.to_owned());
            }
        }
        if let Some(option) = self.selected_color(ctx.page).await {
            return Some(option.value);
        }
        ctx.structured.as_ref().and_then(|s| s.color.clone())
    }

    async fn extract_color_code(&self, ctx: &PageContext<'_>) -> Option<String> {
        if let Some(el) = ctx.page.query_one(EXTENDED_COLOR).await {
            if let (_, Some(code)) = split_extended_color(&el.text) {
                return Some(code.to_owned());
            }
        }
        self.selected_color(ctx.page).await.and_then(|o| o.code)
    }

    async fn extract_composition(&self, ctx: &PageContext<'_>) -> Option<String> {
        let parts: Vec<String> = ctx
            .page
            .query_all(COMPOSITION_PARTS)
            .await
            .into_iter()
            .map(|e| e.text)
            .filter(|t| !t.is_empty())
            .collect();
        if parts.is_empty() {
            ctx.structured.as_ref().and_then(|s| s.material.clone())
        } else {
            Some(parts.join(", "))
        }
    }
}
