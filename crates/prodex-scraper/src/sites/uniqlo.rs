//! Uniqlo: client-side color routes that need a settle delay, and a gallery
//! that only renders the first few shots. The remaining shots live at
//! predictable CDN paths and are probed before being reported.

use std::sync::Arc;

use async_trait::async_trait;
use prodex_core::{
    CapabilityFlags, ColorObservation, LazyImageSettings, NavigationStyle, StructuredDataMode,
};
use regex::Regex;

use crate::fields::{dedupe_preserving_order, log_source, FieldSource};
use crate::image_probe::{filter_existing, ImageProbe};
use crate::options::OptionSelectors;
use crate::parser::{default_images, default_sku, PageContext, Parser, SiteSelectors};
use crate::registry::SiteRegistration;
use crate::sites::AdapterServices;

pub const SITE_ID: &str = "uniqlo";

pub const DEFAULT_CDN_BASE: &str = "https://image.uniqlo.com/UQ/ST3/AsianCommon/imagesgoods";

/// Additional gallery shots tried per product.
const SUB_IMAGE_COUNT: usize = 6;

/// `/products/E459565-000/00`
const PRODUCT_PATH_PATTERN: &str = r"/products/([A-Z]?\d{6}-\d{3})(?:/|$)";

const SELECTORS: SiteSelectors = SiteSelectors {
    product_marker: ".pdp-root, [data-test=product-detail]",
    name: "h1.product-name",
    price: ".product-price .fr-ec-price-text",
    description: Some(".product-description"),
    composition: Some(".product-material"),
    images: ".product-gallery img",
    colors: Some(OptionSelectors {
        options: ".color-picker .color-chip",
        value_attr: Some("data-color-name"),
        code_attr: Some("data-color-code"),
        href_attr: None,
        selected_class: "color-chip--selected",
        disabled_classes: &["color-chip--disabled"],
    }),
    sizes: Some(OptionSelectors {
        options: ".size-picker .size-chip",
        value_attr: Some("data-size"),
        code_attr: None,
        href_attr: None,
        selected_class: "size-chip--selected",
        disabled_classes: &["size-chip--disabled", "size-chip--sold-out"],
    }),
    size_matrix: None,
    labelled_fields: Some(".product-details li"),
    sku_labels: &["Product ID:", "Product ID"],
    url_sku_pattern: None,
};

#[must_use]
pub fn default_capabilities() -> CapabilityFlags {
    CapabilityFlags {
        structured_data: StructuredDataMode::Poll { timeout_ms: 4_000 },
        navigation: NavigationStyle::ClientSide,
        color_observation: ColorObservation::UrlChange,
        multi_color: true,
        multi_size: false,
        lazy_images: LazyImageSettings::default(),
        route_settle_delay_ms: 300,
    }
}

#[must_use]
pub fn registration(services: AdapterServices) -> SiteRegistration {
    SiteRegistration {
        id: SITE_ID.to_owned(),
        name: "Uniqlo".to_owned(),
        domain: "uniqlo.com".to_owned(),
        capabilities: default_capabilities(),
        factory: Arc::new(move |flags: &CapabilityFlags| {
            Ok(Box::new(UniqloParser::new(*flags, &services)) as Box<dyn Parser>)
        }),
    }
}

pub struct UniqloParser {
    flags: CapabilityFlags,
    probe: Arc<dyn ImageProbe>,
    probe_concurrency: usize,
    cdn_base: String,
}

impl UniqloParser {
    #[must_use]
    pub fn new(flags: CapabilityFlags, services: &AdapterServices) -> Self {
        Self {
            flags,
            probe: Arc::clone(&services.image_probe),
            probe_concurrency: services.probe_concurrency,
            cdn_base: DEFAULT_CDN_BASE.to_owned(),
        }
    }

    #[must_use]
    pub fn with_cdn_base(mut self, cdn_base: impl Into<String>) -> Self {
        self.cdn_base = cdn_base.into().trim_end_matches('/').to_owned();
        self
    }

    /// Main shot for the color, then the numbered sub shots.
    #[must_use]
    pub fn candidate_image_urls(&self, product_number: &str, color_code: &str) -> Vec<String> {
        let base = &self.cdn_base;
        let mut urls = vec![format!(
            "{base}/{product_number}/item/goods_{color_code}_{product_number}.jpg"
        )];
        urls.extend((1..=SUB_IMAGE_COUNT).map(|n| {
            format!("{base}/{product_number}/sub/goods_{product_number}_sub{n}.jpg")
        }));
        urls
    }
}

/// Product code from the URL path (`E459565-000`).
fn product_code_from_url(url: &str) -> Option<String> {
    let re = Regex::new(PRODUCT_PATH_PATTERN).ok()?;
    let path = url.split(['?', '#']).next().unwrap_or(url);
    re.captures(path)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_owned())
}

/// `E459565-000` -> `459565`
fn product_number(code: &str) -> String {
    code.split('-')
        .next()
        .unwrap_or(code)
        .chars()
        .filter(char::is_ascii_digit)
        .collect()
}

#[async_trait]
impl Parser for UniqloParser {
    fn site_id(&self) -> &str {
        SITE_ID
    }

    fn capabilities(&self) -> &CapabilityFlags {
        &self.flags
    }

    fn selectors(&self) -> &SiteSelectors {
        &SELECTORS
    }

    async fn extract_sku(&self, ctx: &PageContext<'_>) -> Option<String> {
        if let Some(sku) = ctx.structured.as_ref().and_then(|s| s.identifier()) {
            log_source("sku", FieldSource::StructuredData);
            return Some(sku.to_owned());
        }
        let url = ctx.page.current_url().await;
        if let Some(code) = product_code_from_url(&url) {
            log_source("sku", FieldSource::UrlPattern);
            return Some(code);
        }
        default_sku(&SELECTORS, ctx).await
    }

    async fn extract_images(&self, ctx: &PageContext<'_>) -> Vec<String> {
        let mut images = default_images(&SELECTORS, ctx).await;

        let Some(code) = self.extract_sku(ctx).await else {
            return images;
        };
        let Some(color_code) = self.extract_color_code(ctx).await else {
            return images;
        };
        let number = product_number(&code);
        if number.is_empty() {
            return images;
        }

        let candidates: Vec<String> = self
            .candidate_image_urls(&number, &color_code)
            .into_iter()
            .filter(|url| !images.contains(url))
            .collect();
        let found = filter_existing(self.probe.as_ref(), candidates, self.probe_concurrency).await;
        tracing::debug!(site = SITE_ID, found = found.len(), "probed CDN images");
        images.extend(found);
        dedupe_preserving_order(images)
    }
}
