//! Victoria's Secret: band × cup size grid, item number printed in the details list.

use std::sync::Arc;

use async_trait::async_trait;
use prodex_core::{
    CapabilityFlags, ColorObservation, LazyImageSettings, NavigationStyle, StructuredDataMode,
};

use crate::options::OptionSelectors;
use crate::parser::{MatrixSelectors, PageContext, Parser, SiteSelectors};
use crate::registry::SiteRegistration;

pub const SITE_ID: &str = "victoriassecret";

const SIZE_BUTTON: OptionSelectors = OptionSelectors {
    options: "",
    value_attr: Some("data-value"),
    code_attr: None,
    href_attr: None,
    selected_class: "is-selected",
    disabled_classes: &["is-unavailable", "is-disabled"],
};

const SELECTORS: SiteSelectors = SiteSelectors {
    product_marker: "[data-testid=ProductInfo]",
    name: "h1[data-testid=ProductInfo-shortDescription]",
    price: "[data-testid=ProductPrice]",
    description: Some("[data-testid=ProductDescription]"),
    composition: Some("[data-testid=ProductFabric]"),
    images: "[data-testid=ProductImages] img",
    colors: Some(OptionSelectors {
        options: "[data-testid=ColorSwatches] button",
        value_attr: Some("aria-label"),
        code_attr: Some("data-color-code"),
        href_attr: None,
        selected_class: "is-selected",
        disabled_classes: &["is-unavailable"],
    }),
    sizes: None,
    size_matrix: Some(MatrixSelectors {
        primary_type: "band",
        secondary_type: "cup",
        primary: OptionSelectors {
            options: "[data-testid=BandSizes] button",
            ..SIZE_BUTTON
        },
        secondary: OptionSelectors {
            options: "[data-testid=CupSizes] button",
            ..SIZE_BUTTON
        },
    }),
    labelled_fields: Some("[data-testid=ProductDetails] li"),
    sku_labels: &["Item No.", "Style #", "Item #"],
    url_sku_pattern: None,
};

const BREADCRUMBS: &str = "[data-testid=Breadcrumbs] li";

#[must_use]
pub fn default_capabilities() -> CapabilityFlags {
    CapabilityFlags {
        structured_data: StructuredDataMode::Poll { timeout_ms: 3_000 },
        navigation: NavigationStyle::ClientSide,
        color_observation: ColorObservation::SelectedMarker,
        multi_color: true,
        multi_size: false,
        lazy_images: LazyImageSettings::default(),
        route_settle_delay_ms: 0,
    }
}

#[must_use]
pub fn registration() -> SiteRegistration {
    SiteRegistration {
        id: SITE_ID.to_owned(),
        name: "Victoria's Secret".to_owned(),
        domain: "victoriassecret.com".to_owned(),
        capabilities: default_capabilities(),
        factory: Arc::new(|flags: &CapabilityFlags| {
            Ok(Box::new(VictoriasSecretParser::new(*flags)) as Box<dyn Parser>)
        }),
    }
}

pub struct VictoriasSecretParser {
    flags: CapabilityFlags,
}

impl VictoriasSecretParser {
    #[must_use]
    pub fn new(flags: CapabilityFlags) -> Self {
        Self { flags }
    }
}

#[async_trait]
impl Parser for VictoriasSecretParser {
    fn site_id(&self) -> &str {
        SITE_ID
    }

    fn capabilities(&self) -> &CapabilityFlags {
        &self.flags
    }

    fn selectors(&self) -> &SiteSelectors {
        &SELECTORS
    }

    /// Category is the last breadcrumb before the product itself.
    async fn extract_item(&self, ctx: &PageContext<'_>) -> Option<String> {
        let crumbs = ctx.page.query_all(BREADCRUMBS).await;
        let category = crumbs
            .iter()
            .rev()
            .nth(1)
            .map(|c| c.text.clone())
            .filter(|t| !t.is_empty());
        category.or_else(|| ctx.structured.as_ref().and_then(|s| s.category.clone()))
    }
}
