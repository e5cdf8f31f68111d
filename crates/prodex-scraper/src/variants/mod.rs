//! Variant enumeration: drives the page through every selectable color and
//! reads each one.
//!
//! Enumeration is strictly sequential. A color whose switch cannot be
//! confirmed is skipped with a warning; it never aborts the others.

mod fingerprint;
mod matrix;

use std::time::Duration;

use prodex_core::{Availability, ColorObservation, NavigationStyle, SizeSelection};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::error::PageError;
use crate::fields::absolutize;
use crate::lazy_images::{LazyImageLoader, LazyLoadConfig};
use crate::options::PageOption;
use crate::page::PageHandle;
use crate::parser::{PageContext, Parser, SizeLayout};
use crate::poll::poll_until;
use crate::structured::{load_structured_data, read_structured_data};

pub use fingerprint::region_fingerprint;
pub use matrix::{build_size_matrix, SECONDARY_POLL_ATTEMPTS, SECONDARY_POLL_INTERVAL};

pub const SWITCH_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const SWITCH_TIMEOUT: Duration = Duration::from_secs(2);

/// Everything read from the page while one color was shown.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantCapture {
    pub color: Option<String>,
    pub color_code: Option<String>,
    /// SKU as exposed by the page for this color, if any.
    pub base_sku: Option<String>,
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub currency: String,
    pub availability: Availability,
    pub composition: Option<String>,
    pub item: Option<String>,
    pub description: String,
    pub sizes: SizeSelection,
    pub images: Vec<String>,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnumerationResult {
    /// One capture per color, in page order.
    pub captures: Vec<VariantCapture>,
    /// Colors whose switch could not be confirmed.
    pub skipped_colors: Vec<String>,
}

#[derive(Debug, Error)]
enum SwitchError {
    #[error(transparent)]
    Page(#[from] PageError),

    #[error("switch was not observed within {0:?}")]
    Unverified(Duration),
}

/// Reads the currently displayed variant.
pub async fn capture_variant<P: Parser + ?Sized>(parser: &P, ctx: &PageContext<'_>) -> VariantCapture {
    let flags = parser.capabilities();
    let page = ctx.page;

    if flags.lazy_images.enabled {
        let loader = LazyImageLoader::new(LazyLoadConfig::from_settings(&flags.lazy_images));
        loader.run(page, parser.selectors().images).await;
    }

    let sizes = match parser.size_layout() {
        SizeLayout::Matrix(selectors) => build_size_matrix(page, &selectors)
            .await
            .map_or(SizeSelection::Absent, SizeSelection::Matrix),
        SizeLayout::Flat(_) => SizeSelection::from_flat(parser.extract_sizes(ctx).await),
        SizeLayout::None => SizeSelection::Absent,
    };

    VariantCapture {
        color: parser.extract_color(ctx).await,
        color_code: parser.extract_color_code(ctx).await,
        base_sku: parser.extract_sku(ctx).await,
        name: parser.extract_name(ctx).await,
        price: parser.extract_price(ctx).await,
        currency: parser.extract_currency(ctx).await,
        availability: parser.extract_availability(ctx).await,
        composition: parser.extract_composition(ctx).await,
        item: parser.extract_item(ctx).await,
        description: parser.extract_description(ctx).await,
        sizes,
        images: parser.extract_images(ctx).await,
        url: page.current_url().await,
    }
}

fn capture_for_option(mut capture: VariantCapture, option: &PageOption) -> VariantCapture {
    if capture.color.is_none() {
        capture.color = Some(option.value.clone());
    }
    if capture.color_code.is_none() {
        capture.color_code.clone_from(&option.code);
    }
    capture
}

/// Captures every enabled color, then re-selects the color that was shown
/// when enumeration started.
///
/// With no enabled color controls the current page is the only variant. When
/// no control is marked selected, the first enabled one is taken as current.
/// A page that opens on an unavailable color contributes no capture of its
/// own; every enabled color is visited and the unavailable one is re-selected
/// at the end.
pub async fn enumerate_variants<P: Parser + ?Sized>(
    parser: &P,
    ctx: &mut PageContext<'_>,
) -> EnumerationResult {
    let page = ctx.page;
    let site = parser.site_id();
    let mut result = EnumerationResult::default();

    let options: Vec<PageOption> = if parser.capabilities().multi_color {
        parser.color_options(page).await
    } else {
        Vec::new()
    };
    for option in options.iter().filter(|o| !o.enabled) {
        tracing::debug!(site, color = %option.value, "skipping unavailable color");
    }

    let Some(first_enabled) = options.iter().position(|o| o.enabled) else {
        result.captures.push(capture_variant(parser, ctx).await);
        return result;
    };

    let original = options.iter().position(|o| o.selected).unwrap_or(first_enabled);
    let original_url = page.current_url().await;

    let mut captures: Vec<(usize, VariantCapture)> = Vec::with_capacity(options.len());
    if options[original].enabled {
        let first = capture_variant(parser, ctx).await;
        captures.push((original, capture_for_option(first, &options[original])));
    }

    let mut shown = original;
    for (index, option) in options.iter().enumerate() {
        if index == original || !option.enabled {
            continue;
        }
        match switch_color(parser, ctx, option).await {
            Ok(()) => {
                shown = index;
                let capture = capture_variant(parser, ctx).await;
                captures.push((index, capture_for_option(capture, option)));
            }
            Err(e) => {
                tracing::warn!(site, color = %option.value, error = %e, "color skipped");
                result.skipped_colors.push(option.value.clone());
            }
        }
    }

    if shown != original {
        restore_color(parser, ctx, &options[original], &original_url).await;
    }

    captures.sort_by_key(|(index, _)| *index);
    result.captures = captures.into_iter().map(|(_, c)| c).collect();
    result
}

async fn switch_color<P: Parser + ?Sized>(
    parser: &P,
    ctx: &mut PageContext<'_>,
    option: &PageOption,
) -> Result<(), SwitchError> {
    let flags = *parser.capabilities();
    let page = ctx.page;
    let regions = parser.selectors().variant_regions();
    let before_url = page.current_url().await;
    let before_fingerprint = region_fingerprint(page, &regions).await;

    let target = option
        .href
        .as_deref()
        .and_then(|href| absolutize(&before_url, href));
    match (flags.navigation, target) {
        (NavigationStyle::FullReload, Some(url)) => page.navigate(&url).await?,
        _ => page.click(&option.element.handle).await?,
    }

    let observed = poll_until(SWITCH_POLL_INTERVAL, SWITCH_TIMEOUT, || {
        observe_switch(
            parser,
            page,
            flags.color_observation,
            option,
            &before_url,
            &before_fingerprint,
            &regions,
        )
    })
    .await;
    if observed.is_none() {
        return Err(SwitchError::Unverified(SWITCH_TIMEOUT));
    }

    match flags.navigation {
        NavigationStyle::FullReload => {
            ctx.structured = load_structured_data(page, flags.structured_data).await;
        }
        NavigationStyle::ClientSide => {
            if flags.route_settle_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(flags.route_settle_delay_ms)).await;
            }
            if let Some(structured) = read_structured_data(page).await {
                ctx.structured = Some(structured);
            }
        }
    }
    Ok(())
}

async fn observe_switch<P: Parser + ?Sized>(
    parser: &P,
    page: &dyn PageHandle,
    strategy: ColorObservation,
    option: &PageOption,
    before_url: &str,
    before_fingerprint: &str,
    regions: &[&str],
) -> Option<()> {
    let switched = match strategy {
        ColorObservation::RegionChange => {
            region_fingerprint(page, regions).await != before_fingerprint
        }
        ColorObservation::SelectedMarker => parser
            .color_options(page)
            .await
            .iter()
            .any(|o| o.element.handle == option.element.handle && o.selected),
        ColorObservation::UrlChange => page.current_url().await != before_url,
    };
    switched.then_some(())
}

/// Best effort: failures are logged only.
async fn restore_color<P: Parser + ?Sized>(
    parser: &P,
    ctx: &mut PageContext<'_>,
    option: &PageOption,
    original_url: &str,
) {
    let flags = parser.capabilities();
    let page = ctx.page;
    let result = match flags.navigation {
        NavigationStyle::FullReload => page.navigate(original_url).await,
        NavigationStyle::ClientSide => page.click(&option.element.handle).await,
    };
    if let Err(e) = result {
        tracing::warn!(site = parser.site_id(), color = %option.value, error = %e, "could not restore original color");
        return;
    }
    if flags.navigation == NavigationStyle::FullReload {
        ctx.structured = read_structured_data(page).await;
    }
}

#[cfg(test)]
#[path = "variants_test.rs"]
mod tests;
