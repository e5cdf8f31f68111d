//! Declarative per-site switches.
//!
//! Shared extraction logic branches on these flags instead of on site ids.
//! Every adapter ships a built-in [`CapabilityFlags`]; deployments can patch
//! individual flags through `config/sites.yaml` (see [`crate::sites`]) without
//! touching adapter code.

use serde::{Deserialize, Serialize};

/// How the structured-data (JSON-LD) block is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum StructuredDataMode {
    /// Poll until a `Product` block appears or `timeout_ms` elapses.
    Poll { timeout_ms: u64 },
    /// Read once; the block is server-rendered.
    Immediate,
    /// The site never embeds a usable block.
    Absent,
}

/// What selecting a color does to the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationStyle {
    /// Each color is a separate document; the swatch carries an `href`.
    FullReload,
    /// The swatch is handled by the client-side router in place.
    ClientSide,
}

/// How a color switch is confirmed before the page is read again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorObservation {
    /// The size and image regions no longer look like they did before the click.
    RegionChange,
    /// The clicked swatch carries the site's selected marker.
    SelectedMarker,
    /// The document URL changed.
    UrlChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LazyImageSettings {
    /// Run the scroll-driven loader before reading images.
    pub enabled: bool,
    /// Fraction of empty image slots above which scrolling is triggered.
    pub threshold: f64,
}

impl Default for LazyImageSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: 0.4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapabilityFlags {
    pub structured_data: StructuredDataMode,
    pub navigation: NavigationStyle,
    pub color_observation: ColorObservation,
    /// The page exposes a color selector worth enumerating.
    pub multi_color: bool,
    /// Emit one record per size instead of one record per color.
    pub multi_size: bool,
    pub lazy_images: LazyImageSettings,
    /// Fixed wait after a client-side route change before the page is read.
    pub route_settle_delay_ms: u64,
}

impl Default for CapabilityFlags {
    fn default() -> Self {
        Self {
            structured_data: StructuredDataMode::Poll { timeout_ms: 3_000 },
            navigation: NavigationStyle::ClientSide,
            color_observation: ColorObservation::RegionChange,
            multi_color: true,
            multi_size: false,
            lazy_images: LazyImageSettings::default(),
            route_settle_delay_ms: 0,
        }
    }
}

impl CapabilityFlags {
    /// Returns a copy with every field set in `overrides` replaced.
    #[must_use]
    pub fn with_overrides(mut self, overrides: &CapabilityOverrides) -> Self {
        if let Some(mode) = overrides.structured_data {
            self.structured_data = mode;
        }
        if let Some(navigation) = overrides.navigation {
            self.navigation = navigation;
        }
        if let Some(observation) = overrides.color_observation {
            self.color_observation = observation;
        }
        if let Some(multi_color) = overrides.multi_color {
            self.multi_color = multi_color;
        }
        if let Some(multi_size) = overrides.multi_size {
            self.multi_size = multi_size;
        }
        if let Some(enabled) = overrides.lazy_images {
            self.lazy_images.enabled = enabled;
        }
        if let Some(threshold) = overrides.lazy_image_threshold {
            self.lazy_images.threshold = threshold;
        }
        if let Some(delay) = overrides.route_settle_delay_ms {
            self.route_settle_delay_ms = delay;
        }
        self
    }

    /// Whether the variant enumerator should drive the color selector at all.
    #[must_use]
    pub fn enumerates_variants(&self) -> bool {
        self.multi_color || self.multi_size
    }
}

/// Partial [`CapabilityFlags`] as written in `config/sites.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CapabilityOverrides {
    #[serde(default)]
    pub structured_data: Option<StructuredDataMode>,
    #[serde(default)]
    pub navigation: Option<NavigationStyle>,
    #[serde(default)]
    pub color_observation: Option<ColorObservation>,
    #[serde(default)]
    pub multi_color: Option<bool>,
    #[serde(default)]
    pub multi_size: Option<bool>,
    #[serde(default)]
    pub lazy_images: Option<bool>,
    #[serde(default)]
    pub lazy_image_threshold: Option<f64>,
    #[serde(default)]
    pub route_settle_delay_ms: Option<u64>,
}
