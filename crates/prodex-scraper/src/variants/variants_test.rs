use super::*;
use crate::options::OptionSelectors;
use crate::page::SnapshotPage;
use crate::parser::SiteSelectors;
use async_trait::async_trait;
use prodex_core::{CapabilityFlags, StructuredDataMode};

struct Fixture {
    flags: CapabilityFlags,
    selectors: SiteSelectors,
}

#[async_trait]
impl Parser for Fixture {
    fn site_id(&self) -> &str {
        "fixture"
    }
    fn capabilities(&self) -> &CapabilityFlags {
        &self.flags
    }
    fn selectors(&self) -> &SiteSelectors {
        &self.selectors
    }
}

const SELECTORS: SiteSelectors = SiteSelectors {
    product_marker: ".pdp",
    name: "h1",
    price: ".price",
    description: None,
    composition: None,
    images: ".gallery img",
    colors: Some(OptionSelectors {
        code_attr: Some("data-code"),
        href_attr: Some("href"),
        ..OptionSelectors::text("a.swatch")
    }),
    sizes: Some(OptionSelectors::text("button.size")),
    size_matrix: None,
    labelled_fields: None,
    sku_labels: &[],
    url_sku_pattern: None,
};

fn fixture(navigation: NavigationStyle, observation: ColorObservation) -> Fixture {
    Fixture {
        flags: CapabilityFlags {
            structured_data: StructuredDataMode::Absent,
            navigation,
            color_observation: observation,
            ..CapabilityFlags::default()
        },
        selectors: SELECTORS,
    }
}

const COLORS: [(&str, &str); 3] = [("Black", "800"), ("Ecru", "251"), ("Navy", "401")];

/// One product document showing `selected`, with `sold_out` colors marked.
fn document(selected: Option<usize>, sold_out: &[usize]) -> String {
    let swatches: String = COLORS
        .iter()
        .enumerate()
        .map(|(i, (name, code))| {
            let mut class = String::from("swatch");
            if Some(i) == selected {
                class.push_str(" is-selected");
            }
            if sold_out.contains(&i) {
                class.push_str(" is-sold-out");
            }
            format!(
                r#"<a id="color-{i}" class="{class}" data-code="{code}" href="/p/shirt-{code}">{name}</a>"#
            )
        })
        .collect();
    let shown = selected.unwrap_or(0);
    format!(
        r#"<div class="pdp"><h1>Shirt</h1><p class="price">29,95 EUR</p>{swatches}
           <button class="size">S</button><button class="size">M</button>
           <div class="gallery"><img src="https://cdn.example.com/{shown}/1.jpg"></div></div>"#
    )
}

fn client_side_page(sold_out: &[usize]) -> SnapshotPage {
    let mut builder = SnapshotPage::builder("https://shop.example.com/p/shirt");
    for i in 0..COLORS.len() {
        builder = builder
            .state(format!("color-{i}"), document(Some(i), sold_out))
            .on_click(format!("color-{i}"), format!("color-{i}"));
    }
    builder.build()
}

#[tokio::test(start_paused = true)]
async fn enumerates_enabled_colors_in_page_order_and_restores() {
    let page = client_side_page(&[]);
    let parser = fixture(NavigationStyle::ClientSide, ColorObservation::RegionChange);
    let mut ctx = PageContext::new(&page, None);

    let result = enumerate_variants(&parser, &mut ctx).await;

    let colors: Vec<_> = result.captures.iter().map(|c| c.color.as_deref()).collect();
    assert_eq!(colors, vec![Some("Black"), Some("Ecru"), Some("Navy")]);
    assert_eq!(result.captures[1].color_code.as_deref(), Some("251"));
    assert_eq!(
        result.captures[2].images,
        vec!["https://cdn.example.com/2/1.jpg"]
    );
    assert!(result.skipped_colors.is_empty());
    assert_eq!(page.current_state(), "color-0");
}

#[tokio::test(start_paused = true)]
async fn sold_out_colors_are_not_visited() {
    let page = client_side_page(&[1]);
    let parser = fixture(NavigationStyle::ClientSide, ColorObservation::SelectedMarker);
    let mut ctx = PageContext::new(&page, None);

    let result = enumerate_variants(&parser, &mut ctx).await;

    assert_eq!(result.captures.len(), 2);
    assert!(!page.clicked_ids().contains(&"color-1".to_string()));
}

#[tokio::test(start_paused = true)]
async fn opening_on_sold_out_color_visits_every_enabled_color() {
    let mut builder = SnapshotPage::builder("https://shop.example.com/p/shirt")
        .state("color-1", document(Some(1), &[1]))
        .on_click("color-1", "color-1");
    for i in [0, 2] {
        builder = builder
            .state(format!("color-{i}"), document(Some(i), &[1]))
            .on_click(format!("color-{i}"), format!("color-{i}"));
    }
    let page = builder.build();
    let parser = fixture(NavigationStyle::ClientSide, ColorObservation::SelectedMarker);
    let mut ctx = PageContext::new(&page, None);

    let result = enumerate_variants(&parser, &mut ctx).await;

    let colors: Vec<_> = result.captures.iter().map(|c| c.color.as_deref()).collect();
    assert_eq!(colors, vec![Some("Black"), Some("Navy")]);
    assert_eq!(
        page.clicked_ids(),
        vec!["color-0".to_string(), "color-2".to_string(), "color-1".to_string()]
    );
    assert_eq!(page.current_state(), "color-1");
}

#[tokio::test(start_paused = true)]
async fn unconfirmed_switch_skips_only_that_color() {
    // Clicking Ecru does nothing, so its switch can never be observed.
    let page = SnapshotPage::builder("https://shop.example.com/p/shirt")
        .state("color-0", document(Some(0), &[]))
        .state("color-2", document(Some(2), &[]))
        .on_click("color-0", "color-0")
        .on_click("color-2", "color-2")
        .build();
    let parser = fixture(NavigationStyle::ClientSide, ColorObservation::RegionChange);
    let mut ctx = PageContext::new(&page, None);

    let started = tokio::time::Instant::now();
    let result = enumerate_variants(&parser, &mut ctx).await;

    assert_eq!(result.skipped_colors, vec!["Ecru"]);
    let colors: Vec<_> = result.captures.iter().map(|c| c.color.as_deref()).collect();
    assert_eq!(colors, vec![Some("Black"), Some("Navy")]);
    assert!(started.elapsed() >= SWITCH_TIMEOUT);
}

#[tokio::test(start_paused = true)]
async fn full_reload_navigates_to_swatch_href() {
    let base = "https://shop.example.com/p/shirt-800";
    let mut builder = SnapshotPage::builder(base).state("color-0", document(Some(0), &[]));
    for (i, (_, code)) in COLORS.iter().enumerate().skip(1) {
        builder = builder
            .state(format!("color-{i}"), document(Some(i), &[]))
            .route(
                format!("https://shop.example.com/p/shirt-{code}"),
                format!("color-{i}"),
            );
    }
    let page = builder.build();
    let parser = fixture(NavigationStyle::FullReload, ColorObservation::UrlChange);
    let mut ctx = PageContext::new(&page, None);

    let result = enumerate_variants(&parser, &mut ctx).await;

    let urls: Vec<_> = result.captures.iter().map(|c| c.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://shop.example.com/p/shirt-800",
            "https://shop.example.com/p/shirt-251",
            "https://shop.example.com/p/shirt-401",
        ]
    );
    assert!(page.clicked_ids().is_empty());
    assert_eq!(page.current_url().await, base);
}

#[tokio::test(start_paused = true)]
async fn unmarked_selection_treats_first_color_as_current() {
    let page = SnapshotPage::builder("https://shop.example.com/p/shirt")
        .state("none", document(None, &[]))
        .state("color-1", document(Some(1), &[]))
        .state("color-2", document(Some(2), &[]))
        .on_click("color-1", "color-1")
        .on_click("color-2", "color-2")
        .build();
    let parser = fixture(NavigationStyle::ClientSide, ColorObservation::RegionChange);
    let mut ctx = PageContext::new(&page, None);

    let result = enumerate_variants(&parser, &mut ctx).await;

    assert_eq!(result.captures.len(), 3);
    assert_eq!(result.captures[0].color.as_deref(), Some("Black"));
    assert_eq!(
        page.clicked_ids(),
        vec!["color-1".to_string(), "color-2".to_string(), "color-0".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn single_color_flag_captures_current_page_only() {
    let page = client_side_page(&[]);
    let mut parser = fixture(NavigationStyle::ClientSide, ColorObservation::RegionChange);
    parser.flags.multi_color = false;
    let mut ctx = PageContext::new(&page, None);

    let result = enumerate_variants(&parser, &mut ctx).await;

    assert_eq!(result.captures.len(), 1);
    assert_eq!(
        result.captures[0].sizes,
        SizeSelection::Flat(vec!["S".into(), "M".into()])
    );
    assert!(page.clicked_ids().is_empty());
}
