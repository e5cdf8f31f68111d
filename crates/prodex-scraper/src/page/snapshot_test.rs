use super::*;

const RED: &str = r#"<html><body>
  <ul class="swatches">
    <li><button id="swatch-red" class="swatch is-selected">Red</button></li>
    <li><button id="swatch-blue" class="swatch">Blue</button></li>
  </ul>
  <p class="price">  29,95   EUR </p>
</body></html>"#;

const BLUE: &str = r#"<html><body>
  <ul class="swatches">
    <li><button id="swatch-red" class="swatch">Red</button></li>
    <li><button id="swatch-blue" class="swatch is-selected">Blue</button></li>
  </ul>
  <p class="price">31,95 EUR</p>
</body></html>"#;

fn two_color_page() -> SnapshotPage {
    SnapshotPage::builder("https://shop.example.com/p/1")
        .state("red", RED)
        .state_with_url("blue", "https://shop.example.com/p/1?c=blue", BLUE)
        .on_click("swatch-blue", "blue")
        .on_click("swatch-red", "red")
        .build()
}

#[tokio::test]
async fn query_all_returns_snapshots_in_document_order() {
    let page = two_color_page();
    let swatches = page.query_all("button.swatch").await;
    assert_eq!(swatches.len(), 2);
    assert_eq!(swatches[0].text, "Red");
    assert_eq!(swatches[1].handle.index, 1);
    assert!(swatches[0].has_class("is-selected"));
}

#[tokio::test]
async fn text_is_whitespace_collapsed() {
    let page = two_color_page();
    let price = page.query_one(".price").await.unwrap();
    assert_eq!(price.text, "29,95 EUR");
}

#[tokio::test]
async fn click_switches_state_and_route_url() {
    let page = two_color_page();
    let blue = page.query_all("button.swatch").await.remove(1);
    page.click(&blue.handle).await.unwrap();

    assert_eq!(page.current_state(), "blue");
    assert_eq!(page.current_url().await, "https://shop.example.com/p/1?c=blue");
    assert_eq!(page.clicked_ids(), vec!["swatch-blue".to_string()]);
    let price = page.query_one(".price").await.unwrap();
    assert_eq!(price.text, "31,95 EUR");
}

#[tokio::test]
async fn click_on_vanished_element_is_an_error() {
    let page = two_color_page();
    let handle = ElementHandle {
        selector: "button.swatch".to_string(),
        index: 7,
    };
    let err = page.click(&handle).await.unwrap_err();
    assert!(matches!(err, PageError::ElementNotFound { index: 7, .. }));
}

#[tokio::test]
async fn invalid_selector_yields_no_elements() {
    let page = two_color_page();
    assert!(page.query_all("button[[").await.is_empty());
}

#[tokio::test]
async fn navigate_to_unknown_url_is_an_error() {
    let page = two_color_page();
    let err = page
        .navigate("https://shop.example.com/elsewhere")
        .await
        .unwrap_err();
    assert!(matches!(err, PageError::UnknownUrl { .. }));
}

#[tokio::test]
async fn navigate_to_initial_url_is_always_routed() {
    let page = two_color_page();
    let blue = page.query_all("button.swatch").await.remove(1);
    page.click(&blue.handle).await.unwrap();
    page.navigate("https://shop.example.com/p/1").await.unwrap();
    assert_eq!(page.current_state(), "red");
}

#[tokio::test]
async fn lazy_plan_swaps_state_after_enough_scrolls() {
    let page = SnapshotPage::builder("https://shop.example.com/p/2")
        .state("placeholder", r#"<img src="">"#)
        .state("loaded", r#"<img src="https://cdn.example.com/1.jpg">"#)
        .lazy_load("placeholder", "loaded", 2)
        .scroll_height(1_000.0)
        .build();

    page.scroll_to(5_000.0).await;
    assert_eq!(page.current_state(), "placeholder");
    assert!((page.scroll_position().await - 1_000.0).abs() < f64::EPSILON);

    page.scroll_to(0.0).await;
    assert_eq!(page.current_state(), "loaded");
}
