//! Reading selectable controls (color swatches, size buttons) from the page.

use crate::page::{ElementSnapshot, PageHandle};

/// How a site marks up one group of selectable options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionSelectors {
    /// Selector matching every option control of the group.
    pub options: &'static str,
    /// Attribute holding the option's value; the element text when `None`.
    pub value_attr: Option<&'static str>,
    /// Attribute holding a machine code for the option (e.g. a color code).
    pub code_attr: Option<&'static str>,
    /// Attribute holding the option's own URL (full-reload sites).
    pub href_attr: Option<&'static str>,
    /// Class set on the currently selected option.
    pub selected_class: &'static str,
    /// Classes marking an option as unavailable (sold out, disabled).
    pub disabled_classes: &'static [&'static str],
}

impl OptionSelectors {
    /// A group whose value is the element text, with common class names.
    #[must_use]
    pub const fn text(options: &'static str) -> Self {
        Self {
            options,
            value_attr: None,
            code_attr: None,
            href_attr: None,
            selected_class: "is-selected",
            disabled_classes: &["is-disabled", "is-sold-out", "out-of-stock"],
        }
    }
}

/// One option control as currently rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOption {
    pub element: ElementSnapshot,
    pub value: String,
    pub code: Option<String>,
    pub href: Option<String>,
    pub selected: bool,
    pub enabled: bool,
}

/// Reads every option of a group in page order. Options with no value are
/// ignored; disabled options are returned with `enabled == false`.
pub async fn read_options(page: &dyn PageHandle, selectors: &OptionSelectors) -> Vec<PageOption> {
    page.query_all(selectors.options)
        .await
        .into_iter()
        .filter_map(|element| to_option(element, selectors))
        .collect()
}

fn to_option(element: ElementSnapshot, selectors: &OptionSelectors) -> Option<PageOption> {
    let value = selectors
        .value_attr
        .and_then(|attr| element.non_empty_attr(attr))
        .map_or_else(|| element.text.trim().to_owned(), str::to_owned);
    if value.is_empty() {
        return None;
    }

    let code = selectors
        .code_attr
        .and_then(|attr| element.non_empty_attr(attr))
        .map(str::to_owned);
    let href = selectors
        .href_attr
        .and_then(|attr| element.non_empty_attr(attr))
        .map(str::to_owned);
    let selected = element.has_class(selectors.selected_class) || element.is_marked_selected();
    let enabled = !element.is_disabled()
        && !selectors
            .disabled_classes
            .iter()
            .any(|class| element.has_class(class));

    Some(PageOption {
        element,
        value,
        code,
        href,
        selected,
        enabled,
    })
}

/// Values of the enabled options, in page order.
#[must_use]
pub fn enabled_values(options: &[PageOption]) -> Vec<String> {
    options
        .iter()
        .filter(|o| o.enabled)
        .map(|o| o.value.clone())
        .collect()
}
