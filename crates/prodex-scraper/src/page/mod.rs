//! Host page abstraction.
//!
//! Everything the extractor knows about a product page goes through
//! [`PageHandle`]: selector queries that return detached snapshots, and
//! simulated input (click, navigate, scroll). Adapters never hold live
//! element references; an [`ElementHandle`] is re-resolved on every use, so a
//! re-rendered page yields [`PageError::ElementNotFound`] instead of acting on
//! a stale node.

mod snapshot;

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::PageError;

pub use snapshot::{SnapshotPage, SnapshotPageBuilder};

/// Re-resolvable reference to the `index`-th match of `selector`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle {
    pub selector: String,
    pub index: usize,
}

/// Detached copy of an element at query time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSnapshot {
    pub handle: ElementHandle,
    /// Lower-case tag name.
    pub tag: String,
    /// Descendant text with whitespace runs collapsed.
    pub text: String,
    pub attributes: BTreeMap<String, String>,
}

impl ElementSnapshot {
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Attribute value with surrounding whitespace removed; empty counts as absent.
    #[must_use]
    pub fn non_empty_attr(&self, name: &str) -> Option<&str> {
        self.attr(name).map(str::trim).filter(|v| !v.is_empty())
    }

    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    fn attr_is_true(&self, name: &str) -> bool {
        self.attr(name).is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }

    /// `disabled` attribute or `aria-disabled="true"`.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.attributes.contains_key("disabled") || self.attr_is_true("aria-disabled")
    }

    /// Any of the ARIA / form selection markers.
    #[must_use]
    pub fn is_marked_selected(&self) -> bool {
        self.attr_is_true("aria-checked")
            || self.attr_is_true("aria-selected")
            || self.attr_is_true("aria-pressed")
            || self.attr_is_true("aria-current")
            || self.attributes.contains_key("checked")
            || self.attributes.contains_key("selected")
    }
}

/// A live, mutable rendered page.
///
/// Implementations must be cheap to query repeatedly; the extractor polls.
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// URL of the document currently displayed.
    async fn current_url(&self) -> String;

    /// All elements matching a CSS selector, in document order.
    ///
    /// An invalid selector or no match yields an empty list.
    async fn query_all(&self, selector: &str) -> Vec<ElementSnapshot>;

    async fn query_one(&self, selector: &str) -> Option<ElementSnapshot> {
        self.query_all(selector).await.into_iter().next()
    }

    /// Simulates a user click on the element.
    async fn click(&self, element: &ElementHandle) -> Result<(), PageError>;

    /// Loads another document in place of the current one.
    async fn navigate(&self, url: &str) -> Result<(), PageError>;

    async fn scroll_to(&self, y: f64);

    async fn scroll_position(&self) -> f64;

    /// Total scrollable height of the document.
    async fn scroll_height(&self) -> f64;
}
