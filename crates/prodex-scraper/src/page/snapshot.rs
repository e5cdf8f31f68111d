//! [`PageHandle`] over captured HTML documents.
//!
//! A `SnapshotPage` holds one or more named document states. Clicking an
//! element whose `id` has a registered transition switches the current state,
//! navigating to a registered URL loads its state, and a lazy-load plan swaps a
//! placeholder state for its loaded counterpart after enough scroll calls.
//! With a single state it is a plain static page (what the CLI extracts from);
//! with several it replays a captured interactive session.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};

use super::{ElementHandle, ElementSnapshot, PageHandle};
use crate::error::PageError;

const INITIAL_STATE: &str = "initial";
const DEFAULT_SCROLL_HEIGHT: f64 = 4_000.0;

#[derive(Debug, Clone)]
struct DocumentState {
    html: String,
    url: Option<String>,
}

#[derive(Debug, Clone)]
struct LazyPlan {
    loaded_state: String,
    after_scrolls: u32,
}

#[derive(Debug)]
struct PageState {
    url: String,
    current: String,
    documents: HashMap<String, DocumentState>,
    click_transitions: HashMap<String, String>,
    routes: HashMap<String, String>,
    lazy_plans: HashMap<String, LazyPlan>,
    scroll_y: f64,
    scroll_height: f64,
    scrolls_in_state: u32,
    clicked_ids: Vec<String>,
}

impl PageState {
    fn enter(&mut self, state: &str) {
        if let Some(url) = self.documents.get(state).and_then(|d| d.url.clone()) {
            self.url = url;
        }
        self.current = state.to_owned();
        self.scrolls_in_state = 0;
    }

    fn current_html(&self) -> &str {
        self.documents
            .get(&self.current)
            .map_or("", |d| d.html.as_str())
    }
}

pub struct SnapshotPage {
    state: Mutex<PageState>,
}

impl SnapshotPage {
    /// A static single-document page.
    #[must_use]
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self::builder(url).state(INITIAL_STATE, html).build()
    }

    #[must_use]
    pub fn builder(url: impl Into<String>) -> SnapshotPageBuilder {
        SnapshotPageBuilder {
            url: url.into(),
            initial: None,
            documents: HashMap::new(),
            click_transitions: HashMap::new(),
            routes: HashMap::new(),
            lazy_plans: HashMap::new(),
            scroll_height: DEFAULT_SCROLL_HEIGHT,
        }
    }

    /// Name of the document state currently displayed.
    #[must_use]
    pub fn current_state(&self) -> String {
        self.lock().current.clone()
    }

    /// `id` attributes of every clicked element, in click order.
    #[must_use]
    pub fn clicked_ids(&self) -> Vec<String> {
        self.lock().clicked_ids.clone()
    }

    fn lock(&self) -> MutexGuard<'_, PageState> {
        // A poisoned lock only means a panicking test thread; the state is
        // still a plain value.
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn select_snapshots(&self, selector: &str) -> Vec<ElementSnapshot> {
        let html = self.lock().current_html().to_owned();
        let Some(parsed) = parse_selector(selector) else {
            return Vec::new();
        };
        let document = Html::parse_document(&html);
        document
            .select(&parsed)
            .enumerate()
            .map(|(index, element)| to_snapshot(selector, index, element))
            .collect()
    }

    fn resolve_id(&self, handle: &ElementHandle) -> Result<Option<String>, PageError> {
        self.select_snapshots(&handle.selector)
            .into_iter()
            .nth(handle.index)
            .map(|snapshot| snapshot.attr("id").map(str::to_owned))
            .ok_or_else(|| PageError::ElementNotFound {
                selector: handle.selector.clone(),
                index: handle.index,
            })
    }
}

fn parse_selector(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::warn!(selector, error = %e, "invalid CSS selector");
            None
        }
    }
}

fn to_snapshot(selector: &str, index: usize, element: ElementRef<'_>) -> ElementSnapshot {
    let attributes = element
        .value()
        .attrs()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect::<BTreeMap<_, _>>();
    let text = element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ");

    ElementSnapshot {
        handle: ElementHandle {
            selector: selector.to_owned(),
            index,
        },
        tag: element.value().name().to_ascii_lowercase(),
        text,
        attributes,
    }
}

#[async_trait]
impl PageHandle for SnapshotPage {
    async fn current_url(&self) -> String {
        self.lock().url.clone()
    }

    async fn query_all(&self, selector: &str) -> Vec<ElementSnapshot> {
        self.select_snapshots(selector)
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), PageError> {
        let id = self.resolve_id(element)?;
        let mut state = self.lock();
        if let Some(id) = id {
            state.clicked_ids.push(id.clone());
            if let Some(target) = state.click_transitions.get(&id).cloned() {
                state.enter(&target);
            }
        }
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<(), PageError> {
        let mut state = self.lock();
        let target = state
            .routes
            .get(url)
            .cloned()
            .ok_or_else(|| PageError::UnknownUrl {
                url: url.to_owned(),
            })?;
        state.enter(&target);
        state.url = url.to_owned();
        state.scroll_y = 0.0;
        Ok(())
    }

    async fn scroll_to(&self, y: f64) {
        let mut state = self.lock();
        state.scroll_y = y.clamp(0.0, state.scroll_height);
        state.scrolls_in_state += 1;
        let current = state.current.clone();
        if let Some(plan) = state.lazy_plans.get(&current).cloned() {
            if state.scrolls_in_state >= plan.after_scrolls {
                state.enter(&plan.loaded_state);
            }
        }
    }

    async fn scroll_position(&self) -> f64 {
        self.lock().scroll_y
    }

    async fn scroll_height(&self) -> f64 {
        self.lock().scroll_height
    }
}

/// Builder for multi-state [`SnapshotPage`]s. The first state added is shown
/// initially.
pub struct SnapshotPageBuilder {
    url: String,
    initial: Option<String>,
    documents: HashMap<String, DocumentState>,
    click_transitions: HashMap<String, String>,
    routes: HashMap<String, String>,
    lazy_plans: HashMap<String, LazyPlan>,
    scroll_height: f64,
}

impl SnapshotPageBuilder {
    #[must_use]
    pub fn state(self, name: impl Into<String>, html: impl Into<String>) -> Self {
        self.insert_state(name.into(), html.into(), None)
    }

    /// A state that also changes the document URL when entered (client-side route).
    #[must_use]
    pub fn state_with_url(
        self,
        name: impl Into<String>,
        url: impl Into<String>,
        html: impl Into<String>,
    ) -> Self {
        self.insert_state(name.into(), html.into(), Some(url.into()))
    }

    fn insert_state(mut self, name: String, html: String, url: Option<String>) -> Self {
        if self.initial.is_none() {
            self.initial = Some(name.clone());
        }
        self.documents.insert(name, DocumentState { html, url });
        self
    }

    /// Clicking the element with `id="{element_id}"` shows `target_state`.
    #[must_use]
    pub fn on_click(mut self, element_id: impl Into<String>, target_state: impl Into<String>) -> Self {
        self.click_transitions
            .insert(element_id.into(), target_state.into());
        self
    }

    /// Navigating to `url` shows `state`.
    #[must_use]
    pub fn route(mut self, url: impl Into<String>, state: impl Into<String>) -> Self {
        self.routes.insert(url.into(), state.into());
        self
    }

    /// After `after_scrolls` scroll calls in `placeholder_state`, show `loaded_state`.
    #[must_use]
    pub fn lazy_load(
        mut self,
        placeholder_state: impl Into<String>,
        loaded_state: impl Into<String>,
        after_scrolls: u32,
    ) -> Self {
        self.lazy_plans.insert(
            placeholder_state.into(),
            LazyPlan {
                loaded_state: loaded_state.into(),
                after_scrolls,
            },
        );
        self
    }

    #[must_use]
    pub fn scroll_height(mut self, height: f64) -> Self {
        self.scroll_height = height;
        self
    }

    #[must_use]
    pub fn build(self) -> SnapshotPage {
        let current = self.initial.unwrap_or_else(|| INITIAL_STATE.to_owned());
        let url = self
            .documents
            .get(&current)
            .and_then(|d| d.url.clone())
            .unwrap_or(self.url);
        let mut routes = self.routes;
        routes.entry(url.clone()).or_insert_with(|| current.clone());

        SnapshotPage {
            state: Mutex::new(PageState {
                url,
                current,
                documents: self.documents,
                click_transitions: self.click_transitions,
                routes,
                lazy_plans: self.lazy_plans,
                scroll_y: 0.0,
                scroll_height: self.scroll_height,
                scrolls_in_state: 0,
                clicked_ids: Vec::new(),
            }),
        }
    }
}

#[cfg(test)]
#[path = "snapshot_test.rs"]
mod tests;
