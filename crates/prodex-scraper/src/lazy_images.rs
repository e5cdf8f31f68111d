//! Scroll-driven loader for galleries that only fetch images near the viewport.
//!
//! ```text
//! Idle ──(few empty slots)──────────────────────────────▶ Done
//!  │
//!  └─▶ ScrollSequence ─▶ Settling ─▶ Verifying ─┬─▶ Done    (all loaded / stalled)
//!                                               └─▶ GaveUp  (ceiling reached)
//! ```
//!
//! Every transition is emitted as a `debug` event and recorded in the
//! returned [`LazyLoadReport`].

use std::fmt;
use std::time::Duration;

use prodex_core::LazyImageSettings;
use tokio::time::Instant;

use crate::fields::{is_placeholder_src, largest_srcset_candidate};
use crate::page::{ElementSnapshot, PageHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderState {
    Idle,
    ScrollSequence,
    Settling,
    Verifying,
    Done,
    GaveUp,
}

impl fmt::Display for LoaderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoaderState::Idle => "idle",
            LoaderState::ScrollSequence => "scroll_sequence",
            LoaderState::Settling => "settling",
            LoaderState::Verifying => "verifying",
            LoaderState::Done => "done",
            LoaderState::GaveUp => "gave_up",
        };
        f.write_str(s)
    }
}

/// Timing and threshold knobs for one loader run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LazyLoadConfig {
    /// Fraction of empty slots above which the page is scrolled.
    pub threshold: f64,
    /// Number of bottom/middle/top passes.
    pub scroll_cycles: u32,
    pub step_delay: Duration,
    pub settle_delay: Duration,
    pub poll_interval: Duration,
    /// Consecutive polls without improvement after which loading is considered finished.
    pub stall_polls: u32,
    /// Hard limit on the whole run.
    pub ceiling: Duration,
}

impl Default for LazyLoadConfig {
    fn default() -> Self {
        Self {
            threshold: 0.4,
            scroll_cycles: 3,
            step_delay: Duration::from_millis(150),
            settle_delay: Duration::from_millis(300),
            poll_interval: Duration::from_millis(500),
            stall_polls: 12,
            ceiling: Duration::from_secs(15),
        }
    }
}

impl LazyLoadConfig {
    #[must_use]
    pub fn from_settings(settings: &LazyImageSettings) -> Self {
        Self {
            threshold: settings.threshold,
            ..Self::default()
        }
    }
}

/// Image-carrier counts at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImageSlots {
    pub empty: usize,
    pub total: usize,
}

impl ImageSlots {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn empty_fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.empty as f64 / self.total as f64
        }
    }

    /// Zero carriers never need a scroll.
    #[must_use]
    pub fn needs_scroll(&self, threshold: f64) -> bool {
        self.total > 0 && self.empty_fraction() > threshold
    }
}

/// Whether an image carrier has a real load target in `src` or `srcset`.
#[must_use]
pub fn has_loaded_source(element: &ElementSnapshot) -> bool {
    let src_loaded = element.attr("src").is_some_and(|src| !is_placeholder_src(src));
    src_loaded
        || element
            .attr("srcset")
            .and_then(largest_srcset_candidate)
            .is_some_and(|candidate| !is_placeholder_src(candidate))
}

pub async fn count_image_slots(page: &dyn PageHandle, selector: &str) -> ImageSlots {
    let carriers = page.query_all(selector).await;
    ImageSlots {
        empty: carriers.iter().filter(|c| !has_loaded_source(c)).count(),
        total: carriers.len(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: LoaderState,
    pub to: LoaderState,
    pub empty: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LazyLoadReport {
    /// `Done` or `GaveUp`.
    pub outcome: LoaderState,
    pub transitions: Vec<Transition>,
    pub initial: ImageSlots,
    pub last: ImageSlots,
    /// Verification polls performed.
    pub polls: u32,
}

impl LazyLoadReport {
    #[must_use]
    pub fn scrolled(&self) -> bool {
        self.transitions
            .iter()
            .any(|t| t.to == LoaderState::ScrollSequence)
    }
}

pub struct LazyImageLoader {
    config: LazyLoadConfig,
}

struct Run {
    state: LoaderState,
    transitions: Vec<Transition>,
}

impl Run {
    fn advance(&mut self, to: LoaderState, slots: ImageSlots) {
        tracing::debug!(
            from = %self.state,
            to = %to,
            empty = slots.empty,
            total = slots.total,
            "lazy image loader transition"
        );
        self.transitions.push(Transition {
            from: self.state,
            to,
            empty: slots.empty,
            total: slots.total,
        });
        self.state = to;
    }
}

impl LazyImageLoader {
    #[must_use]
    pub fn new(config: LazyLoadConfig) -> Self {
        Self { config }
    }

    /// Drives the page until its image carriers (matched by `selector`) have
    /// loaded, stopped improving, or the ceiling is reached.
    pub async fn run(&self, page: &dyn PageHandle, selector: &str) -> LazyLoadReport {
        let started = Instant::now();
        let mut run = Run {
            state: LoaderState::Idle,
            transitions: Vec::new(),
        };

        let initial = count_image_slots(page, selector).await;
        if !initial.needs_scroll(self.config.threshold) {
            run.advance(LoaderState::Done, initial);
            return LazyLoadReport {
                outcome: LoaderState::Done,
                transitions: run.transitions,
                initial,
                last: initial,
                polls: 0,
            };
        }

        run.advance(LoaderState::ScrollSequence, initial);
        self.scroll_sequence(page).await;

        let after_scroll = count_image_slots(page, selector).await;
        run.advance(LoaderState::Settling, after_scroll);
        tokio::time::sleep(self.config.settle_delay).await;

        let mut last = count_image_slots(page, selector).await;
        run.advance(LoaderState::Verifying, last);

        let mut best = initial.empty;
        let mut stalled = 0u32;
        let mut polls = 0u32;
        let outcome = loop {
            if polls > 0 {
                last = count_image_slots(page, selector).await;
            }
            polls += 1;

            if last.empty == 0 {
                break LoaderState::Done;
            }
            if last.empty < best {
                best = last.empty;
                stalled = 0;
            } else {
                stalled += 1;
            }
            if stalled >= self.config.stall_polls {
                tracing::debug!(empty = last.empty, polls, "image loading stalled");
                break LoaderState::Done;
            }

            let elapsed = started.elapsed();
            if elapsed >= self.config.ceiling {
                break LoaderState::GaveUp;
            }
            tokio::time::sleep(self.config.poll_interval.min(self.config.ceiling - elapsed)).await;
        };

        if outcome == LoaderState::GaveUp {
            tracing::warn!(
                empty = last.empty,
                total = last.total,
                "lazy images still loading at ceiling; continuing with what loaded"
            );
        }
        run.advance(outcome, last);

        LazyLoadReport {
            outcome,
            transitions: run.transitions,
            initial,
            last,
            polls,
        }
    }

    async fn scroll_sequence(&self, page: &dyn PageHandle) {
        let original = page.scroll_position().await;
        let height = page.scroll_height().await;
        for _ in 0..self.config.scroll_cycles {
            for y in [height, height / 2.0, 0.0] {
                page.scroll_to(y).await;
                tokio::time::sleep(self.config.step_delay).await;
            }
        }
        page.scroll_to(original).await;
    }
}

impl Default for LazyImageLoader {
    fn default() -> Self {
        Self::new(LazyLoadConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PageError;
    use crate::page::{ElementHandle, SnapshotPage};
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn gallery(srcs: &[&str]) -> String {
        srcs.iter()
            .map(|src| format!(r#"<img class="media" src="{src}">"#))
            .collect()
    }

    fn placeholders(n: usize) -> String {
        gallery(&vec!["data:image/gif;base64,R0lGOD"; n])
    }

    fn loaded(n: usize) -> String {
        (1..=n)
            .map(|i| format!(r#"<img class="media" src="https://cdn.example.com/{i}.jpg">"#))
            .collect()
    }

    fn states(report: &LazyLoadReport) -> Vec<LoaderState> {
        report.transitions.iter().map(|t| t.to).collect()
    }

    #[test]
    fn zero_carriers_never_need_scroll() {
        assert!(!ImageSlots { empty: 0, total: 0 }.needs_scroll(0.0));
        assert!(ImageSlots { empty: 2, total: 4 }.needs_scroll(0.4));
        assert!(!ImageSlots { empty: 1, total: 4 }.needs_scroll(0.4));
    }

    #[test]
    fn srcset_counts_as_loaded_source() {
        let page_html = r#"<img src="" srcset="https://cdn.example.com/a.jpg 400w">"#;
        let doc = scraper::Html::parse_fragment(page_html);
        let sel = scraper::Selector::parse("img").unwrap();
        let img = doc.select(&sel).next().unwrap();
        let snapshot = ElementSnapshot {
            handle: ElementHandle {
                selector: "img".into(),
                index: 0,
            },
            tag: "img".into(),
            text: String::new(),
            attributes: img
                .value()
                .attrs()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect(),
        };
        assert!(has_loaded_source(&snapshot));
    }

    #[tokio::test(start_paused = true)]
    async fn mostly_loaded_gallery_skips_scrolling() {
        let page = SnapshotPage::new("https://shop.example.com/p/1", loaded(5));
        let report = LazyImageLoader::default().run(&page, "img.media").await;
        assert_eq!(report.outcome, LoaderState::Done);
        assert_eq!(states(&report), vec![LoaderState::Done]);
        assert!(!report.scrolled());
    }

    #[tokio::test(start_paused = true)]
    async fn placeholders_load_after_scrolling() {
        let page = SnapshotPage::builder("https://shop.example.com/p/1")
            .state("placeholder", placeholders(8))
            .state("loaded", loaded(8))
            .lazy_load("placeholder", "loaded", 2)
            .build();
        let report = LazyImageLoader::default().run(&page, "img.media").await;

        assert_eq!(report.outcome, LoaderState::Done);
        assert_eq!(
            states(&report),
            vec![
                LoaderState::ScrollSequence,
                LoaderState::Settling,
                LoaderState::Verifying,
                LoaderState::Done,
            ]
        );
        assert_eq!(report.initial, ImageSlots { empty: 8, total: 8 });
        assert_eq!(report.last, ImageSlots { empty: 0, total: 8 });
        assert_eq!(report.polls, 1);
        assert!(page.scroll_position().await.abs() < f64::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_gallery_finishes_as_done() {
        let page = SnapshotPage::new("https://shop.example.com/p/1", placeholders(8));
        let report = LazyImageLoader::default().run(&page, "img.media").await;
        assert_eq!(report.outcome, LoaderState::Done);
        assert_eq!(report.last.empty, 8);
        assert_eq!(report.polls, 12);
    }

    /// Loads one more image per query, so the count keeps improving.
    struct TricklePage {
        total: usize,
        queries: AtomicUsize,
    }

    #[async_trait]
    impl PageHandle for TricklePage {
        async fn current_url(&self) -> String {
            "https://shop.example.com/p/slow".to_owned()
        }

        async fn query_all(&self, selector: &str) -> Vec<ElementSnapshot> {
            let loaded = self.queries.fetch_add(1, Ordering::SeqCst).min(self.total);
            (0..self.total)
                .map(|index| {
                    let src = if index < loaded {
                        format!("https://cdn.example.com/{index}.jpg")
                    } else {
                        String::new()
                    };
                    ElementSnapshot {
                        handle: ElementHandle {
                            selector: selector.to_owned(),
                            index,
                        },
                        tag: "img".to_owned(),
                        text: String::new(),
                        attributes: BTreeMap::from([("src".to_owned(), src)]),
                    }
                })
                .collect()
        }

        async fn click(&self, _element: &ElementHandle) -> Result<(), PageError> {
            Ok(())
        }

        async fn navigate(&self, _url: &str) -> Result<(), PageError> {
            Ok(())
        }

        async fn scroll_to(&self, _y: f64) {}

        async fn scroll_position(&self) -> f64 {
            0.0
        }

        async fn scroll_height(&self) -> f64 {
            2_000.0
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_trickle_gives_up_at_ceiling() {
        let page = TricklePage {
            total: 200,
            queries: AtomicUsize::new(0),
        };
        let start = Instant::now();
        let report = LazyImageLoader::default().run(&page, "img").await;

        assert_eq!(report.outcome, LoaderState::GaveUp);
        assert!(report.last.empty > 0);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(15));
        assert!(elapsed <= Duration::from_millis(15_500));
    }
}
