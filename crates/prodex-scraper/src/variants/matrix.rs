//! Two-dimensional size selectors (band × cup and the like).

use std::time::Duration;

use prodex_core::SizeCombinationMatrix;

use crate::options::{enabled_values, read_options, PageOption};
use crate::page::PageHandle;
use crate::parser::MatrixSelectors;
use crate::poll::poll_attempts;

pub const SECONDARY_POLL_ATTEMPTS: u32 = 10;
pub const SECONDARY_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Clicks through every enabled primary option and records which secondary
/// options each one enables.
///
/// Recorded secondaries are limited to the full secondary set observed
/// before any click. The originally selected options are re-selected
/// afterwards. Returns `None` when the page shows no primary options.
pub async fn build_size_matrix(
    page: &dyn PageHandle,
    selectors: &MatrixSelectors,
) -> Option<SizeCombinationMatrix> {
    let primaries = read_options(page, &selectors.primary).await;
    if primaries.is_empty() {
        return None;
    }
    let secondaries = read_options(page, &selectors.secondary).await;
    let all_secondary: Vec<String> = secondaries.iter().map(|o| o.value.clone()).collect();
    let original_primary = primaries.iter().position(|o| o.selected);
    let original_secondary = secondaries.iter().find(|o| o.selected).cloned();

    let mut matrix = SizeCombinationMatrix::new(selectors.primary_type, selectors.secondary_type);
    let mut current = original_primary;
    let mut previous = enabled_values(&secondaries);

    for (index, primary) in primaries.iter().enumerate() {
        if !primary.enabled {
            continue;
        }

        let enabled = if current == Some(index) {
            enabled_values(&read_options(page, &selectors.secondary).await)
        } else {
            if let Err(e) = page.click(&primary.element.handle).await {
                tracing::warn!(option = %primary.value, error = %e, "could not select size option");
                continue;
            }
            current = Some(index);
            wait_for_secondary_change(page, selectors, &previous).await
        };

        let filtered: Vec<String> = all_secondary
            .iter()
            .filter(|value| enabled.contains(value))
            .cloned()
            .collect();
        if !filtered.is_empty() {
            matrix.combinations.insert(primary.value.clone(), filtered);
        }
        previous = enabled;
    }

    restore(page, &primaries, original_primary, current, original_secondary.as_ref()).await;

    (!matrix.combinations.is_empty()).then_some(matrix)
}

/// Enabled secondary values once they differ from `previous`, or whatever is
/// enabled when the attempt budget runs out (the sets may legitimately match).
async fn wait_for_secondary_change(
    page: &dyn PageHandle,
    selectors: &MatrixSelectors,
    previous: &[String],
) -> Vec<String> {
    let changed = poll_attempts(SECONDARY_POLL_ATTEMPTS, SECONDARY_POLL_INTERVAL, move || async move {
        let enabled = enabled_values(&read_options(page, &selectors.secondary).await);
        (enabled.as_slice() != previous).then_some(enabled)
    })
    .await;
    match changed {
        Some(enabled) => enabled,
        None => enabled_values(&read_options(page, &selectors.secondary).await),
    }
}

async fn restore(
    page: &dyn PageHandle,
    primaries: &[PageOption],
    original_primary: Option<usize>,
    current: Option<usize>,
    original_secondary: Option<&PageOption>,
) {
    if let Some(original) = original_primary {
        if current != Some(original) {
            if let Err(e) = page.click(&primaries[original].element.handle).await {
                tracing::warn!(error = %e, "could not restore primary size selection");
            }
        }
    }
    if let Some(secondary) = original_secondary {
        if let Err(e) = page.click(&secondary.element.handle).await {
            tracing::warn!(error = %e, "could not restore secondary size selection");
        }
    }
}
