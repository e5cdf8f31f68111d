//! `prodex extract`: one product page in, JSON records out.
//!
//! Records go to stdout; warnings and progress go to stderr through tracing.

use std::path::Path;

use prodex_scraper::{extract_product, PageFetcher, SiteRegistry, SnapshotPage};

/// Extracts every variant record from `url` and prints them as a JSON array.
///
/// # Errors
///
/// Returns an error if no adapter handles the URL, the page cannot be read,
/// or the records cannot be serialized. An empty record list is not an error.
pub(crate) async fn run_extract(
    config: &prodex_core::AppConfig,
    registry: &SiteRegistry,
    url: &str,
    html_file: Option<&Path>,
    pretty: bool,
) -> anyhow::Result<()> {
    let detection = registry.detect(url);
    let Some(site) = detection.registration() else {
        anyhow::bail!("no site adapter handles {url}; run `prodex sites` for the supported list");
    };
    let parser = registry
        .create_parser(url)
        .ok_or_else(|| anyhow::anyhow!("parser for site '{}' could not be created", site.id))?;

    let html = match html_file {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?,
        None => {
            let fetcher = PageFetcher::new(
                config.request_timeout_secs,
                &config.user_agent,
                config.max_retries,
                config.retry_backoff_base_secs,
            )
            .map_err(|e| anyhow::anyhow!("failed to build page fetcher: {e}"))?;
            fetcher.fetch_html(url).await?
        }
    };

    let page = SnapshotPage::new(url, html);
    let outcome = extract_product(parser.as_ref(), &page).await;
    tracing::info!(
        site = %site.id,
        records = outcome.records.len(),
        dropped = outcome.dropped,
        warnings = outcome.warnings.len(),
        "extract finished"
    );

    let json = if pretty {
        serde_json::to_string_pretty(&outcome.records)?
    } else {
        serde_json::to_string(&outcome.records)?
    };
    println!("{json}");
    Ok(())
}
