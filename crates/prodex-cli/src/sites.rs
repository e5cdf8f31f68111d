//! `prodex sites`: what the registry knows after overrides.

use prodex_scraper::SiteRegistry;

/// Prints one line per site: id, domain, display name and capabilities JSON.
///
/// # Errors
///
/// Returns an error only if capability flags fail to serialize.
pub(crate) fn run_sites(registry: &SiteRegistry) -> anyhow::Result<()> {
    for site in registry.iter() {
        let capabilities = serde_json::to_string(&site.capabilities)?;
        println!("{}\t{}\t{}\t{capabilities}", site.id, site.domain, site.name);
    }
    Ok(())
}
