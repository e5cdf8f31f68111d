mod extract;
mod sites;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "prodex")]
#[command(about = "Extract structured product records from retailer product pages")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract every variant record from one product page
    Extract {
        /// Product page URL; selects the site adapter
        url: String,
        /// Read the page from a saved HTML file instead of fetching it
        #[arg(long)]
        html_file: Option<PathBuf>,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// List registered sites and their effective capabilities
    Sites,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = prodex_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!(env = %config.env, "configuration loaded");

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("prodex ready; run `prodex --help` for commands");
        return Ok(());
    };

    let registry = build_registry(&config)?;
    match command {
        Commands::Extract {
            url,
            html_file,
            pretty,
        } => extract::run_extract(&config, &registry, &url, html_file.as_deref(), pretty).await,
        Commands::Sites => sites::run_sites(&registry),
    }
}

/// Built-in adapters with the configured overrides applied.
fn build_registry(config: &prodex_core::AppConfig) -> anyhow::Result<prodex_scraper::SiteRegistry> {
    let probe = prodex_scraper::HttpImageProbe::new(
        config.image_probe_timeout_secs,
        &config.user_agent,
    )
    .map_err(|e| anyhow::anyhow!("failed to build image probe: {e}"))?;
    let mut services = prodex_scraper::AdapterServices::new(Arc::new(probe));
    services.probe_concurrency = config.image_probe_concurrency;

    let mut registry = prodex_scraper::SiteRegistry::builtin(&services)?;
    if let Some(path) = &config.sites_path {
        let overrides = prodex_core::load_sites(path)?;
        registry = registry.with_overrides(&overrides)?;
        tracing::info!(path = %path.display(), sites = overrides.sites.len(), "applied site overrides");
    }
    Ok(registry)
}
