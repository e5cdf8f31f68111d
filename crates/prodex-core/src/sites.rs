use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::capabilities::CapabilityOverrides;
use crate::ConfigError;

/// Per-site capability patch keyed by the registered site id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteOverride {
    pub id: String,
    #[serde(default)]
    pub capabilities: CapabilityOverrides,
}

#[derive(Debug, Default, Deserialize)]
pub struct SitesFile {
    #[serde(default)]
    pub sites: Vec<SiteOverride>,
}

impl SitesFile {
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&SiteOverride> {
        self.sites.iter().find(|s| s.id == id)
    }
}

/// Load and validate the site overrides file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_sites(path: &Path) -> Result<SitesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SitesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_sites(&content)
}

/// Parse and validate site overrides from YAML text.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_sites(content: &str) -> Result<SitesFile, ConfigError> {
    let sites_file: SitesFile =
        serde_yaml::from_str(content).map_err(ConfigError::SitesFileParse)?;

    validate_sites(&sites_file)?;

    Ok(sites_file)
}

fn validate_sites(sites_file: &SitesFile) -> Result<(), ConfigError> {
    let mut seen_ids = HashSet::new();

    for site in &sites_file.sites {
        if site.id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "site id must be non-empty".to_string(),
            ));
        }

        if !seen_ids.insert(site.id.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate site id: '{}'",
                site.id
            )));
        }

        if let Some(threshold) = site.capabilities.lazy_image_threshold {
            if !(threshold > 0.0 && threshold <= 1.0) {
                return Err(ConfigError::Validation(format!(
                    "site '{}' has lazy_image_threshold {threshold}; must be in (0, 1]",
                    site.id
                )));
            }
        }
    }

    Ok(())
}
