//! Maps a page URL to the adapter that handles its site.
//!
//! Registrations are fixed once the registry is built; lookups are read-only
//! and can be shared freely.

use std::fmt;
use std::sync::Arc;

use prodex_core::{CapabilityFlags, SitesFile};

use crate::error::{RegistryError, ScraperError};
use crate::parser::Parser;
use crate::sites::{builtin_registrations, AdapterServices};

/// Builds a parser for one page from the site's (possibly overridden) flags.
pub type ParserFactory =
    Arc<dyn Fn(&CapabilityFlags) -> Result<Box<dyn Parser>, ScraperError> + Send + Sync>;

#[derive(Clone)]
pub struct SiteRegistration {
    pub id: String,
    pub name: String,
    /// Matched as a substring of the URL host.
    pub domain: String,
    pub capabilities: CapabilityFlags,
    pub factory: ParserFactory,
}

impl fmt::Debug for SiteRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SiteRegistration")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("domain", &self.domain)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

/// Result of matching a URL against the registry.
#[derive(Debug, Clone, Copy)]
pub enum Detection<'a> {
    Supported(&'a SiteRegistration),
    Unsupported,
}

impl<'a> Detection<'a> {
    #[must_use]
    pub fn is_supported(&self) -> bool {
        matches!(self, Detection::Supported(_))
    }

    #[must_use]
    pub fn registration(&self) -> Option<&'a SiteRegistration> {
        match *self {
            Detection::Supported(registration) => Some(registration),
            Detection::Unsupported => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct SiteRegistry {
    sites: Vec<SiteRegistration>,
}

impl SiteRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every shipped adapter.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if two built-in registrations conflict.
    pub fn builtin(services: &AdapterServices) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for registration in builtin_registrations(services) {
            registry.register(registration)?;
        }
        Ok(registry)
    }

    /// Adds a site.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if the id is taken, the domain is empty, or
    /// the domain contains (or is contained in) an already registered one.
    pub fn register(&mut self, registration: SiteRegistration) -> Result<(), RegistryError> {
        let domain = registration.domain.trim().to_ascii_lowercase();
        if domain.is_empty() {
            return Err(RegistryError::EmptyDomain(registration.id));
        }
        for existing in &self.sites {
            if existing.id.eq_ignore_ascii_case(&registration.id) {
                return Err(RegistryError::DuplicateId(registration.id));
            }
            if existing.domain.contains(&domain) || domain.contains(&existing.domain) {
                return Err(RegistryError::AmbiguousDomain {
                    id: registration.id,
                    domain,
                    existing_id: existing.id.clone(),
                    existing_domain: existing.domain.clone(),
                });
            }
        }
        self.sites.push(SiteRegistration {
            domain,
            ..registration
        });
        Ok(())
    }

    /// Applies capability overrides keyed by site id.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownSite`] if an override names a site that
    /// is not registered.
    pub fn with_overrides(mut self, overrides: &SitesFile) -> Result<Self, RegistryError> {
        for site_override in &overrides.sites {
            let registration = self
                .sites
                .iter_mut()
                .find(|s| s.id.eq_ignore_ascii_case(&site_override.id))
                .ok_or_else(|| RegistryError::UnknownSite(site_override.id.clone()))?;
            registration.capabilities = registration
                .capabilities
                .with_overrides(&site_override.capabilities);
            tracing::debug!(site = %registration.id, "applied capability overrides");
        }
        Ok(self)
    }

    /// First registration whose domain occurs in the URL host. Unparseable
    /// URLs are matched as plain strings.
    #[must_use]
    pub fn detect(&self, url: &str) -> Detection<'_> {
        let host = reqwest::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
            .unwrap_or_else(|| url.to_ascii_lowercase());
        self.sites
            .iter()
            .find(|site| host.contains(&site.domain))
            .map_or(Detection::Unsupported, Detection::Supported)
    }

    /// Parser for the site handling `url`, or `None` if the site is unknown or
    /// its factory fails.
    #[must_use]
    pub fn create_parser(&self, url: &str) -> Option<Box<dyn Parser>> {
        let registration = self.detect(url).registration()?;
        match (registration.factory)(&registration.capabilities) {
            Ok(parser) => Some(parser),
            Err(e) => {
                tracing::warn!(site = %registration.id, url, error = %e, "parser factory failed");
                None
            }
        }
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&SiteRegistration> {
        self.sites.iter().find(|s| s.id.eq_ignore_ascii_case(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &SiteRegistration> {
        self.sites.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::SiteSelectors;
    use async_trait::async_trait;
    use prodex_core::parse_sites;

    struct Stub {
        flags: CapabilityFlags,
    }

    const SELECTORS: SiteSelectors = SiteSelectors {
        product_marker: "main",
        name: "h1",
        price: ".price",
        description: None,
        composition: None,
        images: "img",
        colors: None,
        sizes: None,
        size_matrix: None,
        labelled_fields: None,
        sku_labels: &[],
        url_sku_pattern: None,
    };

    #[async_trait]
    impl Parser for Stub {
        fn site_id(&self) -> &str {
            "stub"
        }
        fn capabilities(&self) -> &CapabilityFlags {
            &self.flags
        }
        fn selectors(&self) -> &SiteSelectors {
            &SELECTORS
        }
    }

    fn registration(id: &str, domain: &str) -> SiteRegistration {
        SiteRegistration {
            id: id.to_owned(),
            name: id.to_uppercase(),
            domain: domain.to_owned(),
            capabilities: CapabilityFlags::default(),
            factory: Arc::new(|flags: &CapabilityFlags| Ok(Box::new(Stub { flags: *flags }) as Box<dyn Parser>)),
        }
    }

    fn registry() -> SiteRegistry {
        let mut registry = SiteRegistry::new();
        registry.register(registration("zara", "zara.com")).unwrap();
        registry.register(registration("hm", "www2.hm.com")).unwrap();
        registry
    }

    #[test]
    fn detects_by_host_substring() {
        let registry = registry();
        let detection = registry.detect("https://www.zara.com/es/en/shirt-p04387251.html");
        assert!(detection.is_supported());
        assert_eq!(detection.registration().unwrap().id, "zara");
        assert!(!registry.detect("https://www.example.org/p/1").is_supported());
    }

    #[test]
    fn path_does_not_count_as_host() {
        let registry = registry();
        assert!(!registry
            .detect("https://mirror.example.org/zara.com/p/1")
            .is_supported());
    }

    #[test]
    fn unparseable_url_is_matched_as_text() {
        assert!(registry().detect("www.zara.com/p/1").is_supported());
    }

    #[test]
    fn rejects_duplicate_and_overlapping_registrations() {
        let mut registry = registry();
        assert_eq!(
            registry.register(registration("ZARA", "zara.es")),
            Err(RegistryError::DuplicateId("ZARA".to_owned()))
        );
        assert!(matches!(
            registry.register(registration("hm2", "hm.com")),
            Err(RegistryError::AmbiguousDomain { .. })
        ));
        assert_eq!(
            registry.register(registration("blank", "  ")),
            Err(RegistryError::EmptyDomain("blank".to_owned()))
        );
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn failing_factory_yields_no_parser() {
        let mut registry = SiteRegistry::new();
        let mut broken = registration("broken", "broken.example");
        broken.factory = Arc::new(|_: &CapabilityFlags| {
            Err(ScraperError::Factory {
                site: "broken".to_owned(),
                reason: "missing dependency".to_owned(),
            })
        });
        registry.register(broken).unwrap();
        assert!(registry.detect("https://broken.example/p/1").is_supported());
        assert!(registry.create_parser("https://broken.example/p/1").is_none());
    }

    #[test]
    fn create_parser_passes_overridden_flags() {
        let overrides = parse_sites("sites:\n  - id: zara\n    capabilities:\n      multi_size: true\n").unwrap();
        let registry = registry().with_overrides(&overrides).unwrap();
        let parser = registry
            .create_parser("https://www.zara.com/es/en/shirt-p04387251.html")
            .unwrap();
        assert!(parser.capabilities().multi_size);
        assert!(!registry.get("hm").unwrap().capabilities.multi_size);
    }

    struct NoImages;

    #[async_trait]
    impl crate::image_probe::ImageProbe for NoImages {
        async fn exists(&self, _url: &str) -> bool {
            false
        }
    }

    #[test]
    fn builtin_registry_covers_every_adapter() {
        let registry = SiteRegistry::builtin(&AdapterServices::new(Arc::new(NoImages))).unwrap();
        let ids: Vec<&str> = registry.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["zara", "hm", "victoriassecret", "uniqlo"]);
        let detection = registry.detect("https://www2.hm.com/en_gb/productpage.0970819001.html");
        assert_eq!(detection.registration().unwrap().id, "hm");
        assert!(registry
            .create_parser("https://www.uniqlo.com/us/en/products/E459565-000/00")
            .is_some());
    }

    #[test]
    fn override_for_unknown_site_is_rejected() {
        let overrides = parse_sites("sites:\n  - id: nowhere\n").unwrap();
        assert_eq!(
            registry().with_overrides(&overrides).unwrap_err(),
            RegistryError::UnknownSite("nowhere".to_owned())
        );
    }
}
