//! Built-in site adapters.

pub mod hm;
pub mod uniqlo;
pub mod victoriassecret;
pub mod zara;

use std::sync::Arc;

use crate::image_probe::{ImageProbe, DEFAULT_PROBE_CONCURRENCY};
use crate::registry::SiteRegistration;

/// Shared collaborators handed to adapter factories.
#[derive(Clone)]
pub struct AdapterServices {
    pub image_probe: Arc<dyn ImageProbe>,
    pub probe_concurrency: usize,
}

impl AdapterServices {
    #[must_use]
    pub fn new(image_probe: Arc<dyn ImageProbe>) -> Self {
        Self {
            image_probe,
            probe_concurrency: DEFAULT_PROBE_CONCURRENCY,
        }
    }
}

/// Registrations for every shipped adapter.
#[must_use]
pub fn builtin_registrations(services: &AdapterServices) -> Vec<SiteRegistration> {
    vec![
        zara::registration(),
        hm::registration(),
        victoriassecret::registration(),
        uniqlo::registration(services.clone()),
    ]
}
