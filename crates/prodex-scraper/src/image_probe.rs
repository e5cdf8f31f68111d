//! Existence checks for speculative image URLs.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use crate::error::ScraperError;

/// Default number of checks in flight.
pub const DEFAULT_PROBE_CONCURRENCY: usize = 4;

#[async_trait]
pub trait ImageProbe: Send + Sync {
    /// Whether `url` resolves to an image. Failures answer `false`.
    async fn exists(&self, url: &str) -> bool;
}

/// Probe that issues an HTTP `HEAD` and accepts any 2xx status.
#[derive(Debug, Clone)]
pub struct HttpImageProbe {
    client: reqwest::Client,
}

impl HttpImageProbe {
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the HTTP client cannot be built.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, ScraperError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ImageProbe for HttpImageProbe {
    async fn exists(&self, url: &str) -> bool {
        match self.client.head(url).send().await {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                tracing::debug!(status = resp.status().as_u16(), url, "image probe miss");
                false
            }
            Err(e) => {
                tracing::debug!(error = %e, url, "image probe failed");
                false
            }
        }
    }
}

/// Returns the candidates that exist, in input order.
pub async fn filter_existing(
    probe: &dyn ImageProbe,
    candidates: Vec<String>,
    concurrency: usize,
) -> Vec<String> {
    stream::iter(candidates.into_iter().map(|url| async move {
        let exists = probe.exists(&url).await;
        (url, exists)
    }))
    .buffered(concurrency.max(1))
    .filter_map(|(url, exists)| async move { exists.then_some(url) })
    .collect()
    .await
}
