//! Plain HTTP retrieval of product pages.
//!
//! The extraction pipeline works against a [`crate::page::PageHandle`]; this
//! fetcher supplies the initial document when no live browser is attached.

use std::time::Duration;

use reqwest::{header, Client, Response, StatusCode, Url};

use crate::error::ScraperError;
use crate::rate_limit::RetryPolicy;

/// Seconds reported when a 429 carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

const HTML_ACCEPT: &str = "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8";

/// Fetches product page HTML with typed status errors. Transient failures
/// (429, network errors) are retried with exponential backoff.
pub struct PageFetcher {
    client: Client,
    retry: RetryPolicy,
}

impl PageFetcher {
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            retry: RetryPolicy {
                max_retries,
                backoff_base_secs,
            },
        })
    }

    /// Returns the body of `url` as text.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::InvalidUrl`]: `url` is not an absolute http(s) URL.
    /// - [`ScraperError::RateLimited`]: HTTP 429 after all retries.
    /// - [`ScraperError::NotFound`]: HTTP 404 (not retried).
    /// - [`ScraperError::UnexpectedStatus`]: any other non-2xx status.
    /// - [`ScraperError::Http`]: network or TLS failure after all retries.
    pub async fn fetch_html(&self, url: &str) -> Result<String, ScraperError> {
        let target = parse_page_url(url)?;
        let origin = target.origin().ascii_serialization();
        let (client, target, origin) = (&self.client, &target, origin.as_str());

        self.retry
            .run(move || async move {
                let response = client
                    .get(target.clone())
                    .header(header::ACCEPT, HTML_ACCEPT)
                    .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
                    .header(header::REFERER, origin)
                    .header(header::CACHE_CONTROL, "no-cache")
                    .send()
                    .await?;
                let body = check_status(response, url)?.text().await?;
                tracing::debug!(url, bytes = body.len(), "fetched product page");
                Ok::<_, ScraperError>(body)
            })
            .await
    }
}

fn parse_page_url(url: &str) -> Result<Url, ScraperError> {
    let parsed = Url::parse(url).map_err(|e| ScraperError::InvalidUrl {
        url: url.to_owned(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(ScraperError::InvalidUrl {
            url: url.to_owned(),
            reason: format!("unsupported scheme \"{other}\""),
        }),
    }
}

/// Maps non-2xx responses to typed errors.
fn check_status(response: Response, url: &str) -> Result<Response, ScraperError> {
    match response.status() {
        status if status.is_success() => Ok(response),
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after_secs = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            Err(ScraperError::RateLimited {
                domain: extract_domain(url),
                retry_after_secs,
            })
        }
        StatusCode::NOT_FOUND => Err(ScraperError::NotFound {
            url: url.to_owned(),
        }),
        status => Err(ScraperError::UnexpectedStatus {
            status: status.as_u16(),
            url: url.to_owned(),
        }),
    }
}

/// Host of `url`, or the whole string when it does not parse.
#[must_use]
pub fn extract_domain(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_else(|| url.to_owned())
}
