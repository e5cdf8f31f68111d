use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("parser factory for site {site} failed: {reason}")]
    Factory { site: String, reason: String },

    #[error("rate limited by {domain} (retry after {retry_after_secs}s)")]
    RateLimited {
        domain: String,
        retry_after_secs: u64,
    },

    #[error("page not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Failures reported by a [`crate::page::PageHandle`] when simulating input.
///
/// Queries never fail: a missing element is an empty result.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PageError {
    #[error("element {selector}[{index}] is no longer on the page")]
    ElementNotFound { selector: String, index: usize },

    #[error("no document is known for {url}")]
    UnknownUrl { url: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("site '{0}' is already registered")]
    DuplicateId(String),

    #[error("site '{0}' has an empty domain")]
    EmptyDomain(String),

    #[error("domain '{domain}' of site '{id}' overlaps domain '{existing_domain}' of site '{existing_id}'")]
    AmbiguousDomain {
        id: String,
        domain: String,
        existing_id: String,
        existing_domain: String,
    },

    #[error("override references unknown site '{0}'")]
    UnknownSite(String),
}
