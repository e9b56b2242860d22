use serde::Serialize;
use thiserror::Error;

/// Setup-time failures: building the HTTP client or compiling a source's
/// selectors and patterns. These surface before any crawl starts.
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("source '{source_id}' has invalid selector \"{selector}\": {reason}")]
    InvalidSelector {
        source_id: String,
        selector: String,
        reason: String,
    },

    #[error("source '{source_id}' has invalid pattern \"{pattern}\": {reason}")]
    InvalidPattern {
        source_id: String,
        pattern: String,
        reason: String,
    },

    #[error("source '{source_id}' has invalid base URL \"{base_url}\": {reason}")]
    InvalidBaseUrl {
        source_id: String,
        base_url: String,
        reason: String,
    },

    #[error("browser backend error: {0}")]
    Browser(String),
}

/// A single page could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchError {
    #[error("network error fetching {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("timed out fetching {url}")]
    Timeout { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    HttpStatus { status: u16, url: String },
}

impl FetchError {
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            FetchError::Network { url, .. }
            | FetchError::Timeout { url }
            | FetchError::HttpStatus { url, .. } => url,
        }
    }

    /// Transient failures worth another attempt: network errors, timeouts,
    /// HTTP 429 and 5xx.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Network { .. } | FetchError::Timeout { .. } => true,
            FetchError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
        }
    }
}

/// A fetched detail page did not yield a record.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionError {
    #[error("no name found on {url}")]
    MissingName { url: String },

    #[error("malformed page {url}: {reason}")]
    MalformedPage { url: String, reason: String },
}

/// A whole source could not be crawled.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceError {
    #[error("no listing page reachable for source '{source_id}' (first tried {url}): {cause}")]
    ListingUnreachable {
        source_id: String,
        url: String,
        cause: FetchError,
    },
}

/// Any error recorded in a [`crate::CrawlResult`].
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Source(#[from] SourceError),
}

impl CrawlError {
    /// The URL the error concerns.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            CrawlError::Fetch(e) => e.url(),
            CrawlError::Extraction(
                ExtractionError::MissingName { url } | ExtractionError::MalformedPage { url, .. },
            )
            | CrawlError::Source(SourceError::ListingUnreachable { url, .. }) => url,
        }
    }
}
