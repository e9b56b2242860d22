use std::time::Duration;

use chrono::Utc;
use reqwest::Client;

use crate::error::{FetchError, ScraperError};
use crate::types::RawPage;

/// Static transport: one GET per call with a fixed `User-Agent` and a bounded
/// timeout.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates an `HttpFetcher` with the given request timeout and `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed (e.g., invalid TLS config).
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    /// Fetches `url` and returns its body.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Timeout`] if the request exceeds the configured timeout.
    /// - [`FetchError::HttpStatus`] for any non-2xx response.
    /// - [`FetchError::Network`] for connection, TLS, or body-read failures.
    pub async fn get(&self, url: &str) -> Result<RawPage, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| map_reqwest_error(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        let html = response
            .text()
            .await
            .map_err(|e| map_reqwest_error(url, &e))?;

        tracing::debug!(url, status = status.as_u16(), bytes = html.len(), "fetched page");

        Ok(RawPage {
            url: url.to_owned(),
            html,
            fetched_at: Utc::now(),
            status_code: status.as_u16(),
        })
    }
}

fn map_reqwest_error(url: &str, err: &reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout {
            url: url.to_owned(),
        }
    } else {
        FetchError::Network {
            url: url.to_owned(),
            reason: err.to_string(),
        }
    }
}
