//! Politeness and retry policy for per-source fetching.
//!
//! [`Politeness`] spaces out successive requests to one source.
//! [`retry_with_backoff`] re-runs a fetch on transient errors. Neither is
//! shared across sources.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::FetchError;

/// Minimum pause between the end of one request and the start of the next
/// request to the same source.
#[derive(Debug)]
pub struct Politeness {
    delay: Duration,
    last_request: Option<Instant>,
}

impl Politeness {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_request: None,
        }
    }

    /// Sleeps until the delay since the previous request has elapsed. The
    /// first request goes out immediately.
    pub async fn wait(&self) {
        if let Some(last) = self.last_request {
            tokio::time::sleep_until(last + self.delay).await;
        }
    }

    /// Marks a request as finished now.
    pub fn record(&mut self) {
        self.last_request = Some(Instant::now());
    }
}

/// Executes `operation` with exponential backoff retries on transient errors.
///
/// On a transient error (see [`FetchError::is_transient`]) the function
/// sleeps for `backoff_base_secs * 2^attempt` seconds and tries again, up to
/// `max_retries` additional attempts after the first try. If all retries are
/// exhausted the last error is returned. Other errors are returned at once.
///
/// With `max_retries = 3` the operation is attempted at most 4 times total.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut last_err;
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_transient() || attempt >= max_retries {
                    return Err(err);
                }
                last_err = err;
            }
        }

        // Cap the shift so extreme configs saturate instead of overflowing.
        let delay_secs = backoff_base_secs.saturating_mul(1u64 << attempt.min(62));
        tracing::warn!(
            attempt,
            max_retries,
            delay_secs,
            url = last_err.url(),
            error = %last_err,
            "transient fetch error, retrying after backoff"
        );
        tokio::time::sleep(Duration::from_secs(delay_secs)).await;
        attempt += 1;
    }
}
