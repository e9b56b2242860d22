use tokio::time::Instant;

use roastery_core::Transport;

use crate::error::FetchError;
use crate::fetch::Fetcher;
use crate::orchestrator::CrawlSettings;
use crate::rate_limit::{retry_with_backoff, Politeness};
use crate::types::RawPage;

/// Fetch state scoped to one source's run: its transport, politeness clock,
/// retry policy and the shared run deadline.
pub struct SourceSession<'a> {
    fetcher: &'a dyn Fetcher,
    transport: Transport,
    politeness: Politeness,
    max_retries: u32,
    backoff_base_secs: u64,
    deadline: Option<Instant>,
    deadline_hit: bool,
    requests: usize,
}

impl<'a> SourceSession<'a> {
    #[must_use]
    pub fn new(
        fetcher: &'a dyn Fetcher,
        transport: Transport,
        settings: &CrawlSettings,
        deadline: Option<Instant>,
    ) -> Self {
        Self {
            fetcher,
            transport,
            politeness: Politeness::new(settings.politeness_delay),
            max_retries: settings.max_retries,
            backoff_base_secs: settings.backoff_base_secs,
            deadline,
            deadline_hit: false,
            requests: 0,
        }
    }

    /// True once the run deadline has passed. No new request may start after.
    pub fn deadline_reached(&mut self) -> bool {
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            self.deadline_hit = true;
        }
        self.deadline_hit
    }

    #[must_use]
    pub fn deadline_hit(&self) -> bool {
        self.deadline_hit
    }

    /// Requests issued so far, retries excluded.
    #[must_use]
    pub fn requests(&self) -> usize {
        self.requests
    }

    /// Fetches `url` after the politeness delay, retrying transient errors.
    ///
    /// A fetch still in flight when the deadline passes is abandoned and
    /// reported as [`FetchError::Timeout`].
    ///
    /// # Errors
    ///
    /// Returns the final [`FetchError`] for this URL.
    pub async fn fetch(&mut self, url: &str) -> Result<RawPage, FetchError> {
        let fetcher = self.fetcher;
        let transport = self.transport;
        let politeness = &self.politeness;
        let (max_retries, backoff) = (self.max_retries, self.backoff_base_secs);

        let attempt = async move {
            politeness.wait().await;
            retry_with_backoff(max_retries, backoff, || fetcher.fetch(url, transport)).await
        };

        let outcome = match self.deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, attempt).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    self.deadline_hit = true;
                    Err(FetchError::Timeout {
                        url: url.to_owned(),
                    })
                }
            },
            None => attempt.await,
        };

        self.politeness.record();
        self.requests += 1;
        outcome
    }
}
