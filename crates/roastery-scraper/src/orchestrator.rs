//! Runs every selected source and collects one [`CrawlResult`] per source.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use roastery_core::AppConfig;
use tokio::time::Instant;

use crate::extract::Extractor;
use crate::fetch::Fetcher;
use crate::normalize::normalize_records;
use crate::pagination::discover;
use crate::rules::CompiledSource;
use crate::session::SourceSession;
use crate::types::CrawlResult;

/// Run-wide crawl tunables.
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Pause between successive requests to the same source.
    pub politeness_delay: Duration,
    /// How many sources are crawled at once.
    pub max_concurrent_sources: usize,
    /// Extra attempts for transient fetch errors; `0` disables retrying.
    pub max_retries: u32,
    pub backoff_base_secs: u64,
    /// Overall run budget, measured from the start of [`Orchestrator::run`].
    pub deadline: Option<Duration>,
}

impl CrawlSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            politeness_delay: Duration::from_millis(config.politeness_delay_ms),
            max_concurrent_sources: config.max_concurrent_sources,
            max_retries: config.max_retries,
            backoff_base_secs: config.retry_backoff_base_secs,
            deadline: config.run_deadline_secs.map(Duration::from_secs),
        }
    }
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            politeness_delay: Duration::from_secs(1),
            max_concurrent_sources: 4,
            max_retries: 0,
            backoff_base_secs: 2,
            deadline: None,
        }
    }
}

pub struct Orchestrator {
    fetcher: Arc<dyn Fetcher>,
    settings: CrawlSettings,
}

impl Orchestrator {
    #[must_use]
    pub fn new(fetcher: Arc<dyn Fetcher>, settings: CrawlSettings) -> Self {
        Self { fetcher, settings }
    }

    /// Crawls `sources` concurrently, up to the configured bound.
    ///
    /// Never fails: every per-URL and per-source problem is recorded in that
    /// source's [`CrawlResult`]. Sources cut short by the deadline still
    /// return what they collected.
    pub async fn run(&self, sources: &[CompiledSource]) -> BTreeMap<String, CrawlResult> {
        let deadline = self.settings.deadline.map(|d| Instant::now() + d);
        let max_concurrent = self.settings.max_concurrent_sources.max(1);

        tracing::info!(
            sources = sources.len(),
            max_concurrent,
            deadline_secs = self.settings.deadline.map(|d| d.as_secs()),
            "starting crawl run"
        );

        stream::iter(sources)
            .map(|source| self.crawl_source(source, deadline))
            .buffer_unordered(max_concurrent)
            .map(|result| (result.source_id.clone(), result))
            .collect()
            .await
    }

    /// One source, start to finish: discover URLs, then fetch and extract
    /// each in discovery order.
    pub async fn crawl_source(
        &self,
        source: &CompiledSource,
        deadline: Option<Instant>,
    ) -> CrawlResult {
        let mut result = CrawlResult::new(source.id());
        let mut session =
            SourceSession::new(self.fetcher.as_ref(), source.transport(), &self.settings, deadline);

        tracing::info!(source = %source.id(), transport = %source.transport(), "crawling source");

        let discovery = match discover(source, &mut session).await {
            Ok(discovery) => discovery,
            Err(err) => {
                tracing::error!(source = %source.id(), error = %err, "source listing unreachable");
                result.errors.push(err.into());
                result.deadline_exceeded = session.deadline_hit();
                return result;
            }
        };
        result.errors.extend(discovery.errors);

        let extractor = Extractor::new(source);
        for url in &discovery.urls {
            if session.deadline_reached() {
                tracing::warn!(
                    source = %source.id(),
                    remaining = discovery.urls.len() - result.urls_attempted,
                    "run deadline reached, skipping remaining URLs"
                );
                break;
            }
            result.urls_attempted += 1;

            let page = match session.fetch(url).await {
                Ok(page) => page,
                Err(err) => {
                    tracing::warn!(source = %source.id(), url = %url, error = %err, "detail fetch failed");
                    result.errors.push(err.into());
                    continue;
                }
            };

            match extractor.extract(&page) {
                Ok(record) => {
                    tracing::debug!(
                        source = %source.id(),
                        url = %url,
                        fields = record.populated_fields(),
                        "extracted record"
                    );
                    result.urls_succeeded += 1;
                    result.records.push(record);
                }
                Err(err) => {
                    tracing::warn!(source = %source.id(), url = %url, error = %err, "extraction failed");
                    result.errors.push(err.into());
                }
            }
        }

        result.records = normalize_records(result.records);
        result.deadline_exceeded = session.deadline_hit();

        tracing::info!(
            source = %source.id(),
            listing_pages = discovery.pages_fetched,
            discovered = discovery.urls.len(),
            attempted = result.urls_attempted,
            succeeded = result.urls_succeeded,
            records = result.records.len(),
            errors = result.errors.len(),
            requests = session.requests(),
            "source finished"
        );

        result
    }
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
