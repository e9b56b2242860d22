//! `crawl` and `sources` command handlers.
//!
//! A crawl never aborts on a single failing source; the command only fails
//! when configuration is invalid, output cannot be written, or the whole run
//! produced zero records.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use roastery_core::{load_sources, AppConfig, SourceConfig, SourcesFile, Transport};
use roastery_scraper::{
    CompiledSource, CrawlResult, CrawlSettings, HttpFetcher, Orchestrator, RenderPool,
    TransportFetcher,
};

use crate::sink::{self, SaveMode};

/// Print every configured source.
pub(crate) fn list_sources(config: &AppConfig) -> anyhow::Result<()> {
    let sources_file = load_sources(&config.sources_path)?;
    for source in &sources_file.sources {
        println!(
            "{:<16} {:<9} {:<3} {} ({})",
            source.id,
            source.transport,
            source.listing.categories.len(),
            source.name(),
            source.base_url
        );
    }
    Ok(())
}

/// Resolve the requested ids against the configured sources.
///
/// An empty request or any `all` entry selects every source. Repeated ids
/// are crawled once.
pub(crate) fn select_sources<'a>(
    sources_file: &'a SourcesFile,
    requested: &[String],
) -> anyhow::Result<Vec<&'a SourceConfig>> {
    if requested.is_empty() || requested.iter().any(|id| id.trim() == "all") {
        return Ok(sources_file.sources.iter().collect());
    }

    let mut seen = HashSet::new();
    let mut selected = Vec::new();
    for id in requested {
        let id = id.trim();
        let source = sources_file.find(id).ok_or_else(|| {
            anyhow::anyhow!(
                "unknown source '{id}'; configured sources: {}",
                sources_file.ids().join(", ")
            )
        })?;
        if seen.insert(id) {
            selected.push(source);
        }
    }
    Ok(selected)
}

pub(crate) async fn run_crawl(
    config: &AppConfig,
    requested: &[String],
    save_mode: SaveMode,
    dry_run: bool,
) -> anyhow::Result<()> {
    let sources_file = load_sources(&config.sources_path)?;
    let selected: Vec<SourceConfig> = select_sources(&sources_file, requested)?
        .into_iter()
        .cloned()
        .collect();
    let compiled = CompiledSource::compile_all(&selected)?;

    if dry_run {
        let ids: Vec<&str> = compiled.iter().map(CompiledSource::id).collect();
        println!(
            "dry-run: would crawl {} sources: [{}] (save mode {save_mode:?}, output {})",
            ids.len(),
            ids.join(", "),
            config.output_dir.display()
        );
        return Ok(());
    }

    let needs_renderer = compiled
        .iter()
        .any(|s| s.transport() == Transport::Rendered);
    let fetcher = build_fetcher(config, needs_renderer).await?;
    if needs_renderer && !fetcher.has_renderer() {
        let rendered: Vec<&str> = compiled
            .iter()
            .filter(|s| s.transport() == Transport::Rendered)
            .map(CompiledSource::id)
            .collect();
        tracing::warn!(
            sources = %rendered.join(", "),
            "no render backend available; rendered sources will fail"
        );
    }
    let orchestrator = Orchestrator::new(Arc::new(fetcher), CrawlSettings::from_app_config(config));

    let started = Utc::now();
    let results = orchestrator.run(&compiled).await;
    report(&results, config.max_reported_errors);

    let written = save_results(&config.output_dir, &results, save_mode, started)?;
    for path in &written {
        tracing::info!(path = %path.display(), "wrote output file");
    }

    println!(
        "crawl finished: {} records from {} sources",
        total_records(&results),
        results.len()
    );
    Ok(())
}

/// Hands the results to the sink, unless the run collected no records at all.
fn save_results(
    output_dir: &Path,
    results: &BTreeMap<String, CrawlResult>,
    save_mode: SaveMode,
    started: DateTime<Utc>,
) -> anyhow::Result<Vec<PathBuf>> {
    if total_records(results) == 0 {
        anyhow::bail!(
            "crawl produced no records from {} sources; nothing saved",
            results.len()
        );
    }
    sink::write_results(output_dir, results, save_mode, started)
}

async fn build_fetcher(
    config: &AppConfig,
    needs_renderer: bool,
) -> anyhow::Result<TransportFetcher> {
    let http = HttpFetcher::new(config.request_timeout_secs, &config.user_agent)
        .map_err(|e| anyhow::anyhow!("failed to build HTTP client: {e}"))?;
    let render = if needs_renderer {
        render_pool(config).await
    } else {
        None
    };
    Ok(TransportFetcher::new(http, render))
}

#[cfg(feature = "browser")]
async fn render_pool(config: &AppConfig) -> Option<RenderPool> {
    use std::time::Duration;

    match roastery_scraper::ChromeBackend::launch(&config.user_agent).await {
        Ok(backend) => Some(RenderPool::new(
            Arc::new(backend),
            config.browser_pool_size,
            Duration::from_millis(config.render_settle_ms),
        )),
        Err(e) => {
            tracing::error!(error = %e, "headless browser unavailable; rendered sources will fail");
            None
        }
    }
}

#[cfg(not(feature = "browser"))]
#[allow(clippy::unused_async)]
async fn render_pool(_config: &AppConfig) -> Option<RenderPool> {
    tracing::debug!("built without the `browser` feature");
    None
}

fn total_records(results: &BTreeMap<String, CrawlResult>) -> usize {
    results.values().map(|r| r.records.len()).sum()
}

/// Log per-source counts and the first `max_errors` errors of each source.
fn report(results: &BTreeMap<String, CrawlResult>, max_errors: usize) {
    for (source_id, result) in results {
        tracing::info!(
            source = %source_id,
            attempted = result.urls_attempted,
            succeeded = result.urls_succeeded,
            records = result.records.len(),
            errors = result.errors.len(),
            deadline_exceeded = result.deadline_exceeded,
            "source summary"
        );
        for err in result.errors.iter().take(max_errors) {
            tracing::warn!(source = %source_id, url = err.url(), error = %err, "crawl error");
        }
        if result.errors.len() > max_errors {
            tracing::warn!(
                source = %source_id,
                omitted = result.errors.len() - max_errors,
                "further errors omitted from summary"
            );
        }
    }
}
