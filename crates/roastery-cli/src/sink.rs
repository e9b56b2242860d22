//! JSON file sink for crawl output.
//!
//! Groups records according to [`SaveMode`] and writes pretty-printed JSON
//! files stamped with the run time. Per-source errors go to a separate file
//! whenever any source reported one.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use roastery_core::Record;
use roastery_scraper::{CrawlError, CrawlResult};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum SaveMode {
    /// One file with every record.
    Combined,
    /// One file per source.
    Separate,
    /// Both of the above.
    Both,
}

/// Writes `results` into `dir` and returns the paths written.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or a file cannot be
/// serialized or written.
pub(crate) fn write_results(
    dir: &Path,
    results: &BTreeMap<String, CrawlResult>,
    mode: SaveMode,
    at: DateTime<Utc>,
) -> anyhow::Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;

    let stamp = at.format("%Y%m%d_%H%M%S").to_string();
    let mut written = Vec::new();

    if matches!(mode, SaveMode::Combined | SaveMode::Both) {
        let all: Vec<&Record> = results.values().flat_map(|r| &r.records).collect();
        let path = dir.join(format!("all_records_{stamp}.json"));
        write_json(&path, &all)?;
        written.push(path);
    }

    if matches!(mode, SaveMode::Separate | SaveMode::Both) {
        for (source_id, result) in results {
            if result.records.is_empty() {
                continue;
            }
            let path = dir.join(format!("{source_id}_{stamp}.json"));
            write_json(&path, &result.records)?;
            written.push(path);
        }
    }

    let errors: BTreeMap<&str, &Vec<CrawlError>> = results
        .iter()
        .filter(|(_, r)| !r.errors.is_empty())
        .map(|(id, r)| (id.as_str(), &r.errors))
        .collect();
    if !errors.is_empty() {
        let path = dir.join(format!("crawl_errors_{stamp}.json"));
        write_json(&path, &errors)?;
        written.push(path);
    }

    Ok(written)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> anyhow::Result<()> {
    let body = serde_json::to_string_pretty(value)
        .with_context(|| format!("failed to serialize {}", path.display()))?;
    fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
