use chrono::{DateTime, Utc};
use roastery_core::Record;
use serde::Serialize;

use crate::error::CrawlError;

/// Transport output for one URL. Consumed by a single extraction and dropped.
#[derive(Debug, Clone)]
pub struct RawPage {
    /// Final URL the content was read from.
    pub url: String,
    pub html: String,
    pub fetched_at: DateTime<Utc>,
    /// HTTP status for static fetches; rendered fetches report 200 on success.
    pub status_code: u16,
}

/// Per-source outcome of a crawl run.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlResult {
    pub source_id: String,
    /// Records in the order their URLs were discovered.
    pub records: Vec<Record>,
    pub errors: Vec<CrawlError>,
    pub urls_attempted: usize,
    pub urls_succeeded: usize,
    /// The run deadline cut this source short.
    pub deadline_exceeded: bool,
}

impl CrawlResult {
    #[must_use]
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            records: Vec::new(),
            errors: Vec::new(),
            urls_attempted: 0,
            urls_succeeded: 0,
            deadline_exceeded: false,
        }
    }
}
