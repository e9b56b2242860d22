//! Canonicalization and deduplication of one source's records.
//!
//! Normalization is idempotent: running it over its own output changes
//! nothing. Records from different sources are never merged.

use std::collections::HashSet;

use roastery_core::Record;

use crate::parse::{clean_text, dedupe_notes, non_empty, parse_weight};

/// Canonicalizes every textual field of a single record.
///
/// Whitespace is collapsed, blank optionals become `None`, weights are
/// re-parsed into `<digits><g|kg>` form and tasting notes are deduplicated.
#[must_use]
pub fn normalize_record(record: Record) -> Record {
    let text = |value: Option<String>| value.as_deref().and_then(non_empty);

    Record {
        source_id: record.source_id.trim().to_owned(),
        source_name: clean_text(&record.source_name),
        name: clean_text(&record.name),
        origin: text(record.origin),
        process: text(record.process),
        tasting_notes: dedupe_notes(record.tasting_notes),
        price: record.price,
        weight: record
            .weight
            .as_deref()
            .and_then(|w| parse_weight(w).or_else(|| non_empty(w))),
        roast_level: text(record.roast_level),
        variety: text(record.variety),
        altitude: text(record.altitude),
        harvest_date: text(record.harvest_date),
        url: record.url.trim().to_owned(),
        crawled_at: record.crawled_at,
    }
}

/// Normalizes a source's records and drops repeated URLs, keeping the first
/// occurrence and the original order.
#[must_use]
pub fn normalize_records(records: Vec<Record>) -> Vec<Record> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .map(normalize_record)
        .filter(|record| seen.insert(record.url.clone()))
        .collect()
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
