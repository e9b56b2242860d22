//! Value parsers applied to extraction candidates.
//!
//! All functions are pure and total: input that does not carry a value
//! yields `None` or an empty list, never an error.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d[\d,]*").expect("valid regex"));
static WEIGHT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d[\d,]*(?:\.\d+)?) ?(kg|g)(?:[^a-z]|$)").expect("valid regex")
});

/// Extracts an integer price from display text.
///
/// Takes the first run of digits (thousands separators allowed) and strips the
/// separators: `"18,000원"` yields `18000`. Text without digits, such as
/// `"문의"`, yields `None`.
#[must_use]
pub fn parse_price(text: &str) -> Option<u64> {
    let run = PRICE_RE.find(text)?;
    let digits: String = run.as_str().chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Extracts the first `<number><unit>` weight with unit `g` or `kg`.
///
/// At most one space may separate number and unit, and the unit must not run
/// on into a Latin word, so `"Lot 2 Geisha"` carries no weight. Thousands
/// separators are dropped and the unit lowercased: `"1,000 G"` yields
/// `"1000g"`, `"1.5kg"` stays `"1.5kg"`.
#[must_use]
pub fn parse_weight(text: &str) -> Option<String> {
    let caps = WEIGHT_RE.captures(text)?;
    let number: String = caps[1].chars().filter(|c| *c != ',').collect();
    Some(format!("{number}{}", caps[2].to_ascii_lowercase()))
}

/// Collapses every whitespace run to a single space and trims the ends.
#[must_use]
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// [`clean_text`], mapping an empty result to `None`.
#[must_use]
pub fn non_empty(text: &str) -> Option<String> {
    let cleaned = clean_text(text);
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Splits a raw notes string on any of `delimiters`, cleaning each piece and
/// dropping empty ones.
#[must_use]
pub fn split_notes(text: &str, delimiters: &str) -> Vec<String> {
    text.split(|c: char| delimiters.contains(c))
        .filter_map(non_empty)
        .collect()
}

/// Removes duplicate notes, comparing case- and whitespace-insensitively.
///
/// The first spelling seen is kept and first-seen order is preserved, so
/// applying this twice is the same as applying it once.
#[must_use]
pub fn dedupe_notes<I, S>(notes: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for note in notes {
        let Some(cleaned) = non_empty(note.as_ref()) else {
            continue;
        };
        if seen.insert(cleaned.to_lowercase()) {
            out.push(cleaned);
        }
    }
    out
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;
