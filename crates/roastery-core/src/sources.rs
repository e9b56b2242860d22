//! Declarative per-source rule definitions loaded from `config/sources.yaml`.
//!
//! A source is described entirely as data: where its listing pages live, how
//! item links are found on them, how far to paginate, and an ordered list of
//! extraction attempts per logical field on detail pages. These types carry
//! raw selector and regex strings; the scraper crate compiles them before any
//! network traffic happens.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// How a source's pages must be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// A plain HTTP GET returns the final markup.
    Static,
    /// The page is assembled client-side and needs a headless browser.
    Rendered,
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transport::Static => f.pad("static"),
            Transport::Rendered => f.pad("rendered"),
        }
    }
}

/// The logical fields a detail page can populate on a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalField {
    Origin,
    Process,
    TastingNotes,
    Price,
    Weight,
    Variety,
    Altitude,
    HarvestDate,
    RoastLevel,
}

impl LogicalField {
    pub const ALL: [LogicalField; 9] = [
        LogicalField::Origin,
        LogicalField::Process,
        LogicalField::TastingNotes,
        LogicalField::Price,
        LogicalField::Weight,
        LogicalField::Variety,
        LogicalField::Altitude,
        LogicalField::HarvestDate,
        LogicalField::RoastLevel,
    ];
}

impl std::fmt::Display for LogicalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LogicalField::Origin => "origin",
            LogicalField::Process => "process",
            LogicalField::TastingNotes => "tasting_notes",
            LogicalField::Price => "price",
            LogicalField::Weight => "weight",
            LogicalField::Variety => "variety",
            LogicalField::Altitude => "altitude",
            LogicalField::HarvestDate => "harvest_date",
            LogicalField::RoastLevel => "roast_level",
        };
        f.write_str(name)
    }
}

/// When listing traversal for one category stops, besides the page cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopCondition {
    /// Stop at the first page whose item-link selector matches nothing.
    #[default]
    EmptyListing,
    /// Also stop when a page contributes no URL that was not already seen.
    /// For sites that ignore the page parameter and keep serving page one.
    NoNewItems,
    /// The category path is a single page; no page parameter is appended.
    SinglePage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationPolicy {
    /// Hard cap on listing pages fetched per category.
    pub max_pages: u32,
    #[serde(default = "default_page_param")]
    pub page_param: String,
    #[serde(default)]
    pub stop: StopCondition,
}

fn default_page_param() -> String {
    "page".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingRules {
    /// Category paths (or absolute URLs) resolved against the source base URL.
    pub categories: Vec<String>,
    pub item_link_selector: String,
    /// Only keep detail URLs containing this substring.
    #[serde(default)]
    pub url_must_contain: Option<String>,
}

/// One extraction attempt for a logical field.
///
/// Exactly one of `selectors`, `labels`, or `patterns` must be set; `within`
/// narrows the text that `patterns` run against.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldAttempt {
    /// CSS selectors whose element text is taken directly.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selectors: Vec<String>,
    /// Label keywords matched case-insensitively against label-row headers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    /// Regexes with one capture group, run over free text.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patterns: Vec<String>,
    /// Selectors scoping `patterns`; the description text is used when empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub within: Vec<String>,
}

impl FieldAttempt {
    fn kinds_set(&self) -> usize {
        [
            !self.selectors.is_empty(),
            !self.labels.is_empty(),
            !self.patterns.is_empty(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailRules {
    /// Ordered name selectors: primary first, then fallbacks.
    pub name: Vec<String>,
    #[serde(default)]
    pub description: Vec<String>,
    /// Selectors for label/value rows (usually table rows).
    #[serde(default)]
    pub label_rows: Vec<String>,
    #[serde(default = "default_label_cell")]
    pub label_cell: String,
    #[serde(default = "default_value_cell")]
    pub value_cell: String,
    #[serde(default = "default_note_delimiters")]
    pub note_delimiters: String,
    #[serde(default)]
    pub fields: BTreeMap<LogicalField, Vec<FieldAttempt>>,
}

fn default_label_cell() -> String {
    "th".to_string()
}

fn default_value_cell() -> String {
    "td".to_string()
}

fn default_note_delimiters() -> String {
    ",&/·".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    pub base_url: String,
    pub transport: Transport,
    pub listing: ListingRules,
    pub pagination: PaginationPolicy,
    pub detail: DetailRules,
}

impl SourceConfig {
    /// Human-readable name, falling back to the id when none is configured.
    #[must_use]
    pub fn name(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.id
        } else {
            &self.display_name
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SourcesFile {
    pub sources: Vec<SourceConfig>,
}

impl SourcesFile {
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.id == id)
    }

    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.id.as_str()).collect()
    }
}

/// Load and validate the source descriptors from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_sources(path: &Path) -> Result<SourcesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SourcesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_sources(&content)
}

/// Parse and validate source descriptors from YAML text.
///
/// # Errors
///
/// Returns `ConfigError` if the text is not valid YAML for [`SourcesFile`] or
/// fails validation.
pub fn parse_sources(content: &str) -> Result<SourcesFile, ConfigError> {
    let sources_file: SourcesFile =
        serde_yaml::from_str(content).map_err(ConfigError::SourcesFileParse)?;

    validate_sources(&sources_file)?;

    Ok(sources_file)
}

fn validate_sources(sources_file: &SourcesFile) -> Result<(), ConfigError> {
    let mut seen_ids = HashSet::new();

    for source in &sources_file.sources {
        validate_id(&source.id)?;

        if !seen_ids.insert(source.id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate source id: '{}'",
                source.id
            )));
        }

        let base = source.base_url.trim();
        if !(base.starts_with("https://") || base.starts_with("http://"))
            || base.trim_start_matches("https://").trim_start_matches("http://").is_empty()
        {
            return Err(ConfigError::Validation(format!(
                "source '{}' has invalid base_url '{}'; must be an absolute http(s) URL",
                source.id, source.base_url
            )));
        }

        validate_listing(source)?;
        validate_detail(source)?;
    }

    Ok(())
}

fn validate_id(id: &str) -> Result<(), ConfigError> {
    if id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "source id must be non-empty".to_string(),
        ));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "source id '{id}' may only contain lowercase ascii letters, digits, '-' and '_'"
        )));
    }
    Ok(())
}

fn validate_listing(source: &SourceConfig) -> Result<(), ConfigError> {
    if source.listing.categories.is_empty() {
        return Err(ConfigError::Validation(format!(
            "source '{}' must list at least one category",
            source.id
        )));
    }
    if source.listing.item_link_selector.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "source '{}' has an empty item_link_selector",
            source.id
        )));
    }
    if source.pagination.max_pages == 0 {
        return Err(ConfigError::Validation(format!(
            "source '{}' has max_pages 0; must be at least 1",
            source.id
        )));
    }
    if source.pagination.page_param.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "source '{}' has an empty page_param",
            source.id
        )));
    }
    Ok(())
}

fn validate_detail(source: &SourceConfig) -> Result<(), ConfigError> {
    let detail = &source.detail;
    if detail.name.iter().all(|s| s.trim().is_empty()) {
        return Err(ConfigError::Validation(format!(
            "source '{}' must define at least one name selector",
            source.id
        )));
    }

    for (field, attempts) in &detail.fields {
        for (idx, attempt) in attempts.iter().enumerate() {
            if attempt.kinds_set() != 1 {
                return Err(ConfigError::Validation(format!(
                    "source '{}' field '{field}' attempt {idx} must set exactly one of \
                     selectors, labels, or patterns",
                    source.id
                )));
            }
            if !attempt.within.is_empty() && attempt.patterns.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "source '{}' field '{field}' attempt {idx} uses 'within' without patterns",
                    source.id
                )));
            }
            if !attempt.labels.is_empty() && detail.label_rows.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "source '{}' field '{field}' attempt {idx} uses labels but no label_rows \
                     selector is configured",
                    source.id
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "sources_test.rs"]
mod tests;
