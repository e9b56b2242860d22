//! Compilation of source descriptors into ready-to-run rule sets.
//!
//! Every selector and pattern a source uses is parsed here, once, so a typo in
//! `sources.yaml` fails the run before any request is made.

use regex::{Regex, RegexBuilder};
use reqwest::Url;
use roastery_core::{FieldAttempt, LogicalField, SourceConfig, StopCondition, Transport};
use scraper::Selector;

use crate::error::ScraperError;

/// Description-text patterns every source falls back to for these fields when
/// its own rules carry no pattern attempt for them.
const FREE_TEXT_FALLBACKS: &[(LogicalField, &str)] = &[
    (LogicalField::Weight, r"(\d[\d,]*(?:\.\d+)? ?k?g)(?:[^a-z]|$)"),
    (
        LogicalField::HarvestDate,
        r"(?:harvest(?:ed)?|수확)[^:：\n]{0,12}[:：]\s*([^\n]+)",
    ),
];

/// One compiled extraction attempt for a logical field.
#[derive(Debug)]
pub(crate) enum CompiledAttempt {
    /// Element text of every match, per selector in order.
    Selectors(Vec<Selector>),
    /// Lowercased keywords matched as substrings of label cells.
    Labels(Vec<String>),
    /// Patterns run over the `within` scope, or the description when empty.
    Patterns {
        patterns: Vec<Regex>,
        within: Vec<Selector>,
    },
}

/// A [`SourceConfig`] with all selectors, patterns and URLs parsed.
#[derive(Debug)]
pub struct CompiledSource {
    config: SourceConfig,
    pub(crate) base_url: Url,
    pub(crate) categories: Vec<Url>,
    pub(crate) item_link: Selector,
    pub(crate) name: Vec<Selector>,
    pub(crate) description: Vec<Selector>,
    pub(crate) label_rows: Vec<Selector>,
    pub(crate) label_cell: Selector,
    pub(crate) value_cell: Selector,
    pub(crate) fields: Vec<(LogicalField, Vec<CompiledAttempt>)>,
}

impl CompiledSource {
    /// Compiles one source descriptor.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::InvalidBaseUrl`] if the base URL or a category path
    ///   cannot be resolved.
    /// - [`ScraperError::InvalidSelector`] for any CSS selector that does not parse.
    /// - [`ScraperError::InvalidPattern`] for a regex that does not compile or
    ///   has no capture group.
    pub fn compile(config: &SourceConfig) -> Result<Self, ScraperError> {
        let id = config.id.as_str();
        let base_url = Url::parse(config.base_url.trim()).map_err(|e| {
            ScraperError::InvalidBaseUrl {
                source_id: id.to_owned(),
                base_url: config.base_url.clone(),
                reason: e.to_string(),
            }
        })?;

        let categories = config
            .listing
            .categories
            .iter()
            .map(|category| {
                base_url
                    .join(category.trim())
                    .map_err(|e| ScraperError::InvalidBaseUrl {
                        source_id: id.to_owned(),
                        base_url: format!("{base_url} + {category}"),
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let detail = &config.detail;
        let mut fields = detail
            .fields
            .iter()
            .map(|(field, attempts)| {
                let compiled = attempts
                    .iter()
                    .map(|attempt| compile_attempt(id, attempt))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((*field, compiled))
            })
            .collect::<Result<Vec<_>, ScraperError>>()?;
        add_free_text_fallbacks(id, &mut fields)?;

        Ok(Self {
            base_url,
            categories,
            item_link: selector(id, &config.listing.item_link_selector)?,
            name: selectors(id, &detail.name)?,
            description: selectors(id, &detail.description)?,
            label_rows: selectors(id, &detail.label_rows)?,
            label_cell: selector(id, &detail.label_cell)?,
            value_cell: selector(id, &detail.value_cell)?,
            fields,
            config: config.clone(),
        })
    }

    /// Compiles every descriptor, failing on the first invalid one.
    ///
    /// # Errors
    ///
    /// See [`CompiledSource::compile`].
    pub fn compile_all(configs: &[SourceConfig]) -> Result<Vec<Self>, ScraperError> {
        configs.iter().map(Self::compile).collect()
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.config.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.config.name()
    }

    #[must_use]
    pub fn transport(&self) -> Transport {
        self.config.transport
    }

    #[must_use]
    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    pub(crate) fn max_pages(&self) -> u32 {
        self.config.pagination.max_pages
    }

    pub(crate) fn page_param(&self) -> &str {
        &self.config.pagination.page_param
    }

    pub(crate) fn stop(&self) -> StopCondition {
        self.config.pagination.stop
    }

    pub(crate) fn url_must_contain(&self) -> Option<&str> {
        self.config.listing.url_must_contain.as_deref()
    }

    pub(crate) fn note_delimiters(&self) -> &str {
        &self.config.detail.note_delimiters
    }

    pub(crate) fn attempts(&self, field: LogicalField) -> &[CompiledAttempt] {
        self.fields
            .iter()
            .find(|(f, _)| *f == field)
            .map_or(&[], |(_, attempts)| attempts.as_slice())
    }
}

fn add_free_text_fallbacks(
    source_id: &str,
    fields: &mut Vec<(LogicalField, Vec<CompiledAttempt>)>,
) -> Result<(), ScraperError> {
    for (field, raw) in FREE_TEXT_FALLBACKS {
        let fallback = CompiledAttempt::Patterns {
            patterns: vec![pattern(source_id, raw)?],
            within: Vec::new(),
        };
        match fields.iter_mut().find(|(f, _)| f == field) {
            Some((_, attempts)) => {
                if !attempts
                    .iter()
                    .any(|a| matches!(a, CompiledAttempt::Patterns { .. }))
                {
                    attempts.push(fallback);
                }
            }
            None => fields.push((*field, vec![fallback])),
        }
    }
    Ok(())
}

fn compile_attempt(source_id: &str, attempt: &FieldAttempt) -> Result<CompiledAttempt, ScraperError> {
    if !attempt.patterns.is_empty() {
        let patterns = attempt
            .patterns
            .iter()
            .map(|p| pattern(source_id, p))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(CompiledAttempt::Patterns {
            patterns,
            within: selectors(source_id, &attempt.within)?,
        });
    }
    if !attempt.labels.is_empty() {
        return Ok(CompiledAttempt::Labels(
            attempt.labels.iter().map(|l| l.trim().to_lowercase()).collect(),
        ));
    }
    Ok(CompiledAttempt::Selectors(selectors(
        source_id,
        &attempt.selectors,
    )?))
}

fn selector(source_id: &str, raw: &str) -> Result<Selector, ScraperError> {
    Selector::parse(raw).map_err(|e| ScraperError::InvalidSelector {
        source_id: source_id.to_owned(),
        selector: raw.to_owned(),
        reason: e.to_string(),
    })
}

fn selectors(source_id: &str, raw: &[String]) -> Result<Vec<Selector>, ScraperError> {
    raw.iter()
        .filter(|s| !s.trim().is_empty())
        .map(|s| selector(source_id, s))
        .collect()
}

fn pattern(source_id: &str, raw: &str) -> Result<Regex, ScraperError> {
    let invalid = |reason: String| ScraperError::InvalidPattern {
        source_id: source_id.to_owned(),
        pattern: raw.to_owned(),
        reason,
    };
    let re = RegexBuilder::new(raw)
        .case_insensitive(true)
        .build()
        .map_err(|e| invalid(e.to_string()))?;
    if re.captures_len() < 2 {
        return Err(invalid("pattern has no capture group".to_owned()));
    }
    Ok(re)
}

#[cfg(test)]
mod tests {
    use roastery_core::parse_sources;

    use super::*;

    const SOURCE: &str = r#"
sources:
  - id: kihei
    base_url: https://kihei.kr
    transport: static
    listing:
      categories: ["/product/list.html?cate_no=42"]
      item_link_selector: "ul.prdList li div.thumbnail a"
    pagination:
      max_pages: 5
    detail:
      name: ["div.headingArea h2"]
      label_rows: ["table tbody tr"]
      fields:
        origin:
          - labels: [" 원산지 ", "Origin"]
          - patterns: ['(?:Farm|농장)[:\s]*([^\n,]+)']
"#;

    fn config() -> SourceConfig {
        parse_sources(SOURCE).unwrap().sources.remove(0)
    }

    #[test]
    fn compiles_valid_source() {
        let compiled = CompiledSource::compile(&config()).unwrap();
        assert_eq!(compiled.id(), "kihei");
        assert_eq!(compiled.name(), "kihei");
        assert_eq!(
            compiled.categories[0].as_str(),
            "https://kihei.kr/product/list.html?cate_no=42"
        );
        let origin = compiled.attempts(LogicalField::Origin);
        assert_eq!(origin.len(), 2);
        assert!(
            matches!(&origin[0], CompiledAttempt::Labels(k) if k == &vec!["원산지".to_string(), "origin".to_string()])
        );
        assert!(compiled.attempts(LogicalField::Variety).is_empty());
    }

    #[test]
    fn patterns_are_case_insensitive() {
        let compiled = CompiledSource::compile(&config()).unwrap();
        let CompiledAttempt::Patterns { patterns, .. } = &compiled.attempts(LogicalField::Origin)[1]
        else {
            panic!("expected pattern attempt");
        };
        assert!(patterns[0].is_match("FARM: Halo Beriti"));
    }

    #[test]
    fn rejects_invalid_selector() {
        let mut cfg = config();
        cfg.listing.item_link_selector = "div[".to_string();
        let err = CompiledSource::compile(&cfg).unwrap_err();
        assert!(
            matches!(err, ScraperError::InvalidSelector { ref selector, .. } if selector == "div["),
            "expected InvalidSelector, got: {err:?}"
        );
    }

    #[test]
    fn rejects_pattern_without_capture_group() {
        let mut cfg = config();
        cfg.detail.fields.insert(
            LogicalField::Process,
            vec![FieldAttempt {
                patterns: vec!["Process: washed".to_string()],
                ..FieldAttempt::default()
            }],
        );
        let err = CompiledSource::compile(&cfg).unwrap_err();
        assert!(err.to_string().contains("no capture group"), "got: {err}");
    }

    #[test]
    fn rejects_malformed_pattern() {
        let mut cfg = config();
        cfg.detail.fields.insert(
            LogicalField::Process,
            vec![FieldAttempt {
                patterns: vec!["(unclosed".to_string()],
                ..FieldAttempt::default()
            }],
        );
        assert!(matches!(
            CompiledSource::compile(&cfg),
            Err(ScraperError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn weight_and_harvest_date_always_get_a_free_text_fallback() {
        let compiled = CompiledSource::compile(&config()).unwrap();
        for field in [LogicalField::Weight, LogicalField::HarvestDate] {
            let attempts = compiled.attempts(field);
            assert_eq!(attempts.len(), 1, "{field}");
            assert!(matches!(
                &attempts[0],
                CompiledAttempt::Patterns { within, .. } if within.is_empty()
            ));
        }
    }

    #[test]
    fn free_text_fallback_follows_structural_attempts() {
        let mut cfg = config();
        cfg.detail.fields.insert(
            LogicalField::HarvestDate,
            vec![FieldAttempt {
                labels: vec!["수확".to_string()],
                ..FieldAttempt::default()
            }],
        );
        let compiled = CompiledSource::compile(&cfg).unwrap();
        let attempts = compiled.attempts(LogicalField::HarvestDate);
        assert_eq!(attempts.len(), 2);
        assert!(matches!(&attempts[0], CompiledAttempt::Labels(_)));
        let CompiledAttempt::Patterns { patterns, .. } = &attempts[1] else {
            panic!("expected pattern attempt");
        };
        let caps = patterns[0].captures("수확 연도 : 2023/24").unwrap();
        assert_eq!(&caps[1], "2023/24");
    }

    #[test]
    fn configured_patterns_replace_the_free_text_fallback() {
        let mut cfg = config();
        cfg.detail.fields.insert(
            LogicalField::Weight,
            vec![FieldAttempt {
                patterns: vec![r"(?:용량)[:\s]*(\d+\s*g)".to_string()],
                ..FieldAttempt::default()
            }],
        );
        let compiled = CompiledSource::compile(&cfg).unwrap();
        let attempts = compiled.attempts(LogicalField::Weight);
        assert_eq!(attempts.len(), 1);
        let CompiledAttempt::Patterns { patterns, .. } = &attempts[0] else {
            panic!("expected pattern attempt");
        };
        assert!(patterns[0].as_str().contains("용량"));
    }

    #[test]
    fn absolute_category_urls_are_kept() {
        let mut cfg = config();
        cfg.listing.categories = vec!["https://shop.kihei.kr/list?c=1".to_string()];
        let compiled = CompiledSource::compile(&cfg).unwrap();
        assert_eq!(compiled.categories[0].as_str(), "https://shop.kihei.kr/list?c=1");
    }
}
