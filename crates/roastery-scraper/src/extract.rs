//! Rule interpreter turning a fetched detail page into a [`Record`].

use roastery_core::{LogicalField, Record};
use scraper::{ElementRef, Html, Node, Selector};

use crate::error::ExtractionError;
use crate::parse::{dedupe_notes, non_empty, parse_price, parse_weight, split_notes};
use crate::rules::{CompiledAttempt, CompiledSource};
use crate::types::RawPage;

/// Elements whose boundaries become line breaks in extracted text, so that
/// line-anchored patterns see one logical line per block.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "blockquote", "br", "dd", "div", "dl", "dt", "h1", "h2", "h3", "h4",
    "h5", "h6", "hr", "li", "ol", "p", "section", "table", "td", "th", "tr", "ul",
];

/// Applies one source's compiled rules to its detail pages.
///
/// Extraction is synchronous; the parsed document lives only for the duration
/// of [`Extractor::extract`].
pub struct Extractor<'a> {
    source: &'a CompiledSource,
}

impl<'a> Extractor<'a> {
    #[must_use]
    pub fn new(source: &'a CompiledSource) -> Self {
        Self { source }
    }

    /// Extracts a record from `page`.
    ///
    /// # Errors
    ///
    /// - [`ExtractionError::MalformedPage`] if the body is empty.
    /// - [`ExtractionError::MissingName`] if no name selector yields text.
    pub fn extract(&self, page: &RawPage) -> Result<Record, ExtractionError> {
        if page.html.trim().is_empty() {
            return Err(ExtractionError::MalformedPage {
                url: page.url.clone(),
                reason: "empty body".to_owned(),
            });
        }

        let doc = Html::parse_document(&page.html);
        let name = first_text(&doc, &self.source.name).ok_or_else(|| {
            ExtractionError::MissingName {
                url: page.url.clone(),
            }
        })?;

        let scope = PageScope {
            doc: &doc,
            description: self
                .source
                .description
                .iter()
                .find_map(|sel| doc.select(sel).next())
                .map(block_text)
                .unwrap_or_default(),
        };

        Ok(Record {
            source_id: self.source.id().to_owned(),
            source_name: self.source.name().to_owned(),
            name,
            origin: self.text_field(&scope, LogicalField::Origin),
            process: self.text_field(&scope, LogicalField::Process),
            tasting_notes: self.tasting_notes(&scope),
            price: self.resolve(&scope, LogicalField::Price, parse_price),
            weight: self.resolve(&scope, LogicalField::Weight, parse_weight),
            roast_level: self.text_field(&scope, LogicalField::RoastLevel),
            variety: self.text_field(&scope, LogicalField::Variety),
            altitude: self.text_field(&scope, LogicalField::Altitude),
            harvest_date: self.text_field(&scope, LogicalField::HarvestDate),
            url: page.url.clone(),
            crawled_at: page.fetched_at,
        })
    }

    fn text_field(&self, scope: &PageScope<'_>, field: LogicalField) -> Option<String> {
        self.resolve(scope, field, non_empty)
    }

    /// Walks the field's attempts in order; the first candidate that
    /// `post` accepts wins.
    fn resolve<T>(
        &self,
        scope: &PageScope<'_>,
        field: LogicalField,
        post: impl Fn(&str) -> Option<T>,
    ) -> Option<T> {
        self.source
            .attempts(field)
            .iter()
            .find_map(|attempt| {
                scope
                    .candidates(self.source, attempt, false)
                    .iter()
                    .find_map(|c| post(c))
            })
    }

    /// Notes come from every candidate of the first attempt that yields any.
    fn tasting_notes(&self, scope: &PageScope<'_>) -> Vec<String> {
        let delimiters = self.source.note_delimiters();
        for attempt in self.source.attempts(LogicalField::TastingNotes) {
            let candidates = scope.candidates(self.source, attempt, true);
            let notes = dedupe_notes(candidates.iter().flat_map(|c| split_notes(c, delimiters)));
            if !notes.is_empty() {
                return notes;
            }
        }
        Vec::new()
    }
}

struct PageScope<'d> {
    doc: &'d Html,
    description: String,
}

impl PageScope<'_> {
    /// Raw candidate strings for one attempt, in document and rule order.
    ///
    /// Scalar pattern attempts stop at the first matching pattern; `all_matches`
    /// collects every capture of every pattern instead.
    fn candidates(
        &self,
        source: &CompiledSource,
        attempt: &CompiledAttempt,
        all_matches: bool,
    ) -> Vec<String> {
        match attempt {
            CompiledAttempt::Selectors(selectors) => selectors
                .iter()
                .flat_map(|sel| self.doc.select(sel))
                .map(block_text)
                .collect(),
            CompiledAttempt::Labels(keywords) => self.labelled_values(source, keywords),
            CompiledAttempt::Patterns { patterns, within } => {
                let scoped;
                let text = if within.is_empty() {
                    &self.description
                } else {
                    scoped = within
                        .iter()
                        .flat_map(|sel| self.doc.select(sel))
                        .map(block_text)
                        .collect::<Vec<_>>()
                        .join("\n");
                    &scoped
                };

                let mut out = Vec::new();
                for re in patterns {
                    out.extend(
                        re.captures_iter(text)
                            .filter_map(|caps| caps.get(1))
                            .map(|m| m.as_str().to_owned()),
                    );
                    if !all_matches && !out.is_empty() {
                        break;
                    }
                }
                out
            }
        }
    }

    fn labelled_values(&self, source: &CompiledSource, keywords: &[String]) -> Vec<String> {
        let mut out = Vec::new();
        for row in source
            .label_rows
            .iter()
            .flat_map(|sel| self.doc.select(sel))
        {
            let Some(label) = row.select(&source.label_cell).next() else {
                continue;
            };
            let label = block_text(label).to_lowercase();
            if !keywords.iter().any(|k| label.contains(k.as_str())) {
                continue;
            }
            if let Some(value) = row.select(&source.value_cell).next() {
                out.push(block_text(value));
            }
        }
        out
    }
}

fn first_text(doc: &Html, selectors: &[Selector]) -> Option<String> {
    selectors
        .iter()
        .flat_map(|sel| doc.select(sel))
        .find_map(|el| non_empty(&block_text(el)))
}

/// Text content of `el` with a line break at every block boundary.
fn block_text(el: ElementRef<'_>) -> String {
    let mut out = String::new();
    push_text(el, &mut out);
    out
}

fn push_text(el: ElementRef<'_>, out: &mut String) {
    let tag = el.value().name();
    if tag == "script" || tag == "style" {
        return;
    }
    let is_block = BLOCK_ELEMENTS.contains(&tag);
    if is_block {
        out.push('\n');
    }
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    push_text(child_el, out);
                }
            }
            _ => {}
        }
    }
    if is_block {
        out.push('\n');
    }
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
