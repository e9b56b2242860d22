//! Listing traversal: walks each category's pages and collects detail URLs.

use std::collections::HashSet;

use reqwest::Url;
use roastery_core::StopCondition;
use scraper::Html;

use crate::error::{CrawlError, FetchError, SourceError};
use crate::rules::CompiledSource;
use crate::session::SourceSession;

/// Traversal state for one (source, category) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Start,
    FetchingPage(u32),
    HasMore,
    Exhausted,
    PageCapReached,
}

impl PageState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, PageState::Exhausted | PageState::PageCapReached)
    }
}

/// What one fetched listing page contributed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageOutcome {
    /// Item links matched on the page after filtering.
    pub links: usize,
    /// Links not seen earlier in this source's run.
    pub new_links: usize,
}

/// State after listing page `page` was fetched with `outcome`.
#[must_use]
pub fn after_page(
    page: u32,
    outcome: PageOutcome,
    max_pages: u32,
    stop: StopCondition,
) -> PageState {
    if outcome.links == 0 {
        return PageState::Exhausted;
    }
    match stop {
        StopCondition::SinglePage => return PageState::Exhausted,
        StopCondition::NoNewItems if outcome.new_links == 0 => return PageState::Exhausted,
        _ => {}
    }
    if page >= max_pages {
        PageState::PageCapReached
    } else {
        PageState::HasMore
    }
}

/// Detail URLs discovered for one source, in discovery order and unique.
#[derive(Debug, Default)]
pub struct Discovery {
    pub urls: Vec<String>,
    /// Listing pages that failed after at least one listing page succeeded.
    pub errors: Vec<CrawlError>,
    pub pages_fetched: usize,
}

/// URL of listing page `page` for `category`.
#[must_use]
pub fn listing_url(category: &Url, page_param: &str, page: u32, stop: StopCondition) -> Url {
    let mut url = category.clone();
    if stop != StopCondition::SinglePage {
        url.query_pairs_mut()
            .append_pair(page_param, &page.to_string());
    }
    url
}

/// Item links on a listing page, resolved against the source base URL.
///
/// Fragment-only and `javascript:` hrefs are skipped, as are URLs missing
/// the source's required substring.
#[must_use]
pub fn item_links(source: &CompiledSource, html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let must_contain = source.url_must_contain();

    doc.select(&source.item_link)
        .filter_map(|a| a.value().attr("href"))
        .map(str::trim)
        .filter(|href| {
            !href.is_empty()
                && !href.starts_with('#')
                && !href.to_ascii_lowercase().starts_with("javascript:")
        })
        .filter_map(|href| source.base_url.join(href).ok())
        .map(String::from)
        .filter(|url| must_contain.is_none_or(|needle| url.contains(needle)))
        .collect()
}

/// Walks every category of `source` and returns its detail URLs.
///
/// A failed listing fetch ends that category. When no listing page of any
/// category could be fetched the source itself fails.
///
/// # Errors
///
/// Returns [`SourceError::ListingUnreachable`] if every listing fetch failed.
pub async fn discover(
    source: &CompiledSource,
    session: &mut SourceSession<'_>,
) -> Result<Discovery, SourceError> {
    let mut discovery = Discovery::default();
    let mut seen = HashSet::new();
    let mut first_failure: Option<FetchError> = None;

    'categories: for category in &source.categories {
        let mut state = PageState::Start;
        let mut page = 1u32;

        while !state.is_terminal() {
            if session.deadline_reached() {
                break 'categories;
            }
            state = PageState::FetchingPage(page);
            let url = listing_url(category, source.page_param(), page, source.stop());

            let listing = match session.fetch(url.as_str()).await {
                Ok(listing) => listing,
                Err(err) => {
                    tracing::warn!(
                        source = %source.id(),
                        url = %url,
                        error = %err,
                        "listing page fetch failed"
                    );
                    if first_failure.is_none() {
                        first_failure = Some(err.clone());
                    }
                    discovery.errors.push(err.into());
                    break;
                }
            };
            discovery.pages_fetched += 1;

            let links = item_links(source, &listing.html);
            let found = links.len();
            let mut new_links = 0usize;
            for link in links {
                if seen.insert(link.clone()) {
                    discovery.urls.push(link);
                    new_links += 1;
                }
            }
            tracing::debug!(
                source = %source.id(),
                ?state,
                url = %url,
                found,
                new_links,
                "listing page scanned"
            );

            state = after_page(
                page,
                PageOutcome {
                    links: found,
                    new_links,
                },
                source.max_pages(),
                source.stop(),
            );
            page += 1;
        }
    }

    if discovery.pages_fetched == 0 {
        if let Some(cause) = first_failure {
            return Err(SourceError::ListingUnreachable {
                source_id: source.id().to_owned(),
                url: cause.url().to_owned(),
                cause,
            });
        }
    }

    Ok(discovery)
}
