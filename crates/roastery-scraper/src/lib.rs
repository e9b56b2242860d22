pub mod error;
pub mod extract;
pub mod fetch;
pub mod normalize;
pub mod orchestrator;
pub mod pagination;
pub mod parse;
pub mod rate_limit;
pub mod rules;
pub mod session;
pub mod types;

pub use error::{CrawlError, ExtractionError, FetchError, ScraperError, SourceError};
pub use extract::Extractor;
#[cfg(feature = "browser")]
pub use fetch::ChromeBackend;
pub use fetch::{Fetcher, HttpFetcher, RenderBackend, RenderPool, RenderSession, TransportFetcher};
pub use normalize::{normalize_record, normalize_records};
pub use orchestrator::{CrawlSettings, Orchestrator};
pub use rules::CompiledSource;
pub use types::{CrawlResult, RawPage};
