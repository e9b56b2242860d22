//! Uniform page fetching over the static and rendered transports.

mod http;
mod render;

#[cfg(feature = "browser")]
mod chrome;

use async_trait::async_trait;
use roastery_core::Transport;

use crate::error::FetchError;
use crate::types::RawPage;

#[cfg(feature = "browser")]
pub use chrome::ChromeBackend;
pub use http::HttpFetcher;
pub use render::{RenderBackend, RenderPool, RenderSession};

/// Fetches one URL with the given transport.
///
/// Implementations never retry; retry policy lives with the caller.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, transport: Transport) -> Result<RawPage, FetchError>;
}

/// Production fetcher: plain HTTP for static sources, a pooled headless
/// browser for rendered ones.
pub struct TransportFetcher {
    http: HttpFetcher,
    render: Option<RenderPool>,
}

impl TransportFetcher {
    #[must_use]
    pub fn new(http: HttpFetcher, render: Option<RenderPool>) -> Self {
        Self { http, render }
    }

    #[must_use]
    pub fn has_renderer(&self) -> bool {
        self.render.is_some()
    }
}

#[async_trait]
impl Fetcher for TransportFetcher {
    async fn fetch(&self, url: &str, transport: Transport) -> Result<RawPage, FetchError> {
        match transport {
            Transport::Static => self.http.get(url).await,
            Transport::Rendered => match &self.render {
                Some(pool) => pool.render(url).await,
                None => Err(FetchError::Network {
                    url: url.to_owned(),
                    reason: "no render backend configured".to_owned(),
                }),
            },
        }
    }
}
