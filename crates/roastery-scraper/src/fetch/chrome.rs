use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;

use super::render::{RenderBackend, RenderSession};
use crate::error::{FetchError, ScraperError};

/// Headless Chrome driven over the DevTools protocol. One browser process per
/// run; every session is a fresh tab.
pub struct ChromeBackend {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl ChromeBackend {
    /// Launches a headless Chrome reporting `user_agent`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Browser`] if no Chrome executable is found or it
    /// fails to start.
    pub async fn launch(user_agent: &str) -> Result<Self, ScraperError> {
        let config = BrowserConfig::builder()
            .no_sandbox()
            .arg(format!("--user-agent={user_agent}"))
            .build()
            .map_err(ScraperError::Browser)?;

        let (browser, mut events) = Browser::launch(config)
            .await
            .map_err(|e| ScraperError::Browser(e.to_string()))?;

        // The browser only makes progress while its event stream is polled.
        let handler = tokio::spawn(async move { while events.next().await.is_some() {} });

        tracing::info!("launched headless chrome");
        Ok(Self { browser, handler })
    }
}

impl Drop for ChromeBackend {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

#[async_trait]
impl RenderBackend for ChromeBackend {
    async fn open(&self) -> Result<Box<dyn RenderSession>, FetchError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| cdp_error("about:blank", &e))?;
        Ok(Box::new(ChromeSession { page }))
    }
}

struct ChromeSession {
    page: Page,
}

#[async_trait]
impl RenderSession for ChromeSession {
    async fn navigate(&mut self, url: &str) -> Result<(), FetchError> {
        self.page
            .goto(url)
            .await
            .map(|_| ())
            .map_err(|e| cdp_error(url, &e))
    }

    async fn content(&mut self) -> Result<String, FetchError> {
        let url = self.page.url().await.ok().flatten().unwrap_or_default();
        self.page.content().await.map_err(|e| cdp_error(&url, &e))
    }

    async fn close(self: Box<Self>) {
        if let Err(e) = self.page.close().await {
            tracing::debug!(error = %e, "failed to close browser tab");
        }
    }
}

fn cdp_error(url: &str, err: &CdpError) -> FetchError {
    match err {
        CdpError::Timeout => FetchError::Timeout {
            url: url.to_owned(),
        },
        other => FetchError::Network {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}
