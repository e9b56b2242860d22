//! Rendered transport: a bounded pool of headless-browser sessions.
//!
//! Each call acquires one permit and opens one session for its whole
//! duration. The permit is released when the call ends, whichever way it
//! ends; the session is closed on every path that reaches the end of
//! [`RenderPool::render`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Semaphore;

use crate::error::FetchError;
use crate::types::RawPage;

/// Opens browser sessions. Shared by every rendered source in a run.
#[async_trait]
pub trait RenderBackend: Send + Sync {
    async fn open(&self) -> Result<Box<dyn RenderSession>, FetchError>;
}

/// One browser tab.
#[async_trait]
pub trait RenderSession: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), FetchError>;

    /// Serialized DOM as it currently stands.
    async fn content(&mut self) -> Result<String, FetchError>;

    async fn close(self: Box<Self>);
}

pub struct RenderPool {
    backend: Arc<dyn RenderBackend>,
    permits: Arc<Semaphore>,
    settle: Duration,
}

impl RenderPool {
    /// `pool_size` is clamped to at least one concurrent session.
    #[must_use]
    pub fn new(backend: Arc<dyn RenderBackend>, pool_size: usize, settle: Duration) -> Self {
        Self {
            backend,
            permits: Arc::new(Semaphore::new(pool_size.max(1))),
            settle,
        }
    }

    /// Navigates to `url`, waits for the settle interval, then snapshots the DOM.
    ///
    /// # Errors
    ///
    /// Propagates the backend's [`FetchError`] from opening, navigating, or
    /// reading the page.
    pub async fn render(&self, url: &str) -> Result<RawPage, FetchError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| FetchError::Network {
                url: url.to_owned(),
                reason: format!("render pool closed: {e}"),
            })?;

        let mut session = self.backend.open().await?;
        let outcome = self.snapshot(session.as_mut(), url).await;
        session.close().await;

        let html = outcome?;
        tracing::debug!(url, bytes = html.len(), "rendered page");

        Ok(RawPage {
            url: url.to_owned(),
            html,
            fetched_at: Utc::now(),
            status_code: 200,
        })
    }

    async fn snapshot(
        &self,
        session: &mut dyn RenderSession,
        url: &str,
    ) -> Result<String, FetchError> {
        session.navigate(url).await?;
        tokio::time::sleep(self.settle).await;
        session.content().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Counters {
        opened: AtomicUsize,
        closed: AtomicUsize,
        live: AtomicUsize,
        peak: AtomicUsize,
    }

    struct FakeBackend {
        counters: Arc<Counters>,
        fail_navigation: bool,
        visited: Arc<Mutex<Vec<String>>>,
    }

    struct FakeSession {
        counters: Arc<Counters>,
        fail_navigation: bool,
        visited: Arc<Mutex<Vec<String>>>,
        url: Option<String>,
    }

    #[async_trait]
    impl RenderBackend for FakeBackend {
        async fn open(&self) -> Result<Box<dyn RenderSession>, FetchError> {
            self.counters.opened.fetch_add(1, Ordering::SeqCst);
            let live = self.counters.live.fetch_add(1, Ordering::SeqCst) + 1;
            self.counters.peak.fetch_max(live, Ordering::SeqCst);
            Ok(Box::new(FakeSession {
                counters: Arc::clone(&self.counters),
                fail_navigation: self.fail_navigation,
                visited: Arc::clone(&self.visited),
                url: None,
            }))
        }
    }

    #[async_trait]
    impl RenderSession for FakeSession {
        async fn navigate(&mut self, url: &str) -> Result<(), FetchError> {
            if self.fail_navigation {
                return Err(FetchError::Network {
                    url: url.to_owned(),
                    reason: "net::ERR_NAME_NOT_RESOLVED".to_owned(),
                });
            }
            self.visited.lock().unwrap().push(url.to_owned());
            self.url = Some(url.to_owned());
            Ok(())
        }

        async fn content(&mut self) -> Result<String, FetchError> {
            Ok(format!(
                "<html><body>{}</body></html>",
                self.url.clone().unwrap_or_default()
            ))
        }

        async fn close(self: Box<Self>) {
            self.counters.live.fetch_sub(1, Ordering::SeqCst);
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn pool(fail_navigation: bool, size: usize) -> (RenderPool, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let backend = FakeBackend {
            counters: Arc::clone(&counters),
            fail_navigation,
            visited: Arc::new(Mutex::new(Vec::new())),
        };
        (
            RenderPool::new(Arc::new(backend), size, Duration::ZERO),
            counters,
        )
    }

    #[tokio::test]
    async fn render_returns_snapshot_and_closes_session() {
        let (pool, counters) = pool(false, 2);
        let page = pool.render("https://centercoffee.kr/shop").await.unwrap();
        assert!(page.html.contains("https://centercoffee.kr/shop"));
        assert_eq!(page.status_code, 200);
        assert_eq!(counters.opened.load(Ordering::SeqCst), 1);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
        assert_eq!(counters.live.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn navigation_failure_still_releases_session() {
        let (pool, counters) = pool(true, 1);
        let err = pool.render("https://unreachable.invalid").await.unwrap_err();
        assert!(matches!(err, FetchError::Network { .. }));
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
        assert_eq!(counters.live.load(Ordering::SeqCst), 0);

        // The only permit must be free again for the next call.
        let next =
            tokio::time::timeout(Duration::from_secs(1), pool.render("https://x.test/1")).await;
        assert!(matches!(next, Ok(Err(FetchError::Network { .. }))));
    }

    #[tokio::test]
    async fn concurrent_renders_never_exceed_pool_size() {
        let (pool, counters) = pool(false, 2);
        let urls: Vec<String> = (0..6).map(|i| format!("https://x.test/{i}")).collect();
        let results = futures::future::join_all(urls.iter().map(|u| pool.render(u))).await;
        assert!(results.iter().all(Result::is_ok));
        assert_eq!(counters.opened.load(Ordering::SeqCst), 6);
        assert!(counters.peak.load(Ordering::SeqCst) <= 2);
    }
}
