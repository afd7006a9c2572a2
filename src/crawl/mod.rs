//! Browser session driver
//!
//! This module provides:
//! - The `PageLoader` seam with plain HTTP and headless Chrome implementations
//! - A global requests-per-minute ceiling
//! - `BrowserSession::visit`, one bounded page visit feeding an extraction handler

mod http;
mod rate_limit;
mod renderer;

pub use http::*;
pub use rate_limit::*;
pub use renderer::*;

use crate::config::{BrowserEngine, Config, PageTimeouts};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// A loaded page
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// Final URL after any redirects
    pub url: String,
    pub html: String,
    pub title: Option<String>,
    /// Time taken to load (milliseconds)
    pub render_time_ms: u64,
}

/// Loads one page; implementations own their navigation mechanics
#[async_trait]
pub trait PageLoader: Send + Sync {
    /// Load `url`, failing with `Error::Timeout` past `navigation_timeout`
    async fn load(&self, url: &str, navigation_timeout: Duration) -> Result<RenderedPage>;

    /// Release browser resources
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// A page loader behind the session-wide rate limiter
#[derive(Clone)]
pub struct BrowserSession {
    loader: Arc<dyn PageLoader>,
    limiter: RequestRateLimiter,
}

impl BrowserSession {
    pub fn new(loader: Arc<dyn PageLoader>, requests_per_minute: u32) -> Self {
        Self {
            loader,
            limiter: RequestRateLimiter::new(requests_per_minute),
        }
    }

    /// Build the loader selected by `[browser] engine`
    pub fn from_config(config: &Config) -> Result<Self> {
        let loader: Arc<dyn PageLoader> = match config.browser.engine {
            BrowserEngine::Http => Arc::new(HttpLoader::new(&config.browser)?),
            BrowserEngine::Chromium => {
                if !is_js_rendering_available() {
                    return Err(Error::Config(
                        "chromium engine requires the js-rendering feature".to_string(),
                    ));
                }
                Arc::new(HeadlessRenderer::new(RendererConfig::from(&config.browser)))
            }
        };
        info!(
            "Browser session: {:?} engine, {} requests/minute",
            config.browser.engine, config.scrape.requests_per_minute
        );
        Ok(Self::new(loader, config.scrape.requests_per_minute))
    }

    /// Load `url` and run `handler` on the page
    ///
    /// Waits for a rate-limit permit first. Loading honours the navigation
    /// timeout; loading plus the handler together are bounded by the
    /// handler timeout.
    pub async fn visit<T, F>(&self, url: &str, timeouts: PageTimeouts, handler: F) -> Result<T>
    where
        F: FnOnce(&RenderedPage) -> Result<T> + Send,
        T: Send,
    {
        self.limiter.wait().await;
        debug!("Visiting {}", url);

        let work = async {
            let page = self.loader.load(url, timeouts.navigation).await?;
            debug!("Loaded {} in {}ms", page.url, page.render_time_ms);
            handler(&page)
        };

        tokio::time::timeout(timeouts.handler, work)
            .await
            .map_err(|_| {
                Error::Timeout(format!(
                    "handling {} exceeded {}s",
                    url,
                    timeouts.handler.as_secs_f64()
                ))
            })?
    }

    pub async fn close(&self) -> Result<()> {
        self.loader.close().await
    }
}

/// Serves canned HTML by URL; unknown URLs fail like an unreachable host
#[cfg(test)]
#[derive(Default)]
pub(crate) struct FakeLoader {
    pages: std::sync::Mutex<std::collections::HashMap<String, String>>,
    visits: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl FakeLoader {
    pub(crate) fn serve(&self, url: &str, html: &str) {
        self.pages.lock().unwrap().insert(url.to_string(), html.to_string());
    }

    pub(crate) fn visits(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl PageLoader for FakeLoader {
    async fn load(&self, url: &str, _navigation_timeout: Duration) -> Result<RenderedPage> {
        self.visits.lock().unwrap().push(url.to_string());
        let html = self
            .pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| Error::Scrape(format!("net::ERR_NAME_NOT_RESOLVED at {}", url)))?;
        Ok(RenderedPage {
            url: url.to_string(),
            html,
            title: None,
            render_time_ms: 0,
        })
    }
}
