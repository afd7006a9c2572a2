//! Headless Chrome page loader for script-rendered catalogue pages
//!
//! Drives Chrome over the DevTools Protocol via chromiumoxide. The browser
//! is launched on first use and each page gets its own tab.

use super::{PageLoader, RenderedPage};
use crate::config::BrowserConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Renderer settings taken from `[browser]`
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Time to wait after load for dynamic content (milliseconds)
    pub render_wait_ms: u64,
    pub headless: bool,
    /// Disable for Docker/CI environments
    pub sandbox: bool,
    pub user_agent: String,
}

impl From<&BrowserConfig> for RendererConfig {
    fn from(config: &BrowserConfig) -> Self {
        Self {
            render_wait_ms: config.render_wait_ms,
            headless: config.headless,
            sandbox: config.sandbox,
            user_agent: config.user_agent.clone(),
        }
    }
}

#[cfg(feature = "js-rendering")]
mod browser_impl {
    use super::*;
    use chromiumoxide::browser::{Browser, BrowserConfig as ChromeConfig};
    use futures::StreamExt;
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use tokio::time::{timeout, Instant};
    use tracing::{debug, info, warn};

    pub struct HeadlessRenderer {
        config: RendererConfig,
        browser: Arc<Mutex<Option<Browser>>>,
        handler_handle: Arc<Mutex<Option<tokio::task::JoinHandle<()>>>>,
    }

    impl HeadlessRenderer {
        pub fn new(config: RendererConfig) -> Self {
            Self {
                config,
                browser: Arc::new(Mutex::new(None)),
                handler_handle: Arc::new(Mutex::new(None)),
            }
        }

        async fn ensure_browser(&self) -> Result<()> {
            let mut browser_guard = self.browser.lock().await;
            if browser_guard.is_some() {
                return Ok(());
            }

            info!("Launching headless Chrome browser...");

            // chromiumoxide is headless unless asked for a window
            let mut builder = ChromeConfig::builder();
            if !self.config.headless {
                builder = builder.with_head();
            }
            if !self.config.sandbox {
                builder = builder.no_sandbox();
            }

            builder = builder
                .arg("--disable-gpu")
                .arg("--disable-dev-shm-usage")
                .arg("--no-first-run")
                .arg("--disable-extensions")
                .arg(format!("--user-agent={}", self.config.user_agent));

            let chrome_config = builder
                .build()
                .map_err(|e| Error::Scrape(format!("Failed to build browser config: {}", e)))?;

            let (browser, mut handler) = Browser::launch(chrome_config)
                .await
                .map_err(|e| Error::Scrape(format!("Failed to launch browser: {}", e)))?;

            let handle = tokio::spawn(async move {
                while let Some(result) = handler.next().await {
                    if result.is_err() {
                        break;
                    }
                }
            });

            *browser_guard = Some(browser);
            *self.handler_handle.lock().await = Some(handle);

            info!("Headless browser launched");
            Ok(())
        }

        async fn render(&self, url: &str, navigation_timeout: Duration) -> Result<RenderedPage> {
            self.ensure_browser().await?;

            let start = Instant::now();
            debug!("Rendering page with headless browser: {}", url);

            let browser_guard = self.browser.lock().await;
            let browser = browser_guard
                .as_ref()
                .ok_or_else(|| Error::Scrape("Browser not initialized".to_string()))?;

            let page = timeout(navigation_timeout, async {
                let page = browser
                    .new_page(url)
                    .await
                    .map_err(|e| Error::Scrape(format!("Failed to open page: {}", e)))?;
                page.wait_for_navigation()
                    .await
                    .map_err(|e| Error::Scrape(format!("Navigation failed: {}", e)))?;
                Ok::<_, Error>(page)
            })
            .await
            .map_err(|_| {
                Error::Timeout(format!(
                    "navigation to {} exceeded {}s",
                    url,
                    navigation_timeout.as_secs_f64()
                ))
            })??;

            if self.config.render_wait_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.render_wait_ms)).await;
            }

            let final_url = page
                .url()
                .await
                .map_err(|e| Error::Scrape(format!("Failed to get URL: {}", e)))?
                .map(|u| u.to_string())
                .unwrap_or_else(|| url.to_string());

            let html = page
                .content()
                .await
                .map_err(|e| Error::Scrape(format!("Failed to get content: {}", e)))?;

            let title = page
                .evaluate("document.title")
                .await
                .ok()
                .and_then(|v| v.into_value::<String>().ok())
                .filter(|t| !t.is_empty());

            if let Err(e) = page.close().await {
                warn!("Failed to close page: {}", e);
            }

            let render_time_ms = start.elapsed().as_millis() as u64;
            debug!("Rendered {} in {}ms", url, render_time_ms);

            Ok(RenderedPage {
                url: final_url,
                html,
                title,
                render_time_ms,
            })
        }
    }

    #[async_trait]
    impl PageLoader for HeadlessRenderer {
        async fn load(&self, url: &str, navigation_timeout: Duration) -> Result<RenderedPage> {
            self.render(url, navigation_timeout).await
        }

        async fn close(&self) -> Result<()> {
            let mut browser_guard = self.browser.lock().await;
            if let Some(mut browser) = browser_guard.take() {
                browser
                    .close()
                    .await
                    .map_err(|e| Error::Scrape(format!("Failed to close browser: {}", e)))?;
            }

            if let Some(handle) = self.handler_handle.lock().await.take() {
                handle.abort();
            }
            Ok(())
        }
    }
}

#[cfg(feature = "js-rendering")]
pub use browser_impl::HeadlessRenderer;

/// Stand-in when the js-rendering feature is disabled
#[cfg(not(feature = "js-rendering"))]
pub struct HeadlessRenderer {
    _config: RendererConfig,
}

#[cfg(not(feature = "js-rendering"))]
impl HeadlessRenderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { _config: config }
    }
}

#[cfg(not(feature = "js-rendering"))]
#[async_trait]
impl PageLoader for HeadlessRenderer {
    async fn load(&self, url: &str, _navigation_timeout: Duration) -> Result<RenderedPage> {
        Err(Error::Scrape(format!(
            "JavaScript rendering not available for {}. \
             Compile with --features js-rendering to enable headless browser support.",
            url
        )))
    }
}

/// Whether the headless renderer was compiled in
pub fn is_js_rendering_available() -> bool {
    cfg!(feature = "js-rendering")
}
