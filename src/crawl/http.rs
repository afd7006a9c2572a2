//! Plain HTTP page loader

use super::{PageLoader, RenderedPage};
use crate::config::BrowserConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::{Duration, Instant};
use tracing::debug;

/// Fetches static HTML without running scripts
pub struct HttpLoader {
    client: Client,
}

impl HttpLoader {
    pub fn new(config: &BrowserConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .gzip(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| Error::Scrape(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    async fn fetch(&self, url: &str) -> Result<(String, String)> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Scrape(format!("HTTP {}: {}", status, url)));
        }

        let final_url = response.url().to_string();
        let html = response.text().await?;
        Ok((final_url, html))
    }
}

#[async_trait]
impl PageLoader for HttpLoader {
    async fn load(&self, url: &str, navigation_timeout: Duration) -> Result<RenderedPage> {
        let start = Instant::now();
        debug!("Fetching: {}", url);

        let (final_url, html) = tokio::time::timeout(navigation_timeout, self.fetch(url))
            .await
            .map_err(|_| {
                Error::Timeout(format!(
                    "navigation to {} exceeded {}s",
                    url,
                    navigation_timeout.as_secs_f64()
                ))
            })??;

        Ok(RenderedPage {
            title: document_title(&html),
            url: final_url,
            html,
            render_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}

fn document_title(html: &str) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    Html::parse_document(html)
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn loader() -> HttpLoader {
        HttpLoader::new(&BrowserConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_load_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/en-gb"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html><head><title> Books </title></head><body></body></html>"),
            )
            .mount(&server)
            .await;

        let url = format!("{}/en-gb", server.uri());
        let page = loader().load(&url, Duration::from_secs(5)).await.unwrap();

        assert_eq!(page.url, url);
        assert_eq!(page.title.as_deref(), Some("Books"));
        assert!(page.html.contains("<body>"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_scrape_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = loader()
            .load(&format!("{}/down", server.uri()), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Scrape(_)));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_navigation_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let err = loader()
            .load(&format!("{}/slow", server.uri()), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }
}
