//! Scrape trigger commands

use crate::error::{Error, Result};
use crate::extract::{ScrapedCategory, ScrapedNavigation, ScrapedProduct};
use crate::progress::page_progress_bar;
use crate::scrape::{DetailOutcome, Orchestrator};
use serde::Serialize;
use tracing::info;

/// Options for a paginated product listing scrape
#[derive(Debug, Clone)]
pub struct ProductScrapeOptions {
    pub category_slug: String,
    /// First listing page (1-based)
    pub page: u32,
    /// Number of pages to walk from `page`
    pub pages: u32,
    /// Per-page cap on accepted products
    pub limit: Option<usize>,
    pub force_refresh: bool,
    pub show_progress: bool,
}

impl ProductScrapeOptions {
    pub fn new(category_slug: impl Into<String>) -> Self {
        Self {
            category_slug: category_slug.into(),
            page: 1,
            pages: 1,
            limit: None,
            force_refresh: false,
            show_progress: false,
        }
    }
}

/// Products gathered across listing pages
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProductScrapeReport {
    pub category_slug: String,
    pub first_page: u32,
    pub pages_scraped: u32,
    /// Set when a page came back empty before `pages` were walked
    pub stopped_early: bool,
    pub products: Vec<ScrapedProduct>,
}

pub async fn cmd_scrape_navigation(
    orchestrator: &Orchestrator,
    force_refresh: bool,
) -> Result<Vec<ScrapedNavigation>> {
    orchestrator.scrape_navigation(force_refresh).await
}

pub async fn cmd_scrape_categories(
    orchestrator: &Orchestrator,
    slug: Option<&str>,
    force_refresh: bool,
) -> Result<Vec<ScrapedCategory>> {
    orchestrator.scrape_categories(slug, force_refresh).await
}

/// Walk listing pages, one orchestration call (and one job) per page
///
/// Stops at the first page that yields no products.
pub async fn cmd_scrape_products(
    orchestrator: &Orchestrator,
    options: ProductScrapeOptions,
) -> Result<ProductScrapeReport> {
    let first_page = options.page.max(1);
    let pages = options.pages.max(1);

    let bar = options
        .show_progress
        .then(|| page_progress_bar(pages as u64, &options.category_slug));

    let mut report = ProductScrapeReport {
        category_slug: options.category_slug.clone(),
        first_page,
        ..Default::default()
    };

    for page in first_page..first_page.saturating_add(pages) {
        let result = orchestrator
            .scrape_product_list(
                &options.category_slug,
                page,
                options.limit,
                options.force_refresh,
            )
            .await;

        let products = match result {
            Ok(products) => products,
            Err(e) => {
                if let Some(bar) = &bar {
                    bar.abandon_with_message(format!("failed on page {}", page));
                }
                return Err(e);
            }
        };

        report.pages_scraped += 1;
        if let Some(bar) = &bar {
            bar.inc(1);
            bar.set_message(format!("{} products", report.products.len() + products.len()));
        }

        if products.is_empty() {
            info!(
                "Page {} of '{}' is empty; stopping",
                page, options.category_slug
            );
            report.stopped_early = report.pages_scraped < pages;
            break;
        }
        report.products.extend(products);
    }

    if let Some(bar) = &bar {
        bar.finish_with_message(format!("{} products", report.products.len()));
    }

    info!(
        "Scraped {} products from {} page(s) of '{}'",
        report.products.len(),
        report.pages_scraped,
        options.category_slug
    );
    Ok(report)
}

/// Detail for a stored product; unknown products are `ProductNotFound`
pub async fn cmd_scrape_product(
    orchestrator: &Orchestrator,
    source_id: &str,
    force_refresh: bool,
) -> Result<DetailOutcome> {
    orchestrator
        .scrape_product_detail(source_id, force_refresh)
        .await?
        .ok_or_else(|| Error::ProductNotFound(source_id.to_string()))
}

pub fn print_navigation(items: &[ScrapedNavigation]) {
    println!("\n✓ {} navigation heading(s)", items.len());
    for item in items {
        println!("  {:>2}. {} [{}]  {}", item.order, item.title, item.slug, item.url);
    }
}

pub fn print_categories(items: &[ScrapedCategory]) {
    println!("\n✓ {} categor{}", items.len(), if items.len() == 1 { "y" } else { "ies" });
    for item in items {
        let parent = item
            .parent_slug
            .as_deref()
            .map(|p| format!(" (under {})", p))
            .unwrap_or_default();
        println!("  • {} [{}]{}", item.title, item.slug, parent);
    }
}

pub fn print_product_report(report: &ProductScrapeReport) {
    println!(
        "\n✓ {} product(s) from '{}', pages {}..{}",
        report.products.len(),
        report.category_slug,
        report.first_page,
        report.first_page + report.pages_scraped.saturating_sub(1)
    );
    if report.stopped_early {
        println!("  Stopped at an empty page");
    }
    for product in &report.products {
        let price = product
            .price
            .map(|p| format!("{:.2} {}", p, product.currency))
            .unwrap_or_else(|| "-".to_string());
        let author = product
            .author
            .as_deref()
            .map(|a| format!(" by {}", a))
            .unwrap_or_default();
        println!("  • {}{}  {}  [{}]", product.title, author, price, product.source_id);
    }
}

pub fn print_detail_outcome(source_id: &str, outcome: &DetailOutcome) {
    match outcome {
        DetailOutcome::Cached(detail) => {
            println!("\n✓ {} served from cache", source_id);
            print_field("Publisher", detail.publisher.as_deref());
            print_field("ISBN-13", detail.isbn13.as_deref());
            print_field("Language", detail.language.as_deref());
            if let Some(pages) = detail.pages {
                println!("  Pages: {}", pages);
            }
            if let Some(avg) = detail.ratings_avg {
                println!("  Rating: {:.1}", avg);
            }
            println!("  Specs: {}", detail.specs.0.len());
        }
        DetailOutcome::Scraped(detail) => {
            println!("\n✓ {} scraped", source_id);
            print_field("Publisher", detail.publisher.as_deref());
            print_field("ISBN-13", detail.isbn13.as_deref());
            print_field("Language", detail.language.as_deref());
            if let Some(pages) = detail.pages {
                println!("  Pages: {}", pages);
            }
            if let Some(avg) = detail.ratings_avg {
                println!("  Rating: {:.1}", avg);
            }
            println!("  Specs: {}", detail.specs.len());
            println!("  Reviews: {}", detail.reviews.len());
            println!(
                "  Related: {}, recommended: {}",
                detail.related_products.len(),
                detail.recommended_products.len()
            );
        }
    }
}

fn print_field(label: &str, value: Option<&str>) {
    if let Some(value) = value {
        println!("  {}: {}", label, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::crawl::{BrowserSession, FakeLoader};
    use crate::meta::{test_db, JobStatus};
    use std::sync::Arc;

    const ROOT: &str = "https://books.test/en-gb";

    fn listing(handles: &[&str]) -> String {
        let items: String = handles
            .iter()
            .map(|h| {
                format!(
                    r#"<div class="product-card"><a href="/en-gb/products/{h}"><h3>{h}</h3></a><span class="price">£3.00</span></div>"#
                )
            })
            .collect();
        format!("<html><body>{}</body></html>", items)
    }

    async fn setup() -> (Orchestrator, Arc<FakeLoader>, tempfile::TempDir) {
        let (db, tmp) = test_db().await;
        let mut config = Config::default();
        config.scrape.base_url = "https://books.test".to_string();
        let loader = Arc::new(FakeLoader::default());
        let session = BrowserSession::new(loader.clone(), 600);
        (Orchestrator::new(&config, db, session), loader, tmp)
    }

    #[tokio::test]
    async fn test_pagination_stops_at_first_empty_page() {
        let (orchestrator, loader, _tmp) = setup().await;
        let base = format!("{}/collections/fiction", ROOT);
        loader.serve(&format!("{}?page=1", base), &listing(&["a-1", "b-2"]));
        loader.serve(&format!("{}?page=2", base), &listing(&["c-3"]));
        loader.serve(&format!("{}?page=3", base), &listing(&[]));
        loader.serve(&format!("{}?page=4", base), &listing(&["d-4"]));

        let mut options = ProductScrapeOptions::new("fiction");
        options.pages = 5;
        let report = cmd_scrape_products(&orchestrator, options).await.unwrap();

        assert_eq!(report.products.len(), 3);
        assert_eq!(report.pages_scraped, 3);
        assert!(report.stopped_early);
        assert_eq!(loader.visits().len(), 3);
        assert_eq!(orchestrator.db().list_jobs(10).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_pagination_starts_at_page_and_respects_count() {
        let (orchestrator, loader, _tmp) = setup().await;
        let base = format!("{}/collections/maps", ROOT);
        loader.serve(&format!("{}?page=2", base), &listing(&["m-1"]));
        loader.serve(&format!("{}?page=3", base), &listing(&["m-2"]));

        let mut options = ProductScrapeOptions::new("maps");
        options.page = 2;
        options.pages = 2;
        let report = cmd_scrape_products(&orchestrator, options).await.unwrap();

        assert_eq!(report.first_page, 2);
        assert_eq!(report.pages_scraped, 2);
        assert!(!report.stopped_early);
        assert_eq!(
            loader.visits(),
            vec![format!("{}?page=2", base), format!("{}?page=3", base)]
        );
    }

    #[tokio::test]
    async fn test_failed_page_aborts_walk() {
        let (orchestrator, loader, _tmp) = setup().await;
        let base = format!("{}/collections/art", ROOT);
        loader.serve(&format!("{}?page=1", base), &listing(&["x-1"]));

        let mut options = ProductScrapeOptions::new("art");
        options.pages = 3;
        let err = cmd_scrape_products(&orchestrator, options).await.unwrap_err();
        assert!(matches!(err, Error::Scrape(_)));

        let jobs = orchestrator.db().list_jobs(10).await.unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].get_status().unwrap(), JobStatus::Failed);
        assert_eq!(orchestrator.db().get_stats().await.unwrap().product_count, 1);
    }

    #[tokio::test]
    async fn test_unknown_product_is_not_found() {
        let (orchestrator, _loader, _tmp) = setup().await;
        let err = cmd_scrape_product(&orchestrator, "missing", false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ProductNotFound(_)));
    }
}
