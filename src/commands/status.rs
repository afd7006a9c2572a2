//! Status command implementation

use crate::config::{BrowserEngine, Config};
use crate::error::Result;
use crate::meta::{CatalogDb, CatalogStats};
use crate::staleness::{needs_scraping, Scraped};
use serde::Serialize;
use tracing::info;

/// Status information
#[derive(Debug, Clone, Serialize)]
pub struct StatusInfo {
    pub config_path: String,
    pub db_path: String,
    pub base_url: String,
    pub locale_root: String,
    pub engine: BrowserEngine,
    pub requests_per_minute: u32,
    pub cache_ttl_hours: f64,
    pub stats: CatalogStats,
    pub stale: StaleCounts,
}

/// Stored entities due for a re-scrape under `cache.max_age_hours`
#[derive(Debug, Clone, Default, Serialize)]
pub struct StaleCounts {
    pub max_age_hours: f64,
    pub navigation: usize,
    pub categories: usize,
    pub products: usize,
}

impl StaleCounts {
    pub async fn collect(db: &CatalogDb, max_age_hours: f64) -> Result<Self> {
        Ok(Self {
            max_age_hours,
            navigation: count_stale(&db.list_navigations().await?, max_age_hours),
            categories: count_stale(&db.list_categories().await?, max_age_hours),
            products: count_stale(&db.list_products().await?, max_age_hours),
        })
    }
}

fn count_stale<E: Scraped>(entities: &[E], max_age_hours: f64) -> usize {
    entities
        .iter()
        .filter(|e| needs_scraping(*e, max_age_hours))
        .count()
}

/// Get system status
pub async fn cmd_status(config: &Config, db: &CatalogDb) -> Result<StatusInfo> {
    info!("Getting status");

    let stats = db.get_stats().await?;
    let stale = StaleCounts::collect(db, config.cache.max_age_hours).await?;

    Ok(StatusInfo {
        config_path: config.paths.config_file.display().to_string(),
        db_path: config.paths.db_file.display().to_string(),
        base_url: config.scrape.base_url.clone(),
        locale_root: config.scrape.locale_root(),
        engine: config.browser.engine,
        requests_per_minute: config.scrape.requests_per_minute,
        cache_ttl_hours: config.cache.ttl_hours,
        stats,
        stale,
    })
}

/// Print status to console
pub fn print_status(status: &StatusInfo) {
    println!("\n📊 bookscrape Status\n");
    println!("Configuration: {}", status.config_path);
    println!("Database: {}", status.db_path);
    println!("\nTarget:");
    println!("  Site: {}", status.base_url);
    println!("  Landing page: {}", status.locale_root);
    println!("  Engine: {:?}", status.engine);
    println!("  Rate limit: {} requests/minute", status.requests_per_minute);
    println!("  Detail cache TTL: {}h", status.cache_ttl_hours);
    println!("\nCatalogue:");
    println!("  Navigation headings: {}", status.stats.navigation_count);
    println!("  Categories: {}", status.stats.category_count);
    println!("  Products: {}", status.stats.product_count);
    println!("  Product details: {}", status.stats.detail_count);
    println!("  Reviews: {}", status.stats.review_count);
    println!(
        "  Scrape jobs: {} ({} failed)",
        status.stats.job_count, status.stats.failed_job_count
    );
    println!("\nDue for re-scrape (older than {}h):", status.stale.max_age_hours);
    println!("  Navigation headings: {}", status.stale.navigation);
    println!("  Categories: {}", status.stale.categories);
    println!("  Products: {}", status.stale.products);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::{test_db, Category, Product};
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_status_reports_config_and_counts() {
        let (db, _tmp) = test_db().await;
        let mut config = Config::default();
        config.scrape.base_url = "https://books.test".to_string();

        let status = cmd_status(&config, &db).await.unwrap();
        assert_eq!(status.locale_root, "https://books.test/en-gb");
        assert_eq!(status.requests_per_minute, 30);
        assert_eq!(status.stats.product_count, 0);

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["stats"]["job_count"], 0);
    }

    #[tokio::test]
    async fn test_status_counts_stale_entities() {
        let (db, _tmp) = test_db().await;
        let mut config = Config::default();
        config.cache.max_age_hours = 12.0;
        let now = Utc::now();

        let mut fresh = Category::new(
            "Fiction".to_string(),
            "fiction".to_string(),
            "https://books.test/en-gb/collections/fiction".to_string(),
            now,
        );
        fresh.last_scraped_at = Some(now - Duration::hours(1));
        let never = Category::new(
            "Maps".to_string(),
            "maps".to_string(),
            "https://books.test/en-gb/collections/maps".to_string(),
            now,
        );
        db.insert_category(&fresh).await.unwrap();
        db.insert_category(&never).await.unwrap();

        let mut old = Product::new(
            "atlas-1".to_string(),
            "https://books.test/en-gb/products/atlas-1".to_string(),
            "Atlas".to_string(),
            now,
        );
        old.last_scraped_at = Some(now - Duration::hours(13));
        let mut recent = Product::new(
            "novel-2".to_string(),
            "https://books.test/en-gb/products/novel-2".to_string(),
            "Novel".to_string(),
            now,
        );
        recent.last_scraped_at = Some(now - Duration::hours(11));
        db.insert_product(&old).await.unwrap();
        db.insert_product(&recent).await.unwrap();

        let status = cmd_status(&config, &db).await.unwrap();
        assert_eq!(status.stale.max_age_hours, 12.0);
        assert_eq!(status.stale.navigation, 0);
        assert_eq!(status.stale.categories, 1);
        assert_eq!(status.stale.products, 1);

        config.cache.max_age_hours = 48.0;
        let relaxed = cmd_status(&config, &db).await.unwrap();
        assert_eq!(relaxed.stale.products, 0);
        assert_eq!(relaxed.stale.categories, 1);
    }
}
