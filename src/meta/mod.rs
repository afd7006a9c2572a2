//! Catalogue storage using SQLite
//!
//! This module handles all local storage including:
//! - Navigation headings and the category tree
//! - Products, their details and reviews
//! - Scrape jobs (audit trail of every scrape attempt)

mod catalog;
mod jobs;
mod records;
mod schema;

pub use jobs::DEFAULT_JOB_LIST_LIMIT;
pub use records::*;
pub use schema::*;

use crate::config::Config;
use crate::error::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use tracing::{debug, info};

/// Catalogue database handle
#[derive(Clone)]
pub struct CatalogDb {
    pool: SqlitePool,
}

impl CatalogDb {
    /// Connect to the catalogue database
    pub async fn connect(config: &Config) -> Result<Self> {
        Self::open(&config.paths.db_file).await
    }

    /// Open a database by path, creating the schema if it is missing
    pub async fn new(db_path: &Path) -> Result<Self> {
        let db = Self::open(db_path).await?;
        if !db.is_initialized().await? {
            db.init_schema().await?;
        }
        Ok(db)
    }

    async fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        debug!("Connecting to SQLite database at {:?}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Initialize the database schema
    pub async fn init_schema(&self) -> Result<()> {
        info!("Initializing database schema");
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    /// Check if database is initialized
    pub async fn is_initialized(&self) -> Result<bool> {
        let result: Option<(i32,)> = sqlx::query_as(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='scrape_jobs'",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(result.is_some())
    }

    /// Row counts across every table
    pub async fn get_stats(&self) -> Result<CatalogStats> {
        let failed: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM scrape_jobs WHERE status = 'failed'")
                .fetch_one(&self.pool)
                .await?;

        Ok(CatalogStats {
            navigation_count: self.count_rows("navigation_headings").await?,
            category_count: self.count_rows("categories").await?,
            product_count: self.count_rows("products").await?,
            detail_count: self.count_rows("product_details").await?,
            review_count: self.count_rows("reviews").await?,
            job_count: self.count_rows("scrape_jobs").await?,
            failed_job_count: failed as usize,
        })
    }

    async fn count_rows(&self, table: &'static str) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        let n: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(n as usize)
    }
}

#[cfg(test)]
pub(crate) async fn test_db() -> (CatalogDb, tempfile::TempDir) {
    let tmp = tempfile::TempDir::new().unwrap();
    let mut config = Config::default();
    config.paths.db_file = tmp.path().join("test.db");

    let db = CatalogDb::connect(&config).await.unwrap();
    db.init_schema().await.unwrap();
    (db, tmp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_new_initializes_schema() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("catalog.db");

        let db = CatalogDb::new(&path).await.unwrap();
        assert!(db.is_initialized().await.unwrap());
        assert!(path.exists());

        // idempotent
        db.init_schema().await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_without_schema() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.paths.db_file = tmp.path().join("empty.db");

        let db = CatalogDb::connect(&config).await.unwrap();
        assert!(!db.is_initialized().await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_stats() {
        let (db, _tmp) = test_db().await;
        assert_eq!(db.get_stats().await.unwrap(), CatalogStats::default());
    }
}
