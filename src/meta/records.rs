//! Persisted catalogue and job records

use crate::error::{Error, Result};
use crate::extract::ProductRef;
use crate::staleness::Scraped;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::collections::BTreeMap;
use std::str::FromStr;
use uuid::Uuid;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// A top-level navigation heading
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct NavigationHeading {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub url: String,
    pub order: i64,
    pub last_scraped_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NavigationHeading {
    pub fn new(title: String, slug: String, url: String, at: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            title,
            slug,
            url,
            order: 0,
            last_scraped_at: None,
            created_at: at,
            updated_at: at,
        }
    }
}

/// A collection; `parent_id` forms the category tree
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub url: String,
    pub image_url: Option<String>,
    /// As reported by the site, not counted locally
    pub product_count: Option<i64>,
    pub order: i64,
    pub parent_id: Option<String>,
    pub navigation_id: Option<String>,
    pub last_scraped_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn new(title: String, slug: String, url: String, at: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            title,
            slug,
            url,
            image_url: None,
            product_count: None,
            order: 0,
            parent_id: None,
            navigation_id: None,
            last_scraped_at: None,
            created_at: at,
            updated_at: at,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// A product summary
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub source_id: String,
    pub source_url: String,
    pub title: String,
    pub author: Option<String>,
    pub price: Option<f64>,
    pub original_price: Option<f64>,
    pub currency: String,
    pub image_url: Option<String>,
    pub condition: Option<String>,
    pub format: Option<String>,
    pub in_stock: bool,
    pub category_id: Option<String>,
    pub last_scraped_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn new(source_id: String, source_url: String, title: String, at: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            source_id,
            source_url,
            title,
            author: None,
            price: None,
            original_price: None,
            currency: crate::config::default_currency(),
            image_url: None,
            condition: None,
            format: None,
            in_stock: true,
            category_id: None,
            last_scraped_at: None,
            created_at: at,
            updated_at: at,
        }
    }
}

/// Full detail for one product
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ProductDetail {
    pub id: String,
    pub product_id: String,
    pub description: Option<String>,
    pub publisher: Option<String>,
    pub publication_date: Option<NaiveDate>,
    pub isbn: Option<String>,
    pub isbn13: Option<String>,
    pub pages: Option<i64>,
    pub language: Option<String>,
    pub dimensions: Option<String>,
    pub weight: Option<String>,
    pub specs: Json<BTreeMap<String, String>>,
    /// Taken from the page, not computed from stored reviews
    pub ratings_avg: Option<f64>,
    pub reviews_count: Option<i64>,
    pub related_products: Json<Vec<ProductRef>>,
    pub recommended_products: Json<Vec<ProductRef>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductDetail {
    pub fn new(product_id: String, at: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            product_id,
            description: None,
            publisher: None,
            publication_date: None,
            isbn: None,
            isbn13: None,
            pages: None,
            language: None,
            dimensions: None,
            weight: None,
            specs: Json(BTreeMap::new()),
            ratings_avg: None,
            reviews_count: None,
            related_products: Json(Vec::new()),
            recommended_products: Json(Vec::new()),
            created_at: at,
            updated_at: at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub product_id: String,
    pub author: Option<String>,
    pub rating: Option<i64>,
    pub title: Option<String>,
    pub text: Option<String>,
    pub review_date: Option<NaiveDate>,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

impl Review {
    pub fn new(product_id: String, at: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            product_id,
            author: None,
            rating: None,
            title: None,
            text: None,
            review_date: None,
            verified: false,
            created_at: at,
        }
    }
}

impl Scraped for NavigationHeading {
    fn last_scraped_at(&self) -> Option<DateTime<Utc>> {
        self.last_scraped_at
    }
}

impl Scraped for Category {
    fn last_scraped_at(&self) -> Option<DateTime<Utc>> {
        self.last_scraped_at
    }
}

impl Scraped for Product {
    fn last_scraped_at(&self) -> Option<DateTime<Utc>> {
        self.last_scraped_at
    }
}

/// Scrape job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for JobStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "cancelled" => Ok(JobStatus::Cancelled),
            _ => Err(Error::InvalidRecord(format!("Unknown job status: {}", s))),
        }
    }
}

/// What a scrape job targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrapeTarget {
    Navigation,
    Category,
    ProductList,
    ProductDetail,
}

impl std::fmt::Display for ScrapeTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScrapeTarget::Navigation => write!(f, "navigation"),
            ScrapeTarget::Category => write!(f, "category"),
            ScrapeTarget::ProductList => write!(f, "product_list"),
            ScrapeTarget::ProductDetail => write!(f, "product_detail"),
        }
    }
}

impl FromStr for ScrapeTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "navigation" => Ok(ScrapeTarget::Navigation),
            "category" => Ok(ScrapeTarget::Category),
            "product_list" => Ok(ScrapeTarget::ProductList),
            "product_detail" => Ok(ScrapeTarget::ProductDetail),
            _ => Err(Error::InvalidRecord(format!("Unknown scrape target: {}", s))),
        }
    }
}

/// One scrape attempt
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ScrapeJob {
    pub id: String,
    pub target_url: String,
    pub target_type: String,
    pub status: String,
    pub items_scraped: i64,
    /// Recorded but never incremented; there is no retry driver
    pub retry_count: i64,
    pub max_retries: i64,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error_log: Option<String>,
    pub metadata: Option<Json<serde_json::Value>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScrapeJob {
    pub fn new(target_url: String, target: ScrapeTarget, max_retries: i64) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            target_url,
            target_type: target.to_string(),
            status: JobStatus::Pending.to_string(),
            items_scraped: 0,
            retry_count: 0,
            max_retries,
            started_at: None,
            finished_at: None,
            error_log: None,
            metadata: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn get_status(&self) -> Result<JobStatus> {
        self.status.parse()
    }

    pub fn get_target(&self) -> Result<ScrapeTarget> {
        self.target_type.parse()
    }
}

/// Row counts across the catalogue
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogStats {
    pub navigation_count: usize,
    pub category_count: usize,
    pub product_count: usize,
    pub detail_count: usize,
    pub review_count: usize,
    pub job_count: usize,
    pub failed_job_count: usize,
}
