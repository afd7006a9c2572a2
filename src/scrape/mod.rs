//! Scrape orchestration
//!
//! Each scrape kind follows the same shape: resolve the target URL, open a
//! job, visit the page once, extract candidates, upsert them, then close the
//! job as completed or failed. Errors are recorded on the job and returned
//! to the caller unchanged.

mod locks;

pub use locks::*;

use crate::config::{CacheConfig, Config, ExtractLimits, PageTimeouts, ScrapeConfig};
use crate::crawl::{BrowserSession, RenderedPage};
use crate::error::Result;
use crate::extract::{
    self, ExtractKind, Extracted, PageContext, ScrapedCategory, ScrapedNavigation, ScrapedProduct,
    ScrapedProductDetail,
};
use crate::jobs::JobTracker;
use crate::meta::{CatalogDb, Category, NavigationHeading, ProductDetail, ScrapeTarget};
use crate::reconcile::{CategoryPatch, DetailPatch, ProductPatch, Reconciler};
use crate::staleness::needs_scraping;
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::future::Future;
use tracing::{debug, error, info, warn};

/// Result of a product detail request
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum DetailOutcome {
    /// Fresh enough; served from the catalogue without a page visit
    Cached(ProductDetail),
    Scraped(ScrapedProductDetail),
}

/// Where a category scrape lands its results
enum CategoryScope {
    Root,
    Subcategories(Category),
    Navigation(NavigationHeading),
    Page,
}

/// Drives scrapes against the catalogue site
#[derive(Clone)]
pub struct Orchestrator {
    scrape: ScrapeConfig,
    cache: CacheConfig,
    db: CatalogDb,
    reconciler: Reconciler,
    jobs: JobTracker,
    session: BrowserSession,
    locks: TargetLocks,
}

impl Orchestrator {
    pub fn new(config: &Config, db: CatalogDb, session: BrowserSession) -> Self {
        Self {
            scrape: config.scrape.clone(),
            cache: config.cache.clone(),
            reconciler: Reconciler::new(db.clone()),
            jobs: JobTracker::new(db.clone(), config.scrape.max_retries),
            db,
            session,
            locks: TargetLocks::new(),
        }
    }

    pub fn db(&self) -> &CatalogDb {
        &self.db
    }

    pub fn session(&self) -> &BrowserSession {
        &self.session
    }

    /// Scrape the site menu into navigation headings
    ///
    /// `force_refresh` is recorded on the job; navigation has no cache.
    pub async fn scrape_navigation(&self, force_refresh: bool) -> Result<Vec<ScrapedNavigation>> {
        let url = self.scrape.locale_root();
        info!("Starting navigation scrape: {}", url);

        let metadata = json!({ "force_refresh": force_refresh });
        self.run_job(&url, ScrapeTarget::Navigation, metadata, async {
            let items: Vec<ScrapedNavigation> = self
                .visit(&url, self.scrape.page_timeouts(), self.scrape.limits, ExtractKind::Navigation)
                .await?
                .try_into()?;

            for item in &items {
                self.reconciler
                    .upsert_navigation(&item.slug, item.into(), Utc::now())
                    .await?;
            }
            let count = items.len();
            Ok((items, count))
        })
        .await
    }

    /// Scrape categories from a landing, category or navigation page
    ///
    /// Without a slug the locale root is scraped and results are root
    /// categories. A slug naming a known category scrapes its page and links
    /// results as its subcategories. A slug naming a navigation heading links
    /// results to that heading. Any other slug is treated as a site page.
    pub async fn scrape_categories(
        &self,
        slug: Option<&str>,
        force_refresh: bool,
    ) -> Result<Vec<ScrapedCategory>> {
        let (url, scope) = self.resolve_category_scope(slug).await?;
        info!("Starting category scrape: {}", url);

        let scope_name = match &scope {
            CategoryScope::Root => "root",
            CategoryScope::Subcategories(_) => "subcategories",
            CategoryScope::Navigation(_) => "navigation",
            CategoryScope::Page => "page",
        };
        let metadata = json!({
            "force_refresh": force_refresh,
            "category_slug": slug,
            "scope": scope_name,
        });

        self.run_job(&url, ScrapeTarget::Category, metadata, async {
            let mut items: Vec<ScrapedCategory> = self
                .visit(&url, self.scrape.listing_timeouts(), self.scrape.limits, ExtractKind::Categories)
                .await?
                .try_into()?;

            if let CategoryScope::Subcategories(parent) = &scope {
                items = self.adoptable_subcategories(parent, items).await?;
            }

            for item in &items {
                let mut patch = CategoryPatch::from(item);
                match &scope {
                    CategoryScope::Subcategories(parent) => patch.parent_id = Some(parent.id.clone()),
                    CategoryScope::Navigation(nav) => patch.navigation_id = Some(nav.id.clone()),
                    CategoryScope::Root | CategoryScope::Page => {}
                }
                self.reconciler
                    .upsert_category(&item.slug, patch, Utc::now())
                    .await?;
            }
            let count = items.len();
            Ok((items, count))
        })
        .await
    }

    /// Scrape one page of a collection listing
    ///
    /// Products link to the category when it is already stored; otherwise
    /// they are saved unlinked. At most `limit` products are taken, within
    /// the configured per-page cap.
    pub async fn scrape_product_list(
        &self,
        category_slug: &str,
        page: u32,
        limit: Option<usize>,
        force_refresh: bool,
    ) -> Result<Vec<ScrapedProduct>> {
        let page = page.max(1);
        let url = format!(
            "{}/collections/{}?page={}",
            self.scrape.locale_root(),
            category_slug,
            page
        );
        info!("Starting product list scrape: {}", url);

        let mut limits = self.scrape.limits;
        if let Some(limit) = limit {
            limits.products = limits.products.min(limit);
        }

        let metadata = json!({
            "force_refresh": force_refresh,
            "category_slug": category_slug,
            "page": page,
            "limit": limit,
        });

        self.run_job(&url, ScrapeTarget::ProductList, metadata, async {
            let items: Vec<ScrapedProduct> = self
                .visit(&url, self.scrape.listing_timeouts(), limits, ExtractKind::ProductList)
                .await?
                .try_into()?;

            let category_id = self
                .db
                .get_category_by_slug(category_slug)
                .await?
                .map(|c| c.id);
            if category_id.is_none() && !items.is_empty() {
                warn!(
                    "Category '{}' not stored yet; saving products without a category",
                    category_slug
                );
            }

            for item in &items {
                let mut patch = ProductPatch::from(item);
                patch.category_id = category_id.clone();
                self.reconciler
                    .upsert_product(&item.source_id, patch, Utc::now())
                    .await?;
            }
            let count = items.len();
            Ok((items, count))
        })
        .await
    }

    /// Scrape a stored product's page for its detail and reviews
    ///
    /// Returns `Ok(None)` without creating a job when the product is unknown.
    /// Unless `force_refresh` is set, a product that has a detail row and was
    /// scraped within the cache TTL is served from the catalogue, also
    /// without a job.
    pub async fn scrape_product_detail(
        &self,
        source_id: &str,
        force_refresh: bool,
    ) -> Result<Option<DetailOutcome>> {
        let Some(product) = self.db.get_product_by_source_id(source_id).await? else {
            warn!("Product not found: {}", source_id);
            return Ok(None);
        };

        if !force_refresh && !needs_scraping(&product, self.cache.ttl_hours) {
            if let Some(detail) = self.db.get_product_detail(&product.id).await? {
                info!("Using cached product detail for: {}", source_id);
                return Ok(Some(DetailOutcome::Cached(detail)));
            }
        }

        let url = product.source_url.clone();
        info!("Starting product detail scrape: {}", url);
        let metadata = json!({ "force_refresh": force_refresh, "source_id": source_id });

        let detail = self
            .run_job(&url, ScrapeTarget::ProductDetail, metadata, async {
                let extracted = self
                    .visit(&url, self.scrape.page_timeouts(), self.scrape.limits, ExtractKind::ProductDetail)
                    .await?;
                let count = extracted.len();
                let detail: ScrapedProductDetail = extracted.try_into()?;

                let now = Utc::now();
                self.reconciler
                    .upsert_detail(&product.id, DetailPatch::from(&detail), now)
                    .await?;
                if !detail.reviews.is_empty() {
                    self.reconciler
                        .replace_reviews(&product.id, &detail.reviews, now)
                        .await?;
                }
                self.db.touch_product(&product.id, now).await?;
                Ok((detail, count))
            })
            .await?;

        Ok(Some(DetailOutcome::Scraped(detail)))
    }

    async fn resolve_category_scope(&self, slug: Option<&str>) -> Result<(String, CategoryScope)> {
        let root = self.scrape.locale_root();
        let Some(slug) = slug else {
            return Ok((root, CategoryScope::Root));
        };

        if let Some(category) = self.db.get_category_by_slug(slug).await? {
            return Ok((category.url.clone(), CategoryScope::Subcategories(category)));
        }
        if let Some(nav) = self.db.get_navigation_by_slug(slug).await? {
            return Ok((nav.url.clone(), CategoryScope::Navigation(nav)));
        }
        Ok((format!("{}/pages/{}", root, slug), CategoryScope::Page))
    }

    /// Drop candidates that must not become children of `parent`
    ///
    /// Site menus repeat top-level collections on every category page. A
    /// candidate is kept only when it is new, or already sits below some
    /// category without a navigation link, and is neither `parent` nor one
    /// of its ancestors. Adopting anything else could close a parent cycle
    /// or pull a root category under its sibling.
    async fn adoptable_subcategories(
        &self,
        parent: &Category,
        items: Vec<ScrapedCategory>,
    ) -> Result<Vec<ScrapedCategory>> {
        let lineage = self.lineage(parent).await?;

        let mut kept = Vec::with_capacity(items.len());
        for mut item in items {
            let adoptable = match self.db.get_category_by_slug(&item.slug).await? {
                None => true,
                Some(existing) => {
                    existing.parent_id.is_some()
                        && existing.navigation_id.is_none()
                        && !lineage.iter().any(|c| c.id == existing.id)
                }
            };
            if !adoptable {
                debug!("Not adopting '{}' under '{}'", item.slug, parent.slug);
                continue;
            }
            item.parent_slug = Some(parent.slug.clone());
            kept.push(item);
        }
        Ok(kept)
    }

    /// `category` followed by its stored ancestors, nearest first
    async fn lineage(&self, category: &Category) -> Result<Vec<Category>> {
        let mut chain = vec![category.clone()];
        let mut next = category.parent_id.clone();
        while let Some(id) = next {
            if chain.iter().any(|c| c.id == id) {
                break;
            }
            let Some(ancestor) = self.db.get_category(&id).await? else {
                break;
            };
            next = ancestor.parent_id.clone();
            chain.push(ancestor);
        }
        Ok(chain)
    }

    /// One rate-limited page visit feeding the extraction strategy for `kind`
    async fn visit(
        &self,
        url: &str,
        timeouts: PageTimeouts,
        limits: ExtractLimits,
        kind: ExtractKind,
    ) -> Result<Extracted> {
        let base_url = self.scrape.base_url.clone();
        let currency = self.scrape.currency.clone();
        self.session
            .visit(url, timeouts, move |page: &RenderedPage| {
                let ctx = PageContext::new(&page.url, &base_url, &currency, limits)?;
                extract::extract(kind, &page.html, &ctx)
            })
            .await
    }

    /// Wrap `work` in a job: open it, run, then complete or fail it
    ///
    /// `work` yields the caller's value plus the accepted item count.
    async fn run_job<T, Fut>(
        &self,
        target_url: &str,
        target: ScrapeTarget,
        metadata: serde_json::Value,
        work: Fut,
    ) -> Result<T>
    where
        Fut: Future<Output = Result<(T, usize)>>,
    {
        let _guard = self.locks.acquire(target_url).await;

        let mut job = self.jobs.create(target_url, target, Some(metadata)).await?;
        self.jobs.start(&mut job).await?;

        match work.await {
            Ok((value, count)) => {
                self.jobs.complete(&mut job, count).await?;
                info!("Scraped {} {} item(s) from {}", count, target, target_url);
                Ok(value)
            }
            Err(err) => {
                let message = err.to_string();
                error!("{} scrape failed: {}", target, message);
                if let Err(mark_err) = self.jobs.fail(&mut job, &message).await {
                    warn!("Could not mark job {} as failed: {}", job.id, mark_err);
                }
                Err(err)
            }
        }
    }
}
