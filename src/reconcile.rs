//! Upsert reconciler
//!
//! Merges candidate records into persisted rows by natural key. Patches are
//! sparse: only fields that are `Some` overwrite the stored value, so a
//! candidate never nulls out data it did not observe. Every upsert stamps
//! `last_scraped_at` with the call time.
//!
//! There is no transaction around a batch; each upsert commits on its own.

use crate::error::{Error, Result};
use crate::extract::{
    ProductRef, ScrapedCategory, ScrapedNavigation, ScrapedProduct, ScrapedProductDetail,
    ScrapedReview,
};
use crate::meta::{CatalogDb, Category, NavigationHeading, Product, ProductDetail, Review};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use std::collections::BTreeMap;
use tracing::debug;

/// Sparse update for a navigation heading
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigationPatch {
    pub title: Option<String>,
    pub url: Option<String>,
    pub order: Option<i64>,
}

impl NavigationPatch {
    fn apply(self, nav: &mut NavigationHeading) {
        if let Some(title) = self.title {
            nav.title = title;
        }
        if let Some(url) = self.url {
            nav.url = url;
        }
        if let Some(order) = self.order {
            nav.order = order;
        }
    }
}

impl From<&ScrapedNavigation> for NavigationPatch {
    fn from(nav: &ScrapedNavigation) -> Self {
        Self {
            title: Some(nav.title.clone()),
            url: Some(nav.url.clone()),
            order: Some(nav.order),
        }
    }
}

/// Sparse update for a category
///
/// `parent_id` and `navigation_id` are surrogate keys already resolved by
/// the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryPatch {
    pub title: Option<String>,
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub product_count: Option<i64>,
    pub order: Option<i64>,
    pub parent_id: Option<String>,
    pub navigation_id: Option<String>,
}

impl CategoryPatch {
    fn apply(self, category: &mut Category) {
        if let Some(title) = self.title {
            category.title = title;
        }
        if let Some(url) = self.url {
            category.url = url;
        }
        if self.image_url.is_some() {
            category.image_url = self.image_url;
        }
        if self.product_count.is_some() {
            category.product_count = self.product_count;
        }
        if let Some(order) = self.order {
            category.order = order;
        }
        if self.parent_id.is_some() {
            category.parent_id = self.parent_id;
        }
        if self.navigation_id.is_some() {
            category.navigation_id = self.navigation_id;
        }
    }
}

impl From<&ScrapedCategory> for CategoryPatch {
    fn from(category: &ScrapedCategory) -> Self {
        Self {
            title: Some(category.title.clone()),
            url: Some(category.url.clone()),
            image_url: category.image_url.clone(),
            product_count: category.product_count,
            ..Default::default()
        }
    }
}

/// Sparse update for a product summary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPatch {
    pub source_url: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub price: Option<f64>,
    pub original_price: Option<f64>,
    pub currency: Option<String>,
    pub image_url: Option<String>,
    pub condition: Option<String>,
    pub format: Option<String>,
    pub in_stock: Option<bool>,
    pub category_id: Option<String>,
}

impl ProductPatch {
    fn apply(self, product: &mut Product) {
        if let Some(source_url) = self.source_url {
            product.source_url = source_url;
        }
        if let Some(title) = self.title {
            product.title = title;
        }
        if self.author.is_some() {
            product.author = self.author;
        }
        if self.price.is_some() {
            product.price = self.price;
        }
        if self.original_price.is_some() {
            product.original_price = self.original_price;
        }
        if let Some(currency) = self.currency {
            product.currency = currency;
        }
        if self.image_url.is_some() {
            product.image_url = self.image_url;
        }
        if self.condition.is_some() {
            product.condition = self.condition;
        }
        if self.format.is_some() {
            product.format = self.format;
        }
        if let Some(in_stock) = self.in_stock {
            product.in_stock = in_stock;
        }
        if self.category_id.is_some() {
            product.category_id = self.category_id;
        }
    }
}

impl From<&ScrapedProduct> for ProductPatch {
    fn from(product: &ScrapedProduct) -> Self {
        Self {
            source_url: Some(product.source_url.clone()),
            title: Some(product.title.clone()),
            author: product.author.clone(),
            price: product.price,
            original_price: product.original_price,
            currency: Some(product.currency.clone()),
            image_url: product.image_url.clone(),
            condition: product.condition.clone(),
            format: product.format.clone(),
            in_stock: Some(product.in_stock),
            category_id: None,
        }
    }
}

/// Update for a product detail
///
/// Scalar fields are sparse. `specs` and both cross-reference lists are the
/// page's current snapshot and always replace what is stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailPatch {
    pub description: Option<String>,
    pub publisher: Option<String>,
    pub publication_date: Option<NaiveDate>,
    pub isbn: Option<String>,
    pub isbn13: Option<String>,
    pub pages: Option<i64>,
    pub language: Option<String>,
    pub dimensions: Option<String>,
    pub weight: Option<String>,
    pub ratings_avg: Option<f64>,
    pub reviews_count: Option<i64>,
    pub specs: BTreeMap<String, String>,
    pub related_products: Vec<ProductRef>,
    pub recommended_products: Vec<ProductRef>,
}

impl DetailPatch {
    fn apply(self, detail: &mut ProductDetail) {
        macro_rules! merge {
            ($($field:ident),*) => {
                $(if self.$field.is_some() {
                    detail.$field = self.$field;
                })*
            };
        }
        merge!(
            description,
            publisher,
            publication_date,
            isbn,
            isbn13,
            pages,
            language,
            dimensions,
            weight,
            ratings_avg,
            reviews_count
        );
        detail.specs = Json(self.specs);
        detail.related_products = Json(self.related_products);
        detail.recommended_products = Json(self.recommended_products);
    }
}

impl From<&ScrapedProductDetail> for DetailPatch {
    fn from(detail: &ScrapedProductDetail) -> Self {
        Self {
            description: detail.description.clone(),
            publisher: detail.publisher.clone(),
            publication_date: detail.publication_date,
            isbn: detail.isbn.clone(),
            isbn13: detail.isbn13.clone(),
            pages: detail.pages,
            language: detail.language.clone(),
            dimensions: detail.dimensions.clone(),
            weight: detail.weight.clone(),
            ratings_avg: detail.ratings_avg,
            reviews_count: detail.reviews_count,
            specs: detail.specs.clone(),
            related_products: detail.related_products.clone(),
            recommended_products: detail.recommended_products.clone(),
        }
    }
}

fn required(field: Option<String>, kind: &str, key: &str, name: &str) -> Result<String> {
    field.ok_or_else(|| Error::InvalidRecord(format!("new {} '{}' has no {}", kind, key, name)))
}

/// Create-or-update by natural key
#[derive(Clone)]
pub struct Reconciler {
    db: CatalogDb,
}

impl Reconciler {
    pub fn new(db: CatalogDb) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &CatalogDb {
        &self.db
    }

    pub async fn upsert_navigation(
        &self,
        slug: &str,
        patch: NavigationPatch,
        at: DateTime<Utc>,
    ) -> Result<NavigationHeading> {
        match self.db.get_navigation_by_slug(slug).await? {
            Some(mut nav) => {
                patch.apply(&mut nav);
                nav.last_scraped_at = Some(at);
                nav.updated_at = at;
                self.db.save_navigation(&nav).await?;
                debug!("Updated navigation '{}'", slug);
                Ok(nav)
            }
            None => {
                let title = required(patch.title.clone(), "navigation", slug, "title")?;
                let url = required(patch.url.clone(), "navigation", slug, "url")?;
                let mut nav = NavigationHeading::new(title, slug.to_string(), url, at);
                patch.apply(&mut nav);
                nav.last_scraped_at = Some(at);
                self.db.insert_navigation(&nav).await?;
                debug!("Created navigation '{}'", slug);
                Ok(nav)
            }
        }
    }

    pub async fn upsert_category(
        &self,
        slug: &str,
        patch: CategoryPatch,
        at: DateTime<Utc>,
    ) -> Result<Category> {
        match self.db.get_category_by_slug(slug).await? {
            Some(mut category) => {
                patch.apply(&mut category);
                category.last_scraped_at = Some(at);
                category.updated_at = at;
                self.db.save_category(&category).await?;
                debug!("Updated category '{}'", slug);
                Ok(category)
            }
            None => {
                let title = required(patch.title.clone(), "category", slug, "title")?;
                let url = required(patch.url.clone(), "category", slug, "url")?;
                let mut category = Category::new(title, slug.to_string(), url, at);
                patch.apply(&mut category);
                category.last_scraped_at = Some(at);
                self.db.insert_category(&category).await?;
                debug!("Created category '{}'", slug);
                Ok(category)
            }
        }
    }

    pub async fn upsert_product(
        &self,
        source_id: &str,
        patch: ProductPatch,
        at: DateTime<Utc>,
    ) -> Result<Product> {
        match self.db.get_product_by_source_id(source_id).await? {
            Some(mut product) => {
                patch.apply(&mut product);
                product.last_scraped_at = Some(at);
                product.updated_at = at;
                self.db.save_product(&product).await?;
                debug!("Updated product '{}'", source_id);
                Ok(product)
            }
            None => {
                let source_url = required(patch.source_url.clone(), "product", source_id, "source URL")?;
                let title = required(patch.title.clone(), "product", source_id, "title")?;
                let mut product = Product::new(source_id.to_string(), source_url, title, at);
                patch.apply(&mut product);
                product.last_scraped_at = Some(at);
                self.db.insert_product(&product).await?;
                debug!("Created product '{}'", source_id);
                Ok(product)
            }
        }
    }

    /// Find the product's detail row or create it, then apply the patch
    pub async fn upsert_detail(
        &self,
        product_id: &str,
        patch: DetailPatch,
        at: DateTime<Utc>,
    ) -> Result<ProductDetail> {
        match self.db.get_product_detail(product_id).await? {
            Some(mut detail) => {
                patch.apply(&mut detail);
                detail.updated_at = at;
                self.db.save_product_detail(&detail).await?;
                Ok(detail)
            }
            None => {
                let mut detail = ProductDetail::new(product_id.to_string(), at);
                patch.apply(&mut detail);
                self.db.insert_product_detail(&detail).await?;
                Ok(detail)
            }
        }
    }

    /// Delete every stored review of the product, then insert `reviews`
    pub async fn replace_reviews(
        &self,
        product_id: &str,
        reviews: &[ScrapedReview],
        at: DateTime<Utc>,
    ) -> Result<Vec<Review>> {
        let removed = self.db.delete_reviews_by_product(product_id).await?;

        let mut stored = Vec::with_capacity(reviews.len());
        for scraped in reviews {
            let mut review = Review::new(product_id.to_string(), at);
            review.author = scraped.author.clone();
            review.rating = scraped.rating;
            review.title = scraped.title.clone();
            review.text = scraped.text.clone();
            review.review_date = scraped.review_date;
            review.verified = scraped.verified;
            self.db.insert_review(&review).await?;
            stored.push(review);
        }

        debug!(
            "Replaced {} reviews with {} for product {}",
            removed,
            stored.len(),
            product_id
        );
        Ok(stored)
    }
}
