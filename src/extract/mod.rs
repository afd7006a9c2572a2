//! Extraction strategies for catalogue pages
//!
//! Each strategy turns raw page HTML into candidate records:
//! - Navigation headings from the site menu
//! - Categories (collections) from landing pages
//! - Product summaries from collection listings
//! - Product detail, reviews and cross-references from product pages
//!
//! Strategies try ordered selector lists and never fail on zero matches;
//! an empty result is a normal outcome. A candidate missing its title or a
//! resolvable URL is dropped silently.

mod category;
mod detail;
mod navigation;
mod product;

pub use category::*;
pub use detail::*;
pub use navigation::*;
pub use product::*;

use crate::config::ExtractLimits;
use crate::error::{Error, Result};
use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Selector};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use url::Url;

/// What kind of page is being extracted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractKind {
    Navigation,
    Categories,
    ProductList,
    ProductDetail,
}

/// Page-level inputs shared by every strategy
#[derive(Debug, Clone)]
pub struct PageContext {
    /// URL the page was loaded from, used to resolve relative links
    pub page_url: Url,
    /// Site root, stripped before deriving fallback source IDs
    pub base_url: String,
    pub currency: String,
    pub limits: ExtractLimits,
}

impl PageContext {
    pub fn new(page_url: &str, base_url: &str, currency: &str, limits: ExtractLimits) -> Result<Self> {
        Ok(Self {
            page_url: Url::parse(page_url)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            currency: currency.to_string(),
            limits,
        })
    }

    /// Resolve an href against the page URL
    pub fn resolve(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() {
            return None;
        }
        let lower = href.to_ascii_lowercase();
        if lower.starts_with("javascript:") || lower.starts_with("mailto:") || lower.starts_with("tel:") {
            return None;
        }
        let resolved = self.page_url.join(href).ok()?;
        match resolved.scheme() {
            "http" | "https" => Some(resolved.to_string()),
            _ => None,
        }
    }
}

/// A navigation heading as found on the page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedNavigation {
    pub title: String,
    pub slug: String,
    pub url: String,
    pub order: i64,
}

/// A category (collection) link as found on the page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedCategory {
    pub title: String,
    pub slug: String,
    pub url: String,
    pub image_url: Option<String>,
    pub product_count: Option<i64>,
    /// Set by the orchestrator when scraping below a parent category
    pub parent_slug: Option<String>,
}

/// A product summary from a listing page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedProduct {
    pub source_id: String,
    pub title: String,
    pub author: Option<String>,
    pub price: Option<f64>,
    pub original_price: Option<f64>,
    pub currency: String,
    pub image_url: Option<String>,
    pub source_url: String,
    pub condition: Option<String>,
    pub format: Option<String>,
    pub in_stock: bool,
}

/// Lightweight pointer to another product; not a foreign key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRef {
    pub source_id: String,
    pub title: String,
    pub url: String,
}

/// A review block from a product page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedReview {
    pub author: Option<String>,
    pub rating: Option<i64>,
    pub title: Option<String>,
    pub text: Option<String>,
    pub review_date: Option<NaiveDate>,
    pub verified: bool,
}

/// Everything extracted from one product page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapedProductDetail {
    pub description: Option<String>,
    pub publisher: Option<String>,
    pub publication_date: Option<NaiveDate>,
    pub isbn: Option<String>,
    pub isbn13: Option<String>,
    pub pages: Option<i64>,
    pub language: Option<String>,
    pub dimensions: Option<String>,
    pub weight: Option<String>,
    pub specs: std::collections::BTreeMap<String, String>,
    pub ratings_avg: Option<f64>,
    pub reviews_count: Option<i64>,
    pub reviews: Vec<ScrapedReview>,
    pub related_products: Vec<ProductRef>,
    pub recommended_products: Vec<ProductRef>,
}

/// Output of one extraction pass
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    Navigation(Vec<ScrapedNavigation>),
    Categories(Vec<ScrapedCategory>),
    Products(Vec<ScrapedProduct>),
    Detail(ScrapedProductDetail),
}

impl Extracted {
    pub fn kind(&self) -> ExtractKind {
        match self {
            Extracted::Navigation(_) => ExtractKind::Navigation,
            Extracted::Categories(_) => ExtractKind::Categories,
            Extracted::Products(_) => ExtractKind::ProductList,
            Extracted::Detail(_) => ExtractKind::ProductDetail,
        }
    }

    /// Number of accepted candidate records
    pub fn len(&self) -> usize {
        match self {
            Extracted::Navigation(items) => items.len(),
            Extracted::Categories(items) => items.len(),
            Extracted::Products(items) => items.len(),
            Extracted::Detail(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Run the strategy for `kind` over raw page content
pub fn extract(kind: ExtractKind, html: &str, ctx: &PageContext) -> Result<Extracted> {
    Ok(match kind {
        ExtractKind::Navigation => Extracted::Navigation(extract_navigation(html, ctx)?),
        ExtractKind::Categories => Extracted::Categories(extract_categories(html, ctx)?),
        ExtractKind::ProductList => Extracted::Products(extract_products(html, ctx)?),
        ExtractKind::ProductDetail => Extracted::Detail(extract_product_detail(html, ctx)?),
    })
}

macro_rules! unwrap_extracted {
    ($variant:ident => $ty:ty) => {
        impl TryFrom<Extracted> for $ty {
            type Error = Error;

            fn try_from(extracted: Extracted) -> Result<Self> {
                match extracted {
                    Extracted::$variant(inner) => Ok(inner),
                    other => Err(Error::Other(format!(
                        "expected {} output, got {:?}",
                        stringify!($variant),
                        other.kind()
                    ))),
                }
            }
        }
    };
}

unwrap_extracted!(Navigation => Vec<ScrapedNavigation>);
unwrap_extracted!(Categories => Vec<ScrapedCategory>);
unwrap_extracted!(Products => Vec<ScrapedProduct>);
unwrap_extracted!(Detail => ScrapedProductDetail);

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).unwrap_or_else(|e| panic!("bad pattern {pattern}: {e}")))
}

/// Lowercase, drop punctuation, hyphenate whitespace and underscores
pub fn slugify(text: &str) -> String {
    static STRIP: OnceLock<Regex> = OnceLock::new();
    static COLLAPSE: OnceLock<Regex> = OnceLock::new();

    let lower = text.trim().to_lowercase();
    let stripped = regex(&STRIP, r"[^A-Za-z0-9_\s-]").replace_all(&lower, "");
    let hyphenated = regex(&COLLAPSE, r"[\s_-]+").replace_all(&stripped, "-");
    hyphenated.trim_matches('-').to_string()
}

/// Leading number of the text once thousands separators are dropped
///
/// `"£1,234.50"` yields `1234.5` and `"£12.50..."` yields `12.5`; text
/// without digits yields `None`.
pub fn parse_price(text: &str) -> Option<f64> {
    parse_decimal(&text.replace(',', ""))
}

/// First number in the text, with an optional fractional part
pub(crate) fn parse_decimal(text: &str) -> Option<f64> {
    static DECIMAL: OnceLock<Regex> = OnceLock::new();
    regex(&DECIMAL, r"\d+(?:\.\d+)?").find(text)?.as_str().parse().ok()
}

/// First run of digits parsed as an integer
pub(crate) fn parse_integer(text: &str) -> Option<i64> {
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    regex(&DIGITS, r"\d+").find(text)?.as_str().parse().ok()
}

/// Product ID from a `/product/<id>` or `/products/<handle>` path segment,
/// otherwise the slugified URL path with the site root removed
pub fn extract_source_id(url: &str, base_url: &str) -> String {
    static PRODUCT_PATH: OnceLock<Regex> = OnceLock::new();
    if let Some(caps) = regex(&PRODUCT_PATH, r"/products?/([^/?#]+)").captures(url) {
        if let Some(id) = caps.get(1) {
            return id.as_str().to_string();
        }
    }
    let base = base_url.trim_end_matches('/');
    let path = if base.is_empty() {
        url
    } else {
        url.strip_prefix(base).unwrap_or(url)
    };
    slugify(path)
}

/// Dates as they appear on product pages
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim().trim_end_matches('.');
    if text.is_empty() {
        return None;
    }
    const FORMATS: [&str; 7] = [
        "%Y-%m-%d",
        "%d/%m/%Y",
        "%d-%m-%Y",
        "%d %B %Y",
        "%d %b %Y",
        "%B %d, %Y",
        "%b %d, %Y",
    ];
    for format in FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }
    // "March 2004" / "2004"
    if let Ok(date) = NaiveDate::parse_from_str(&format!("1 {text}"), "%d %B %Y") {
        return Some(date);
    }
    if text.len() == 4 {
        if let Ok(year) = text.parse::<i32>() {
            return NaiveDate::from_ymd_opt(year, 1, 1);
        }
    }
    None
}

/// Collapse runs of whitespace into single spaces
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn compile(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::Selector(format!("'{}': {}", css, e)))
}

/// Trimmed text content, `None` when blank
pub(crate) fn element_text(el: ElementRef<'_>) -> Option<String> {
    let text = normalize_whitespace(&el.text().collect::<String>());
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Text of the first descendant matching any of the selectors, in order
pub(crate) fn first_text(el: ElementRef<'_>, selectors: &[Selector]) -> Option<String> {
    selectors
        .iter()
        .find_map(|sel| el.select(sel).find_map(element_text))
}

/// First descendant matching any of the selectors, in order
pub(crate) fn first_element<'a>(el: ElementRef<'a>, selectors: &[Selector]) -> Option<ElementRef<'a>> {
    selectors.iter().find_map(|sel| el.select(sel).next())
}

pub(crate) fn compile_all(selectors: &[&str]) -> Result<Vec<Selector>> {
    selectors.iter().map(|css| compile(css)).collect()
}

/// Image source of an `img`, honouring lazy-loading attributes
pub(crate) fn image_src(img: ElementRef<'_>, ctx: &PageContext) -> Option<String> {
    ["src", "data-src"]
        .iter()
        .filter_map(|attr| img.value().attr(attr))
        .find_map(|src| ctx.resolve(src))
}

#[cfg(test)]
pub(crate) fn test_context(page_url: &str) -> PageContext {
    PageContext::new(
        page_url,
        "https://www.example-books.com",
        "GBP",
        ExtractLimits::default(),
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Fiction & Literature"), "fiction-literature");
        assert_eq!(slugify("  Rare_Books -- Signed  "), "rare-books-signed");
        assert_eq!(slugify("Children's Books"), "childrens-books");
        assert_eq!(slugify("---"), "");
        assert_eq!(slugify("/en-gb/collections/sci-fi"), "en-gbcollectionssci-fi");
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("£4.99"), Some(4.99));
        assert_eq!(parse_price("Now £1,234.50 was £2,000"), Some(1234.5));
        assert_eq!(parse_price("Price unavailable"), None);
        assert_eq!(parse_price(""), None);
        assert_eq!(parse_price("Only £4.99."), Some(4.99));
        assert_eq!(parse_price("£12.50..."), Some(12.5));
        assert_eq!(parse_price("£7."), Some(7.0));
    }

    #[test]
    fn test_extract_source_id() {
        let base = "https://www.example-books.com";
        assert_eq!(
            extract_source_id("https://www.example-books.com/en-gb/product/12345-dune", base),
            "12345-dune"
        );
        assert_eq!(
            extract_source_id("https://www.example-books.com/en-gb/products/dune-frank-herbert?v=2", base),
            "dune-frank-herbert"
        );
        assert_eq!(
            extract_source_id("https://www.example-books.com/en-gb/books/Dune_Special", base),
            "en-gbbooksdune-special"
        );
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2004-03-01"), NaiveDate::from_ymd_opt(2004, 3, 1));
        assert_eq!(parse_date("01/03/2004"), NaiveDate::from_ymd_opt(2004, 3, 1));
        assert_eq!(parse_date("1 March 2004"), NaiveDate::from_ymd_opt(2004, 3, 1));
        assert_eq!(parse_date("March 2004"), NaiveDate::from_ymd_opt(2004, 3, 1));
        assert_eq!(parse_date("2004"), NaiveDate::from_ymd_opt(2004, 1, 1));
        assert_eq!(parse_date("soon"), None);
    }

    #[test]
    fn test_resolve_rejects_non_http() {
        let ctx = test_context("https://www.example-books.com/en-gb/");
        assert_eq!(
            ctx.resolve("collections/fiction").as_deref(),
            Some("https://www.example-books.com/en-gb/collections/fiction")
        );
        assert_eq!(ctx.resolve("javascript:void(0)"), None);
        assert_eq!(ctx.resolve("mailto:shop@example.com"), None);
        assert_eq!(ctx.resolve("   "), None);
    }

    #[test]
    fn test_extract_dispatches_every_kind() {
        let html = r#"
            <html><body>
              <nav><a href="/en-gb/collections/fiction">Fiction</a></nav>
              <div class="product-card">
                <a href="/en-gb/products/dune"><h3>Dune</h3></a>
                <span class="price">£4.99</span>
              </div>
              <div class="product-description">A desert planet.</div>
            </body></html>
        "#;
        let ctx = test_context("https://www.example-books.com/en-gb");

        let navigation = extract(ExtractKind::Navigation, html, &ctx).unwrap();
        assert_eq!(navigation.kind(), ExtractKind::Navigation);
        assert_eq!(navigation.len(), 1);

        let categories = extract(ExtractKind::Categories, html, &ctx).unwrap();
        assert_eq!(categories.kind(), ExtractKind::Categories);
        let categories: Vec<ScrapedCategory> = categories.try_into().unwrap();
        assert_eq!(categories[0].slug, "fiction");

        let products = extract(ExtractKind::ProductList, html, &ctx).unwrap();
        assert_eq!(products.len(), 1);
        assert!(!products.is_empty());

        let detail = extract(ExtractKind::ProductDetail, html, &ctx).unwrap();
        assert_eq!(detail.len(), 1);
        let detail: ScrapedProductDetail = detail.try_into().unwrap();
        assert_eq!(detail.description.as_deref(), Some("A desert planet."));
    }

    #[test]
    fn test_extracted_wrong_variant_is_an_error() {
        let err = Vec::<ScrapedProduct>::try_from(Extracted::Navigation(Vec::new())).unwrap_err();
        assert!(matches!(err, Error::Other(_)));
    }
}
