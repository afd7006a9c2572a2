//! Product detail page extraction

use super::{
    compile, compile_all, element_text, extract_source_id, first_text, parse_date, parse_decimal,
    parse_integer, PageContext, ProductRef, ScrapedProductDetail, ScrapedReview,
};
use crate::error::Result;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

const DESCRIPTION: &str = ".description, .product-description, [data-testid=\"description\"]";
const SPECS_TABLE: &str = ".specifications, .product-specs, table";
const SPEC_KEY: &str = "th, td:first-child";
const SPEC_VALUE: &str = "td:last-child";
const RATING: &str = ".rating, .product-rating, [data-testid=\"rating\"]";
const REVIEW_COUNT: &str = ".review-count, .reviews-count";
const REVIEW: &str = ".review, .product-review, [data-testid=\"review\"]";
const RELATED: &str = ".related-products a, .you-may-like a, [data-testid=\"related-product\"]";
const RECOMMENDED: &str =
    ".recommended-products a, .recommendations a, [data-testid=\"recommended-product\"]";

const REVIEW_AUTHOR: &[&str] = &[".author, .reviewer-name"];
const REVIEW_RATING: &[&str] = &[".rating, .stars"];
const REVIEW_TITLE: &[&str] = &[".title, .review-title"];
const REVIEW_TEXT: &[&str] = &[".text, .review-text, .content"];
const REVIEW_DATE: &[&str] = &[".date, .review-date"];
const REVIEW_VERIFIED: &str = ".verified, .verified-purchase";

/// Extract description, specifications, ratings, reviews and cross-references
pub fn extract_product_detail(html: &str, ctx: &PageContext) -> Result<ScrapedProductDetail> {
    let document = Html::parse_document(html);
    let root = document.root_element();
    let mut detail = ScrapedProductDetail::default();

    detail.description = document
        .select(&compile(DESCRIPTION)?)
        .next()
        .and_then(element_text);

    if let Some(table) = document.select(&compile(SPECS_TABLE)?).next() {
        read_specs(table, &mut detail)?;
    }

    detail.ratings_avg = first_text(root, &[compile(RATING)?]).and_then(|t| parse_decimal(&t));
    detail.reviews_count = first_text(root, &[compile(REVIEW_COUNT)?]).and_then(|t| parse_integer(&t));

    let review_fields = ReviewSelectors::new()?;
    detail.reviews = document
        .select(&compile(REVIEW)?)
        .filter_map(|el| review_fields.read(el))
        .collect();

    detail.related_products = product_refs(&document, &compile(RELATED)?, ctx);
    detail.recommended_products = product_refs(&document, &compile(RECOMMENDED)?, ctx);

    Ok(detail)
}

fn read_specs(table: ElementRef<'_>, detail: &mut ScrapedProductDetail) -> Result<()> {
    let row_sel = compile("tr")?;
    let key_sel = compile(SPEC_KEY)?;
    let value_sel = compile(SPEC_VALUE)?;

    for row in table.select(&row_sel) {
        let Some(key) = row.select(&key_sel).next().and_then(element_text) else {
            continue;
        };
        let Some(value) = row.select(&value_sel).next().and_then(element_text) else {
            continue;
        };

        let lower = key.to_lowercase();
        if lower.contains("publisher") {
            detail.publisher = Some(value.clone());
        }
        if lower.contains("isbn") && !lower.contains("13") {
            detail.isbn = Some(value.clone());
        }
        if lower.contains("isbn-13") || lower.contains("isbn13") {
            detail.isbn13 = Some(value.clone());
        }
        if lower.contains("pages") {
            detail.pages = parse_integer(&value);
        }
        if lower.contains("language") {
            detail.language = Some(value.clone());
        }
        if lower.contains("dimension") {
            detail.dimensions = Some(value.clone());
        }
        if lower.contains("weight") {
            detail.weight = Some(value.clone());
        }
        if lower.contains("publication") || lower.contains("date") {
            detail.publication_date = parse_date(&value);
        }

        detail.specs.insert(key, value);
    }
    Ok(())
}

struct ReviewSelectors {
    author: Vec<Selector>,
    rating: Vec<Selector>,
    title: Vec<Selector>,
    text: Vec<Selector>,
    date: Vec<Selector>,
    verified: Selector,
}

impl ReviewSelectors {
    fn new() -> Result<Self> {
        Ok(Self {
            author: compile_all(REVIEW_AUTHOR)?,
            rating: compile_all(REVIEW_RATING)?,
            title: compile_all(REVIEW_TITLE)?,
            text: compile_all(REVIEW_TEXT)?,
            date: compile_all(REVIEW_DATE)?,
            verified: compile(REVIEW_VERIFIED)?,
        })
    }

    /// A review block needs text or a star rating to count
    fn read(&self, el: ElementRef<'_>) -> Option<ScrapedReview> {
        let text = first_text(el, &self.text);
        let rating = first_text(el, &self.rating)
            .and_then(|t| parse_decimal(&t))
            .map(|r| r.trunc() as i64)
            .filter(|r| (1..=5).contains(r));
        if text.is_none() && rating.is_none() {
            return None;
        }

        Some(ScrapedReview {
            author: first_text(el, &self.author),
            rating,
            title: first_text(el, &self.title),
            text,
            review_date: first_text(el, &self.date).and_then(|d| parse_date(&d)),
            verified: el.select(&self.verified).next().is_some(),
        })
    }
}

fn product_refs(document: &Html, selector: &Selector, ctx: &PageContext) -> Vec<ProductRef> {
    let mut seen = HashSet::new();
    document
        .select(selector)
        .filter_map(|link| {
            let title = element_text(link)?;
            let url = ctx.resolve(link.value().attr("href")?)?;
            Some(ProductRef {
                source_id: extract_source_id(&url, &ctx.base_url),
                title,
                url,
            })
        })
        .filter(|r| seen.insert(r.url.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::test_context;
    use chrono::NaiveDate;

    const PAGE: &str = r#"
        <html><body>
          <div class="product-description"> A desert planet,   a spice. </div>
          <table class="specifications">
            <tr><th>Publisher</th><td>Hodder</td></tr>
            <tr><th>ISBN</th><td>0340960191</td></tr>
            <tr><th>ISBN-13</th><td>9780340960196</td></tr>
            <tr><th>Number of Pages</th><td>612 pages</td></tr>
            <tr><th>Language</th><td>English</td></tr>
            <tr><th>Publication Date</th><td>2007-07-12</td></tr>
            <tr><th>Blank</th><td>  </td></tr>
          </table>
          <div class="product-rating">4.6 out of 5</div>
          <span class="reviews-count">(3 reviews)</span>
          <div class="review">
            <span class="reviewer-name">Ann</span>
            <span class="stars">5</span>
            <h4 class="review-title">Classic</h4>
            <p class="review-text">Loved it.</p>
            <span class="review-date">2023-01-05</span>
            <span class="verified-purchase">Verified</span>
          </div>
          <div class="review"><span class="author">Bob</span><span class="stars">4.5</span></div>
          <div class="review"><span class="author">Empty</span></div>
          <div class="related-products">
            <a href="/en-gb/products/children-of-dune">Children of Dune</a>
            <a href="/en-gb/products/children-of-dune">Children of Dune</a>
            <a href="/en-gb/products/dune-messiah"></a>
          </div>
          <div class="recommendations">
            <a href="/en-gb/products/foundation">Foundation</a>
          </div>
        </body></html>
    "#;

    #[test]
    fn test_detail_fields() {
        let ctx = test_context("https://www.example-books.com/en-gb/products/dune");
        let detail = extract_product_detail(PAGE, &ctx).unwrap();

        assert_eq!(detail.description.as_deref(), Some("A desert planet, a spice."));
        assert_eq!(detail.publisher.as_deref(), Some("Hodder"));
        assert_eq!(detail.isbn.as_deref(), Some("0340960191"));
        assert_eq!(detail.isbn13.as_deref(), Some("9780340960196"));
        assert_eq!(detail.pages, Some(612));
        assert_eq!(detail.language.as_deref(), Some("English"));
        assert_eq!(detail.publication_date, NaiveDate::from_ymd_opt(2007, 7, 12));
        assert_eq!(detail.specs.len(), 6);
        assert!(!detail.specs.contains_key("Blank"));
        assert_eq!(detail.ratings_avg, Some(4.6));
        assert_eq!(detail.reviews_count, Some(3));
    }

    #[test]
    fn test_reviews_and_refs() {
        let ctx = test_context("https://www.example-books.com/en-gb/products/dune");
        let detail = extract_product_detail(PAGE, &ctx).unwrap();

        assert_eq!(detail.reviews.len(), 2);
        let first = &detail.reviews[0];
        assert_eq!(first.author.as_deref(), Some("Ann"));
        assert_eq!(first.rating, Some(5));
        assert_eq!(first.title.as_deref(), Some("Classic"));
        assert_eq!(first.review_date, NaiveDate::from_ymd_opt(2023, 1, 5));
        assert!(first.verified);
        assert_eq!(detail.reviews[1].rating, Some(4));
        assert!(!detail.reviews[1].verified);

        assert_eq!(detail.related_products.len(), 1);
        assert_eq!(detail.related_products[0].source_id, "children-of-dune");
        assert_eq!(detail.recommended_products[0].title, "Foundation");
    }

    #[test]
    fn test_bare_page_is_empty_not_error() {
        let ctx = test_context("https://www.example-books.com/en-gb/products/dune");
        let detail = extract_product_detail("<html><body></body></html>", &ctx).unwrap();
        assert_eq!(detail, ScrapedProductDetail::default());
    }
}
