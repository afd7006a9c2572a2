//! Category (collection) extraction

use super::{
    compile, compile_all, element_text, first_element, first_text, image_src, parse_integer,
    regex, slugify, PageContext, ScrapedCategory,
};
use crate::error::Result;
use regex::Regex;
use scraper::{ElementRef, Html};
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::debug;

/// Collection link selectors; matches from all of them are combined
pub const CATEGORY_SELECTORS: &[&str] = &[
    "a[href*=\"/collections/\"]",
    ".collection-link",
    ".category-link",
    ".mega-menu a",
    ".nav-link[href*=\"/collections/\"]",
    ".category-card a",
    ".collection-card a",
    ".sidebar a[href*=\"/collections/\"]",
    ".filter-list a",
];

const NESTED_TITLE: &[&str] = &[".title, h2, h3, span"];
const PRODUCT_COUNT: &[&str] = &[".product-count, .count"];

/// Extract collection links from a landing or category page
///
/// Unlike the other strategies every selector contributes; candidates are
/// deduplicated by URL and then by slug, first seen wins.
pub fn extract_categories(html: &str, ctx: &PageContext) -> Result<Vec<ScrapedCategory>> {
    let document = Html::parse_document(html);
    let nested_title = compile_all(NESTED_TITLE)?;
    let product_count = compile_all(PRODUCT_COUNT)?;
    let img = compile("img")?;

    let mut seen_urls = HashSet::new();
    let mut seen_slugs = HashSet::new();
    let mut items = Vec::new();

    'selectors: for css in CATEGORY_SELECTORS {
        let selector = compile(css)?;
        let before = items.len();

        for link in document.select(&selector) {
            if items.len() >= ctx.limits.categories {
                break 'selectors;
            }
            let Some(url) = link.value().attr("href").and_then(|h| ctx.resolve(h)) else {
                continue;
            };
            if !url.contains("/collections/") || !seen_urls.insert(url.clone()) {
                continue;
            }

            let title = element_text(link)
                .or_else(|| {
                    link.value()
                        .attr("title")
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(str::to_string)
                })
                .or_else(|| first_text(link, &nested_title));
            let Some(title) = title else {
                continue;
            };
            let len = title.chars().count();
            if !(2..100).contains(&len) {
                continue;
            }

            let slug = collection_slug(&url).unwrap_or_else(|| slugify(&title));
            if slug.is_empty() || !seen_slugs.insert(slug.clone()) {
                continue;
            }

            let image_url = link
                .select(&img)
                .next()
                .or_else(|| {
                    link.parent()
                        .and_then(ElementRef::wrap)
                        .and_then(|parent| parent.select(&img).next())
                })
                .and_then(|el| image_src(el, ctx));

            items.push(ScrapedCategory {
                title,
                slug,
                url,
                image_url,
                product_count: first_element(link, &product_count)
                    .and_then(element_text)
                    .and_then(|t| parse_integer(&t)),
                parent_slug: None,
            });
        }

        if items.len() > before {
            debug!("Category selector '{}' added {} entries", css, items.len() - before);
        }
    }

    Ok(items)
}

/// The `<slug>` in `/collections/<slug>`
pub fn collection_slug(url: &str) -> Option<String> {
    static COLLECTION: OnceLock<Regex> = OnceLock::new();
    regex(&COLLECTION, r"/collections/([^/?#]+)")
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
