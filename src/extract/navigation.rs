//! Navigation heading extraction

use super::{compile, element_text, slugify, PageContext, ScrapedNavigation};
use crate::error::Result;
use scraper::Html;
use std::collections::HashSet;
use tracing::debug;

/// Menu link selectors, tried in order; the first yielding any heading wins
pub const NAVIGATION_SELECTORS: &[&str] = &[
    "nav a",
    ".main-nav a",
    ".navigation a",
    "header nav a",
    "[data-testid=\"nav-link\"]",
    ".menu a",
];

/// Extract top-level navigation headings in first-seen order
///
/// Links pointing at fragments are skipped and later duplicates of a URL
/// are dropped. `order` is the heading's index in the accepted list.
pub fn extract_navigation(html: &str, ctx: &PageContext) -> Result<Vec<ScrapedNavigation>> {
    let document = Html::parse_document(html);

    for css in NAVIGATION_SELECTORS {
        let selector = compile(css)?;
        let mut seen = HashSet::new();
        let mut items = Vec::new();

        for link in document.select(&selector) {
            if items.len() >= ctx.limits.navigation {
                break;
            }
            let Some(title) = element_text(link) else {
                continue;
            };
            let Some(url) = link.value().attr("href").and_then(|h| ctx.resolve(h)) else {
                continue;
            };
            if url.contains('#') || !seen.insert(url.clone()) {
                continue;
            }

            let slug = slugify(&title);
            if slug.is_empty() {
                continue;
            }
            items.push(ScrapedNavigation {
                order: items.len() as i64,
                title,
                slug,
                url,
            });
        }

        if !items.is_empty() {
            debug!("Navigation selector '{}' matched {} headings", css, items.len());
            return Ok(items);
        }
    }

    Ok(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::test_context;

    #[test]
    fn test_duplicate_href_dropped() {
        let html = r#"
            <html><body><nav>
                <a href="/en-gb/collections/fiction">Fiction</a>
                <a href="/en-gb/collections/non-fiction">Non-Fiction</a>
                <a href="/en-gb/collections/fiction">Fiction again</a>
            </nav></body></html>
        "#;
        let ctx = test_context("https://www.example-books.com/en-gb");
        let items = extract_navigation(html, &ctx).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Fiction");
        assert_eq!(items[0].order, 0);
        assert_eq!(items[0].slug, "fiction");
        assert_eq!(items[1].title, "Non-Fiction");
        assert_eq!(items[1].order, 1);
        assert_eq!(
            items[1].url,
            "https://www.example-books.com/en-gb/collections/non-fiction"
        );
    }

    #[test]
    fn test_falls_back_to_later_selector() {
        let html = r##"
            <html><body>
                <nav><a href="#top">Top</a></nav>
                <ul class="menu">
                    <li><a href="/en-gb/pages/rare-books">Rare Books</a></li>
                    <li><a href="">Empty</a></li>
                    <li><a href="/en-gb/pages/gifts">   </a></li>
                </ul>
            </body></html>
        "##;
        let ctx = test_context("https://www.example-books.com/en-gb");
        let items = extract_navigation(html, &ctx).unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].slug, "rare-books");
    }

    #[test]
    fn test_cap_and_empty_page() {
        let links: String = (0..15)
            .map(|i| format!("<a href=\"/n/{i}\">Heading {i}</a>"))
            .collect();
        let html = format!("<nav>{links}</nav>");
        let ctx = test_context("https://www.example-books.com/");
        assert_eq!(extract_navigation(&html, &ctx).unwrap().len(), 10);

        let none = extract_navigation("<html><body><p>nothing</p></body></html>", &ctx).unwrap();
        assert!(none.is_empty());
    }
}
