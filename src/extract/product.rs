//! Product listing extraction

use super::{
    compile, compile_all, element_text, extract_source_id, first_element, first_text, image_src,
    parse_price, PageContext, ScrapedProduct,
};
use crate::error::Result;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::debug;

/// One known listing markup variant
#[derive(Debug, Clone, Copy)]
pub struct ProductLayout {
    pub name: &'static str,
    /// Selectors for the per-product container, tried in order
    pub containers: &'static [&'static str],
    pub link: &'static [&'static str],
    /// Title selectors; the link text is used when none match
    pub title: &'static [&'static str],
    pub author: &'static [&'static str],
}

/// Listing layouts in priority order; the first with any accepted product wins
pub const PRODUCT_LAYOUTS: &[ProductLayout] = &[
    ProductLayout {
        name: "instant-search",
        containers: &["li.ais-InfiniteHits-item"],
        link: &[
            "a.product-card.truncate-title",
            "a.product-card",
            "a[href*=\"/products/\"]",
        ],
        title: &[],
        author: &["p.author.truncate-author", ".author"],
    },
    ProductLayout {
        name: "product-card",
        containers: &[".product-card", ".product-tile", ".grid-item.product"],
        link: &["a[href*=\"/products/\"]", "a"],
        title: &[".product-card__title, h2, h3, .title"],
        author: &[".author, .subtitle"],
    },
];

const PRICE: &[&str] = &[".price"];
const ORIGINAL_PRICE: &[&str] = &[".was-price, .compare-at-price, .price--compare, .rrp"];
const CONDITION: &[&str] = &[".condition, .product-condition"];
const FORMAT: &[&str] = &[".format, .product-format, .binding"];
const OUT_OF_STOCK: &str = ".sold-out, .out-of-stock, [data-availability=\"out-of-stock\"]";

struct CompiledLayout {
    containers: Vec<Selector>,
    link: Vec<Selector>,
    title: Vec<Selector>,
    author: Vec<Selector>,
}

impl CompiledLayout {
    fn new(layout: &ProductLayout) -> Result<Self> {
        Ok(Self {
            containers: compile_all(layout.containers)?,
            link: compile_all(layout.link)?,
            title: compile_all(layout.title)?,
            author: compile_all(layout.author)?,
        })
    }
}

struct Fields {
    price: Vec<Selector>,
    original_price: Vec<Selector>,
    condition: Vec<Selector>,
    format: Vec<Selector>,
    out_of_stock: Selector,
    img: Selector,
}

/// Extract product summaries from a collection page
///
/// At most `ctx.limits.products` products are returned. Only links whose
/// URL contains `/products/` are accepted.
pub fn extract_products(html: &str, ctx: &PageContext) -> Result<Vec<ScrapedProduct>> {
    let document = Html::parse_document(html);
    let fields = Fields {
        price: compile_all(PRICE)?,
        original_price: compile_all(ORIGINAL_PRICE)?,
        condition: compile_all(CONDITION)?,
        format: compile_all(FORMAT)?,
        out_of_stock: compile(OUT_OF_STOCK)?,
        img: compile("img")?,
    };

    for layout in PRODUCT_LAYOUTS {
        let compiled = CompiledLayout::new(layout)?;

        for container_sel in &compiled.containers {
            let mut seen = HashSet::new();
            let mut items = Vec::new();

            for container in document.select(container_sel) {
                if items.len() >= ctx.limits.products {
                    break;
                }
                if let Some(product) = read_product(container, &compiled, &fields, ctx) {
                    if seen.insert(product.source_url.clone()) {
                        items.push(product);
                    }
                }
            }

            if !items.is_empty() {
                debug!(
                    "Product layout '{}' matched {} products",
                    layout.name,
                    items.len()
                );
                return Ok(items);
            }
        }
    }

    Ok(Vec::new())
}

fn read_product(
    container: ElementRef<'_>,
    layout: &CompiledLayout,
    fields: &Fields,
    ctx: &PageContext,
) -> Option<ScrapedProduct> {
    let link = if container.value().name() == "a" && container.value().attr("href").is_some() {
        container
    } else {
        first_element(container, &layout.link)?
    };

    let title = first_text(container, &layout.title).or_else(|| element_text(link))?;
    let source_url = ctx.resolve(link.value().attr("href")?)?;
    if !source_url.contains("/products/") {
        return None;
    }

    let price_of = |selectors: &[Selector]| first_text(container, selectors).and_then(|t| parse_price(&t));

    Some(ScrapedProduct {
        source_id: extract_source_id(&source_url, &ctx.base_url),
        title,
        author: first_text(container, &layout.author),
        price: price_of(&fields.price),
        original_price: price_of(&fields.original_price),
        currency: ctx.currency.clone(),
        image_url: container.select(&fields.img).next().and_then(|img| image_src(img, ctx)),
        condition: first_text(container, &fields.condition),
        format: first_text(container, &fields.format),
        in_stock: container.select(&fields.out_of_stock).next().is_none(),
        source_url,
    })
}
