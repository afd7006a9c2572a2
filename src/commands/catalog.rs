//! Category tree and navigation listings

use crate::error::{Error, Result};
use crate::meta::{CatalogDb, Category, NavigationHeading};
use futures::future::BoxFuture;
use serde::Serialize;
use tracing::info;

/// A category and everything beneath it
#[derive(Debug, Clone, Serialize)]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: Category,
    pub children: Vec<CategoryNode>,
}

impl CategoryNode {
    /// Categories in this subtree, including this one
    pub fn subtree_size(&self) -> usize {
        1 + self.children.iter().map(CategoryNode::subtree_size).sum::<usize>()
    }
}

/// A navigation heading with the categories linked to it
#[derive(Debug, Clone, Serialize)]
pub struct NavigationListing {
    #[serde(flatten)]
    pub heading: NavigationHeading,
    pub categories: Vec<Category>,
}

/// Root categories with their subcategories to any depth
///
/// With `root`, only the subtree of that category is returned.
pub async fn cmd_category_tree(db: &CatalogDb, root: Option<&str>) -> Result<Vec<CategoryNode>> {
    info!("Building category tree");

    let roots = match root {
        Some(slug) => vec![db
            .get_category_by_slug(slug)
            .await?
            .ok_or_else(|| Error::CategoryNotFound(slug.to_string()))?],
        None => db.list_root_categories().await?,
    };
    let mut tree = Vec::with_capacity(roots.len());
    for root in roots {
        tree.push(build_node(db, root).await?);
    }
    Ok(tree)
}

/// Each category has one parent, so descending from a root never revisits a node
fn build_node(db: &CatalogDb, category: Category) -> BoxFuture<'_, Result<CategoryNode>> {
    Box::pin(async move {
        let mut children = Vec::new();
        for child in db.list_child_categories(&category.id).await? {
            children.push(build_node(db, child).await?);
        }
        Ok(CategoryNode { category, children })
    })
}

/// Navigation headings, or the categories under one heading
pub async fn cmd_navigation(db: &CatalogDb, slug: Option<&str>) -> Result<Vec<NavigationListing>> {
    let headings = match slug {
        Some(slug) => vec![db
            .get_navigation_by_slug(slug)
            .await?
            .ok_or_else(|| Error::NavigationNotFound(slug.to_string()))?],
        None => db.list_navigations().await?,
    };

    let mut listings = Vec::with_capacity(headings.len());
    for heading in headings {
        let categories = db.list_navigation_categories(&heading.id).await?;
        listings.push(NavigationListing { heading, categories });
    }
    Ok(listings)
}

pub fn print_navigation_listings(listings: &[NavigationListing]) {
    println!("\n🧭 Navigation\n");

    if listings.is_empty() {
        println!("No navigation stored. Use 'bookscrape scrape navigation' first.");
        return;
    }

    for listing in listings {
        println!(
            "{:>2}. {} [{}]  {} categor{}",
            listing.heading.order,
            listing.heading.title,
            listing.heading.slug,
            listing.categories.len(),
            if listing.categories.len() == 1 { "y" } else { "ies" }
        );
        for category in &listing.categories {
            println!("    • {} [{}]", category.title, category.slug);
        }
    }
}

pub fn print_category_tree(tree: &[CategoryNode]) {
    println!("\n📚 Categories\n");

    if tree.is_empty() {
        println!("No categories stored. Use 'bookscrape scrape categories' first.");
        return;
    }

    for node in tree {
        print_node(node, 0);
    }
}

fn print_node(node: &CategoryNode, depth: usize) {
    let count = node
        .category
        .product_count
        .map(|n| format!(" ({} products)", n))
        .unwrap_or_default();
    println!(
        "{}• {} [{}]{}",
        "  ".repeat(depth),
        node.category.title,
        node.category.slug,
        count
    );
    for child in &node.children {
        print_node(child, depth + 1);
    }
}
