//! bookscrape - scrape a book catalogue into a local SQLite cache
//!
//! This crate provides:
//! - Extraction strategies for navigation, category, listing and product pages
//! - Upsert reconciliation of scraped candidates against persisted rows
//! - A scrape job ledger with an explicit state machine
//! - Staleness-aware refresh and a rate-limited browser session
//! - CLI commands that trigger scrapes and inspect the catalogue

pub mod commands;
pub mod config;
pub mod crawl;
pub mod error;
pub mod extract;
pub mod jobs;
pub mod meta;
pub mod progress;
pub mod reconcile;
pub mod scrape;
pub mod staleness;

pub use config::Config;
pub use error::{Error, Result};
