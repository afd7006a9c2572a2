//! Init command implementation

use crate::config::Config;
use crate::error::{Error, Result};
use crate::meta::CatalogDb;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

/// Where `init` put things
#[derive(Debug, Clone, Serialize)]
pub struct InitReport {
    pub config_path: PathBuf,
    pub db_path: PathBuf,
    pub overwritten: bool,
}

/// Write the default configuration and create the catalogue schema
///
/// An existing config file is only replaced with `force`. The database is
/// opened either way so a deleted `catalog.db` is recreated.
pub async fn cmd_init(base_dir: Option<PathBuf>, force: bool) -> Result<InitReport> {
    let mut config = Config::default();
    config.init_paths(base_dir);

    let exists = config.paths.config_file.exists();
    if exists && !force {
        return Err(Error::Config(format!(
            "Config already exists at {}. Use --force to overwrite.",
            config.paths.config_file.display()
        )));
    }

    info!("Initializing bookscrape in {:?}", config.paths.base_dir);
    config.save()?;

    let db = CatalogDb::new(&config.paths.db_file).await?;
    if !db.is_initialized().await? {
        return Err(Error::NotInitialized);
    }

    Ok(InitReport {
        config_path: config.paths.config_file,
        db_path: config.paths.db_file,
        overwritten: exists,
    })
}

pub fn print_init(report: &InitReport) {
    println!("✓ bookscrape initialized");
    println!("  Config:   {}", report.config_path.display());
    println!("  Database: {}", report.db_path.display());
    println!("\nNext steps:");
    println!("  1. Edit the config file to point scrape.base_url at the catalogue");
    println!("  2. Scrape the menu: bookscrape scrape navigation");
    println!("  3. Scrape categories: bookscrape scrape categories");
}
