//! bookscrape CLI entry point

use bookscrape::{
    commands::{
        cmd_category_tree, cmd_get_job, cmd_init, cmd_list_jobs, cmd_navigation,
        cmd_scrape_categories, cmd_scrape_navigation, cmd_scrape_product, cmd_scrape_products,
        cmd_status, print_categories, print_category_tree, print_detail_outcome, print_init,
        print_job, print_jobs, print_navigation, print_navigation_listings, print_product_report,
        print_status, ProductScrapeOptions,
    },
    config::Config,
    crawl::BrowserSession,
    error::{Error, Result},
    meta::{CatalogDb, DEFAULT_JOB_LIST_LIMIT},
    progress::LogWriterFactory,
    scrape::Orchestrator,
};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "bookscrape")]
#[command(version, about = "Scrape a book catalogue into a local SQLite cache", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize bookscrape configuration and database
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Scrape part of the catalogue
    Scrape {
        #[command(subcommand)]
        target: ScrapeCommand,
    },

    /// List recent scrape jobs
    Jobs {
        /// Maximum number of jobs
        #[arg(short, long, default_value_t = DEFAULT_JOB_LIST_LIMIT)]
        limit: i64,
    },

    /// Show one scrape job
    Job {
        /// Job ID
        id: String,
    },

    /// Print the stored category tree
    Categories {
        /// Only the subtree under this category
        slug: Option<String>,
    },

    /// List stored navigation headings and their categories
    Navigation {
        /// Only this heading
        slug: Option<String>,
    },

    /// Show system status
    Status,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum ScrapeCommand {
    /// Scrape the site menu into navigation headings
    Navigation {
        /// Record a forced refresh on the job
        #[arg(long)]
        force: bool,
    },

    /// Scrape categories (root categories when no slug is given)
    Categories {
        /// Category or navigation slug to scrape beneath
        slug: Option<String>,

        /// Record a forced refresh on the job
        #[arg(long)]
        force: bool,
    },

    /// Scrape listing pages of a category
    Products {
        /// Category slug
        category: String,

        /// First page to scrape
        #[arg(long, default_value = "1")]
        page: u32,

        /// Number of pages to walk (stops early at an empty page)
        #[arg(long, default_value = "1")]
        pages: u32,

        /// Maximum products to take from each page
        #[arg(short, long)]
        limit: Option<usize>,

        /// Record a forced refresh on the job
        #[arg(long)]
        force: bool,
    },

    /// Scrape a stored product's detail page and reviews
    Product {
        /// Product source ID
        source_id: String,

        /// Ignore the detail cache
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(LogWriterFactory::default()))
        .with(filter)
        .init();

    match cli.command {
        Commands::Init { force } => {
            let base_dir = cli.config.as_deref().map(config_base_dir);
            let report = cmd_init(base_dir, force).await?;
            output(cli.json, &report, print_init)?;
            return Ok(());
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "bookscrape", &mut std::io::stdout());
            return Ok(());
        }
        _ => {}
    }

    let config = load_config(cli.config.as_deref())?;
    let db = CatalogDb::connect(&config).await?;
    if !db.is_initialized().await? {
        return Err(Error::NotInitialized);
    }

    match cli.command {
        Commands::Init { .. } | Commands::Completions { .. } => unreachable!(),

        Commands::Scrape { target } => {
            let session = BrowserSession::from_config(&config)?;
            let orchestrator = Orchestrator::new(&config, db, session.clone());
            let result = handle_scrape(&orchestrator, target, cli.json).await;
            if let Err(e) = session.close().await {
                warn!("Failed to close browser session: {}", e);
            }
            result?;
        }

        Commands::Jobs { limit } => {
            let jobs = cmd_list_jobs(&db, limit).await?;
            output(cli.json, &jobs, |jobs| print_jobs(jobs))?;
        }

        Commands::Job { id } => {
            let job = cmd_get_job(&db, &id).await?;
            output(cli.json, &job, print_job)?;
        }

        Commands::Categories { slug } => {
            let tree = cmd_category_tree(&db, slug.as_deref()).await?;
            output(cli.json, &tree, |tree| print_category_tree(tree))?;
        }

        Commands::Navigation { slug } => {
            let listings = cmd_navigation(&db, slug.as_deref()).await?;
            output(cli.json, &listings, |listings| print_navigation_listings(listings))?;
        }

        Commands::Status => {
            let status = cmd_status(&config, &db).await?;
            output(cli.json, &status, print_status)?;
        }
    }

    Ok(())
}

async fn handle_scrape(orchestrator: &Orchestrator, target: ScrapeCommand, json: bool) -> Result<()> {
    match target {
        ScrapeCommand::Navigation { force } => {
            let items = cmd_scrape_navigation(orchestrator, force).await?;
            output(json, &items, |items| print_navigation(items))?;
        }

        ScrapeCommand::Categories { slug, force } => {
            let items = cmd_scrape_categories(orchestrator, slug.as_deref(), force).await?;
            output(json, &items, |items| print_categories(items))?;
        }

        ScrapeCommand::Products {
            category,
            page,
            pages,
            limit,
            force,
        } => {
            let options = ProductScrapeOptions {
                category_slug: category,
                page,
                pages,
                limit,
                force_refresh: force,
                show_progress: !json && pages > 1,
            };
            let report = cmd_scrape_products(orchestrator, options).await?;
            output(json, &report, print_product_report)?;
        }

        ScrapeCommand::Product { source_id, force } => {
            let outcome = cmd_scrape_product(orchestrator, &source_id, force).await?;
            output(json, &outcome, |outcome| print_detail_outcome(&source_id, outcome))?;
        }
    }

    Ok(())
}

/// Pretty JSON with `--json`, the human printer otherwise
fn output<T: Serialize + ?Sized>(json: bool, value: &T, print: impl FnOnce(&T)) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print(value);
    }
    Ok(())
}

/// `--config` may name a `.toml` file or the directory holding it
fn config_base_dir(path: &Path) -> PathBuf {
    if path.extension().is_some_and(|e| e == "toml") {
        path.parent()
            .map(PathBuf::from)
            .unwrap_or_else(Config::default_base_dir)
    } else {
        path.to_path_buf()
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config_path = match path {
        Some(p) if p.extension().is_some_and(|e| e == "toml") => p.to_path_buf(),
        Some(dir) => dir.join("config.toml"),
        None => Config::default_config_path(),
    };

    if !config_path.exists() {
        return Err(Error::Config(format!(
            "Config file not found: {}. Run 'bookscrape init' first.",
            config_path.display()
        )));
    }

    Config::load(&config_path)
}
