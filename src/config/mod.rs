//! Configuration management for bookscrape
//!
//! Handles loading, saving, and validating configuration from TOML files.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Target site and scrape limits
    #[serde(default)]
    pub scrape: ScrapeConfig,

    /// Cache freshness policy
    #[serde(default)]
    pub cache: CacheConfig,

    /// Page loading backend
    #[serde(default)]
    pub browser: BrowserConfig,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// Scrape target and courtesy limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Catalogue site root
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Locale prefix prepended to collection and page paths
    #[serde(default = "default_locale_path")]
    pub locale_path: String,

    /// Outbound request ceiling, global across targets
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,

    /// Navigation timeout for navigation and product detail pages (seconds)
    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_secs: u64,

    /// Handler timeout for navigation and product detail pages (seconds)
    #[serde(default = "default_handler_timeout")]
    pub handler_timeout_secs: u64,

    /// Navigation timeout for category and product list pages (seconds)
    #[serde(default = "default_listing_navigation_timeout")]
    pub listing_navigation_timeout_secs: u64,

    /// Handler timeout for category and product list pages (seconds)
    #[serde(default = "default_listing_handler_timeout")]
    pub listing_handler_timeout_secs: u64,

    /// Recorded on each job; no retry loop drives it
    #[serde(default = "default_max_retries")]
    pub max_retries: i64,

    /// Currency assigned to scraped prices
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Per-page result caps
    #[serde(default)]
    pub limits: ExtractLimits,
}

/// Maximum records accepted from one page
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtractLimits {
    #[serde(default = "default_navigation_cap")]
    pub navigation: usize,

    #[serde(default = "default_category_cap")]
    pub categories: usize,

    #[serde(default = "default_product_cap")]
    pub products: usize,
}

/// Cache freshness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Product detail cache TTL (hours)
    #[serde(default = "default_cache_ttl_hours")]
    pub ttl_hours: f64,

    /// Default max age for staleness checks (hours)
    #[serde(default = "default_max_age_hours")]
    pub max_age_hours: f64,
}

/// Which page loader drives the browser session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserEngine {
    /// Plain HTTP fetch, no script execution
    Http,
    /// Headless Chrome (requires the js-rendering feature)
    Chromium,
}

/// Page loading configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_browser_engine")]
    pub engine: BrowserEngine,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Time to wait after load for dynamic content (milliseconds)
    #[serde(default = "default_render_wait")]
    pub render_wait_ms: u64,

    #[serde(default = "default_true")]
    pub headless: bool,

    /// Disable for Docker/CI environments
    #[serde(default = "default_true")]
    pub sandbox: bool,
}

/// Internal paths configuration
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    /// Base directory for bookscrape data
    pub base_dir: PathBuf,

    /// Path to config file
    pub config_file: PathBuf,

    /// Path to SQLite catalogue database
    pub db_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scrape: ScrapeConfig::default(),
            cache: CacheConfig::default(),
            browser: BrowserConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            locale_path: default_locale_path(),
            requests_per_minute: default_requests_per_minute(),
            navigation_timeout_secs: default_navigation_timeout(),
            handler_timeout_secs: default_handler_timeout(),
            listing_navigation_timeout_secs: default_listing_navigation_timeout(),
            listing_handler_timeout_secs: default_listing_handler_timeout(),
            max_retries: default_max_retries(),
            currency: default_currency(),
            limits: ExtractLimits::default(),
        }
    }
}

impl Default for ExtractLimits {
    fn default() -> Self {
        Self {
            navigation: default_navigation_cap(),
            categories: default_category_cap(),
            products: default_product_cap(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_hours: default_cache_ttl_hours(),
            max_age_hours: default_max_age_hours(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            engine: default_browser_engine(),
            user_agent: default_user_agent(),
            render_wait_ms: default_render_wait(),
            headless: true,
            sandbox: true,
        }
    }
}

/// Navigation and handler timeouts for one page visit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTimeouts {
    pub navigation: Duration,
    pub handler: Duration,
}

impl ScrapeConfig {
    /// Timeouts for navigation menus and product detail pages
    pub fn page_timeouts(&self) -> PageTimeouts {
        PageTimeouts {
            navigation: Duration::from_secs(self.navigation_timeout_secs),
            handler: Duration::from_secs(self.handler_timeout_secs),
        }
    }

    /// Timeouts for category and product list pages
    pub fn listing_timeouts(&self) -> PageTimeouts {
        PageTimeouts {
            navigation: Duration::from_secs(self.listing_navigation_timeout_secs),
            handler: Duration::from_secs(self.listing_handler_timeout_secs),
        }
    }

    /// Site root joined with the locale prefix, e.g. `https://host/en-gb`
    pub fn locale_root(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.locale_path.trim_matches('/')
        )
        .trim_end_matches('/')
        .to_string()
    }
}

impl Config {
    /// Get the default base directory for bookscrape (~/.bookscrape)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".bookscrape")
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    /// Initialize paths configuration
    pub fn init_paths(&mut self, base_dir: Option<PathBuf>) {
        let base = base_dir.unwrap_or_else(Self::default_base_dir);
        self.paths = PathsConfig {
            config_file: base.join("config.toml"),
            db_file: base.join("catalog.db"),
            base_dir: base,
        };
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        let base = config_path.parent().unwrap_or(Path::new(".")).to_path_buf();
        config.paths = PathsConfig {
            config_file: config_path.to_path_buf(),
            db_file: base.join("catalog.db"),
            base_dir: base,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a base directory, falling back to defaults
    pub fn load_from(base_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = Config::default();
        config.init_paths(base_dir);

        if config.paths.config_file.exists() {
            debug!("Loading config from {:?}", config.paths.config_file);
            let content = std::fs::read_to_string(&config.paths.config_file)?;
            let mut loaded: Config = toml::from_str(&content)?;
            loaded.paths = config.paths;
            config = loaded;
        } else {
            debug!("No config file found, using defaults");
        }

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.paths.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.paths.config_file, content)?;
        info!("Saved config to {:?}", self.paths.config_file);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.scrape.base_url).map_err(|e| {
            Error::Config(format!(
                "scrape.base_url '{}' is not a valid URL: {}",
                self.scrape.base_url, e
            ))
        })?;

        if self.scrape.requests_per_minute == 0 {
            return Err(Error::Config(
                "scrape.requests_per_minute must be positive".to_string(),
            ));
        }

        let timeouts = [
            self.scrape.navigation_timeout_secs,
            self.scrape.handler_timeout_secs,
            self.scrape.listing_navigation_timeout_secs,
            self.scrape.listing_handler_timeout_secs,
        ];
        if timeouts.iter().any(|t| *t == 0) {
            return Err(Error::Config(
                "scrape timeouts must be at least one second".to_string(),
            ));
        }

        let limits = &self.scrape.limits;
        if limits.navigation == 0 || limits.categories == 0 || limits.products == 0 {
            return Err(Error::Config(
                "scrape.limits values must be positive".to_string(),
            ));
        }

        if self.cache.ttl_hours <= 0.0 || self.cache.max_age_hours <= 0.0 {
            return Err(Error::Config(
                "cache.ttl_hours and cache.max_age_hours must be positive".to_string(),
            ));
        }

        if self.browser.engine == BrowserEngine::Chromium
            && !crate::crawl::is_js_rendering_available()
        {
            return Err(Error::Config(
                "browser.engine = \"chromium\" requires building with --features js-rendering"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.scrape.requests_per_minute, 30);
        assert_eq!(config.scrape.locale_path, "/en-gb");
        assert_eq!(config.scrape.limits.navigation, 10);
        assert_eq!(config.cache.max_age_hours, 24.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_save_load() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.init_paths(Some(tmp.path().to_path_buf()));
        config.scrape.base_url = "https://books.example.com".to_string();
        config.scrape.limits.products = 12;

        config.save().unwrap();
        assert!(config.paths.config_file.exists());

        let loaded = Config::load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(loaded.scrape.base_url, "https://books.example.com");
        assert_eq!(loaded.scrape.limits.products, 12);
        assert_eq!(loaded.paths.db_file, tmp.path().join("catalog.db"));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [scrape]
            requests_per_minute = 5

            [cache]
            ttl_hours = 6.5
            "#,
        )
        .unwrap();
        assert_eq!(config.scrape.requests_per_minute, 5);
        assert_eq!(config.scrape.handler_timeout_secs, 60);
        assert_eq!(config.cache.ttl_hours, 6.5);
        assert_eq!(config.scrape.currency, "GBP");
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.scrape.requests_per_minute = 0;
        assert!(config.validate().is_err());
        config.scrape.requests_per_minute = 10;
        assert!(config.validate().is_ok());

        config.scrape.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
        config.scrape.base_url = "https://example.com".to_string();

        config.cache.ttl_hours = 0.0;
        assert!(config.validate().is_err());
        config.cache.ttl_hours = 1.0;

        config.scrape.limits.categories = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_locale_root_and_timeouts() {
        let mut config = Config::default();
        config.scrape.base_url = "https://example.com/".to_string();
        assert_eq!(config.scrape.locale_root(), "https://example.com/en-gb");

        config.scrape.locale_path = String::new();
        assert_eq!(config.scrape.locale_root(), "https://example.com");

        let listing = config.scrape.listing_timeouts();
        assert_eq!(listing.navigation, Duration::from_secs(60));
        assert_eq!(listing.handler, Duration::from_secs(90));
        assert_eq!(config.scrape.page_timeouts().navigation, Duration::from_secs(30));
    }
}
