//! Default values for configuration

use super::BrowserEngine;

fn env_or<T: std::str::FromStr>(key: &str, fallback: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(fallback)
}

/// Default catalogue site, overridable with SCRAPE_BASE_URL
pub fn default_base_url() -> String {
    std::env::var("SCRAPE_BASE_URL").unwrap_or_else(|_| "https://www.worldofbooks.com".to_string())
}

/// Default locale path prefix on the site
pub fn default_locale_path() -> String {
    "/en-gb".to_string()
}

/// Default outbound request ceiling (requests per minute)
pub fn default_requests_per_minute() -> u32 {
    30
}

/// Default page navigation timeout for navigation and product pages
pub fn default_navigation_timeout() -> u64 {
    30
}

/// Default overall handler timeout for navigation and product pages
pub fn default_handler_timeout() -> u64 {
    60
}

/// Default navigation timeout for category and listing pages
pub fn default_listing_navigation_timeout() -> u64 {
    60
}

/// Default handler timeout for category and listing pages
pub fn default_listing_handler_timeout() -> u64 {
    90
}

/// Default max retries recorded on jobs, overridable with SCRAPE_MAX_RETRIES
pub fn default_max_retries() -> i64 {
    env_or("SCRAPE_MAX_RETRIES", 3)
}

/// Default listing currency
pub fn default_currency() -> String {
    "GBP".to_string()
}

pub fn default_navigation_cap() -> usize {
    10
}

pub fn default_category_cap() -> usize {
    20
}

pub fn default_product_cap() -> usize {
    30
}

/// Default product detail cache TTL in hours, overridable with CACHE_TTL_HOURS
pub fn default_cache_ttl_hours() -> f64 {
    env_or("CACHE_TTL_HOURS", 24.0)
}

/// Default max age used by staleness checks
pub fn default_max_age_hours() -> f64 {
    crate::staleness::DEFAULT_MAX_AGE_HOURS
}

/// Chromium when the headless renderer is compiled in, plain HTTP otherwise
pub fn default_browser_engine() -> BrowserEngine {
    if crate::crawl::is_js_rendering_available() {
        BrowserEngine::Chromium
    } else {
        BrowserEngine::Http
    }
}

/// Default user agent
pub fn default_user_agent() -> String {
    format!("bookscrape/{} (Catalogue Cache)", env!("CARGO_PKG_VERSION"))
}

/// Default wait after page load for dynamic content (milliseconds)
pub fn default_render_wait() -> u64 {
    1000
}

pub fn default_true() -> bool {
    true
}
