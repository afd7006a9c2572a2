//! Custom error types for bookscrape

use thiserror::Error;

/// Main error type for bookscrape operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Scrape error: {0}")]
    Scrape(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Invalid selector: {0}")]
    Selector(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Invalid job transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Navigation not found: {0}")]
    NavigationNotFound(String),

    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Scrape job not found: {0}")]
    JobNotFound(String),

    #[error("Not initialized: run 'bookscrape init' first")]
    NotInitialized,

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for errors that mean "the requested entity does not exist"
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::NavigationNotFound(_)
                | Error::CategoryNotFound(_)
                | Error::ProductNotFound(_)
                | Error::JobNotFound(_)
        )
    }
}

/// Result type alias for bookscrape
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_grouping() {
        assert!(Error::ProductNotFound("abc".into()).is_not_found());
        assert!(Error::JobNotFound("1".into()).is_not_found());
        assert!(!Error::Scrape("boom".into()).is_not_found());
        assert!(!Error::Timeout("nav".into()).is_not_found());
    }

    #[test]
    fn test_transition_message() {
        let err = Error::InvalidTransition {
            from: "completed".into(),
            to: "running".into(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid job transition from completed to running"
        );
    }
}
