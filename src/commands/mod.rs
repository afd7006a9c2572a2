//! CLI commands implementation

pub mod catalog;
pub mod init;
pub mod jobs;
pub mod scrape;
pub mod status;

pub use catalog::*;
pub use init::*;
pub use jobs::*;
pub use scrape::*;
pub use status::*;
