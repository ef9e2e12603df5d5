//! Error types for the jsharvest crate

use thiserror::Error;

/// Result type for jsharvest operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for jsharvest operations
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Site list file could not be read
    #[error("Site list error: {path}: {message}")]
    SiteList {
        /// Path of the site list
        path: String,
        /// What went wrong
        message: String,
    },

    /// The site list produced no identifiers, so there is nothing to crawl
    #[error("No sites to crawl in {0}")]
    NoSites(String),

    /// Web crawling error
    #[error("Crawl error: {0}")]
    Crawl(String),

    /// Output storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}
