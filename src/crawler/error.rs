//! Error types for the crawler module

use crate::error::Error as CrateError;
use thiserror::Error;

/// Why a single request failed, used to decide whether a fallback is worth trying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// TLS negotiation or certificate validation failed
    Tls,
    /// The request did not finish within its timeout
    Timeout,
    /// DNS lookup or TCP connect failed
    Connect,
    /// The server answered with a non-success status
    Status(u16),
    /// Anything else (body decoding, redirects, builder errors)
    Other,
}

/// Error type for crawler operations
#[derive(Debug, Error)]
pub enum CrawlError {
    /// HTTP client could not be built
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Request failed before a usable response arrived
    #[error("request to {url} failed ({kind:?}): {source}")]
    Request {
        /// URL that was requested
        url: String,
        /// Classified failure
        kind: FailureKind,
        /// Underlying client error
        #[source]
        source: reqwest::Error,
    },

    /// Secure request failed and the insecure retry failed too
    #[error("insecure retry of {url} failed after TLS error: {source}")]
    FallbackFailed {
        /// URL of the insecure retry
        url: String,
        /// Error from the retry
        #[source]
        source: Box<CrawlError>,
    },

    /// HTML parsing error
    #[error("HTML parsing error: {0}")]
    HtmlParse(String),

    /// Robots.txt could not be fetched or parsed
    #[error("Robots.txt error: {0}")]
    RobotsTxt(String),

    /// URL parsing error
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl CrawlError {
    /// The classified failure behind this error, if it came from a request
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            CrawlError::Request { kind, .. } => Some(*kind),
            CrawlError::FallbackFailed { source, .. } => source.kind(),
            _ => None,
        }
    }
}

impl From<CrawlError> for CrateError {
    fn from(err: CrawlError) -> Self {
        match err {
            CrawlError::Http(e) => CrateError::Http(e),
            CrawlError::UrlParse(e) => CrateError::Other(format!("URL parse error: {}", e)),
            _ => CrateError::Crawl(err.to_string()),
        }
    }
}
