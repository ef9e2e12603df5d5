//! # Script Crawler Module
//!
//! This module holds the fetch-and-extract pipeline that feeds the script
//! corpus. Each stage is a small component that takes its settings from a
//! shared [`CrawlerConfig`] and reports failures as explicit results.
//!
//! ## Key Components
//!
//! - `ensure_full_url`: gives bare site identifiers an `https://` scheme
//! - `PermissionChecker`: consults robots.txt before a page is fetched
//! - `PageFetcher`: GET with a one-shot `http://` retry after TLS failures
//! - `ScriptExtractor`: finds `<script>` elements and loads external sources
//! - `read_sites`: loads the candidate site list from CSV
//! - `ScriptStore`: writes one numbered `.js` file per script under a
//!   per-site directory
//!
//! ## Failure policy
//!
//! Nothing in this module aborts a run. A site without a readable robots.txt
//! is skipped, a page that cannot be fetched yields no scripts, and an
//! external script that cannot be loaded becomes a placeholder entry.

mod config;
mod error;
mod extract;
mod fetch;
mod normalize;
mod robots;
mod sites;
pub mod storage;

pub use config::{
    CrawlerConfig, CrawlerConfigBuilder, DEFAULT_MAX_ROWS, DEFAULT_PAGE_TIMEOUT,
    DEFAULT_SCRIPT_TIMEOUT,
};
pub use error::{CrawlError, FailureKind};
pub use extract::{
    ExtractedScript, ScriptExtractor, ScriptSource, ScriptTag, external_payload, failed_payload,
    script_tags,
};
pub use fetch::{FetchedPage, PageFetcher, classify};
pub use normalize::ensure_full_url;
pub use robots::{Permission, PermissionChecker, ROBOTS_PATH, robots_url};
pub use sites::read_sites;
pub use storage::{ScriptStore, SiteWriteReport, StorageConfig, StorageError};
