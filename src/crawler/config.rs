//! # Crawler Configuration Module
//!
//! Run-wide settings for the harvester: where the site list lives, where
//! scripts are written, how many rows are read, the client identity sent with
//! every request and the two request timeouts. Uses a builder pattern so the
//! binary can pass its compiled-in constants explicitly.

use std::path::PathBuf;
use std::time::Duration;

/// Default number of data rows read from the site list
pub const DEFAULT_MAX_ROWS: usize = 500;

/// Default timeout for page and robots.txt requests
pub const DEFAULT_PAGE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for external script requests
pub const DEFAULT_SCRIPT_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for a harvesting run
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// Tabular file whose second column lists the sites
    pub input_path: PathBuf,

    /// Base directory that receives one subdirectory per site
    pub output_dir: PathBuf,

    /// Maximum number of data rows to read (header excluded)
    pub max_rows: usize,

    /// User agent sent with every request and used for robots.txt matching
    pub user_agent: String,

    /// Timeout for page and robots.txt requests
    pub page_timeout: Duration,

    /// Timeout for external script requests
    pub script_timeout: Duration,

    /// Whether to draw a progress bar over the site list
    pub show_progress: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("tranco_top500.csv"),
            output_dir: PathBuf::from("benign_js"),
            max_rows: DEFAULT_MAX_ROWS,
            user_agent: format!("jsharvest/{}", env!("CARGO_PKG_VERSION")),
            page_timeout: DEFAULT_PAGE_TIMEOUT,
            script_timeout: DEFAULT_SCRIPT_TIMEOUT,
            show_progress: false,
        }
    }
}

/// Builder for CrawlerConfig
#[derive(Debug, Default)]
pub struct CrawlerConfigBuilder {
    config: CrawlerConfig,
}

impl CrawlerConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: CrawlerConfig::default(),
        }
    }

    /// Set the site list path
    pub fn input_path(mut self, input_path: impl Into<PathBuf>) -> Self {
        self.config.input_path = input_path.into();
        self
    }

    /// Set the base output directory
    pub fn output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = output_dir.into();
        self
    }

    /// Set the maximum number of data rows to read
    pub fn max_rows(mut self, max_rows: usize) -> Self {
        self.config.max_rows = max_rows;
        self
    }

    /// Set the user agent to use for requests
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the timeout for page and robots.txt requests
    pub fn page_timeout(mut self, page_timeout: Duration) -> Self {
        self.config.page_timeout = page_timeout;
        self
    }

    /// Set the timeout for external script requests
    pub fn script_timeout(mut self, script_timeout: Duration) -> Self {
        self.config.script_timeout = script_timeout;
        self
    }

    /// Set whether to show a progress bar
    pub fn show_progress(mut self, show_progress: bool) -> Self {
        self.config.show_progress = show_progress;
        self
    }

    /// Build the configuration
    pub fn build(self) -> CrawlerConfig {
        self.config
    }
}

impl CrawlerConfig {
    /// Create a new builder
    pub fn builder() -> CrawlerConfigBuilder {
        CrawlerConfigBuilder::new()
    }

    /// Product token used to pick the matching robots.txt group
    ///
    /// `MyThesisBot/1.0 (contact)` matches groups for `MyThesisBot`.
    pub fn robots_agent(&self) -> &str {
        let token = self
            .user_agent
            .split(|c: char| c == '/' || c.is_whitespace())
            .next()
            .unwrap_or_default();
        if token.is_empty() { "*" } else { token }
    }
}
