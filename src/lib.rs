//! # jsharvest - Script corpus crawler
//!
//! This crate collects the JavaScript that websites ship, for offline
//! analysis. For every site in a ranked CSV list it checks robots.txt, fetches
//! the landing page, pulls out every `<script>` element (downloading external
//! sources) and writes each script to its own file under a per-site directory.
//!
//! ## Features
//!
//! - Conservative robots.txt handling: no readable robots.txt, no crawl
//! - HTTPS first, with a single `http://` retry when TLS setup fails
//! - Inline and external scripts kept in document order, with provenance
//! - Collision-safe per-site output directories
//! - Strictly sequential processing with explicit request timeouts
//!
//! ## Example
//!
//! ```rust,no_run
//! use jsharvest::crawler::CrawlerConfig;
//! use jsharvest::harvest::Harvester;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CrawlerConfig::builder()
//!         .input_path("tranco_top500.csv")
//!         .output_dir("benign_js")
//!         .max_rows(100)
//!         .user_agent("MyThesisBot/1.0")
//!         .build();
//!
//!     let summary = Harvester::new(config)?.run().await?;
//!     println!("{} sites saved", summary.sites_saved());
//!     Ok(())
//! }
//! ```

mod error;

pub mod crawler;
pub mod harvest;

pub use error::Error;

/// Re-export of types module for public use
pub mod prelude {
    pub use crate::error::Error;
    pub use crate::error::Result;
}
