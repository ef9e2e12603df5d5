//! # jsharvest CLI Application
//!
//! Runs one harvesting pass with compiled-in settings: the site list is read
//! from `tranco_top500.csv` in the working directory and scripts are written
//! under `benign_js/`. Log verbosity follows `RUST_LOG`; a full debug log is
//! kept in `.jsharvest/crawl.log`.

mod telemetry;

use anyhow::Context;
use jsharvest::crawler::CrawlerConfig;
use jsharvest::harvest::Harvester;
use tracing::{error, info};

/// Site list file name
const CSV_FILE_NAME: &str = "tranco_top500.csv";

/// Directory receiving one subdirectory per site
const OUTPUT_DIRECTORY: &str = "benign_js";

/// Data rows read from the site list
const MAX_ROWS: usize = 500;

/// Client identity sent with every request
const USER_AGENT: &str = "MyThesisBot/1.0";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let work_dir = std::env::current_dir().context("cannot determine working directory")?;
    let _log_guard = telemetry::init_tracing_subscriber(&work_dir)?;

    let config = CrawlerConfig::builder()
        .input_path(work_dir.join(CSV_FILE_NAME))
        .output_dir(work_dir.join(OUTPUT_DIRECTORY))
        .max_rows(MAX_ROWS)
        .user_agent(USER_AGENT)
        .show_progress(true)
        .build();

    let mut harvester = Harvester::new(config)?;
    let summary = match harvester.run().await {
        Ok(summary) => summary,
        Err(e) => {
            error!("Harvest aborted before crawling: {}", e);
            return Err(e.into());
        }
    };

    let elapsed = summary.finished_at - summary.started_at;
    info!(
        "Finished in {}s: {} of {} sites saved, {} script files written",
        elapsed.num_seconds(),
        summary.sites_saved(),
        summary.sites.len(),
        summary.files_written()
    );

    Ok(())
}
