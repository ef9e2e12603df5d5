//! Run orchestration: site list in, per-site script directories out
//!
//! Sites are processed strictly one after another. Each site goes through
//! normalization, the robots.txt check, script extraction for every permitted
//! URL and finally storage. A failure in any of those steps only affects the
//! current site; the run itself stops early only when the site list is
//! unusable.

use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info, instrument, warn};
use url::Url;

use crate::crawler::{
    CrawlerConfig, PageFetcher, Permission, PermissionChecker, ScriptExtractor, ScriptStore,
    SiteWriteReport, StorageConfig, ensure_full_url, read_sites,
};
use crate::error::{Error, Result};

/// Why a site was not crawled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionDenied {
    /// Robots.txt forbids the site for our agent
    Disallowed,
    /// Robots.txt could not be fetched or parsed, or the URL was unusable
    Unavailable(String),
}

/// What happened to one site
#[derive(Debug, Clone)]
pub enum SiteOutcome {
    /// Scripts were written
    Saved(SiteWriteReport),
    /// Robots.txt did not permit the crawl
    NoPermission(PermissionDenied),
    /// The page itself could not be fetched
    FetchFailed(String),
    /// The page was fetched but had no script elements
    NoScripts,
    /// The site directory could not be prepared
    StorageFailed(String),
}

/// Result of harvesting one site
#[derive(Debug, Clone)]
pub struct SiteReport {
    /// Identifier as read from the site list
    pub site: String,

    /// Identifier after scheme normalization
    pub url: String,

    /// Number of scripts extracted across all permitted pages
    pub scripts: usize,

    /// What was done with them
    pub outcome: SiteOutcome,
}

/// Summary of a whole run, one report per site in input order
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When the last site finished
    pub finished_at: DateTime<Utc>,

    /// Per-site reports
    pub sites: Vec<SiteReport>,
}

impl RunSummary {
    /// Number of sites that got a directory of scripts
    pub fn sites_saved(&self) -> usize {
        self.sites
            .iter()
            .filter(|site| matches!(site.outcome, SiteOutcome::Saved(_)))
            .count()
    }

    /// Number of script files written
    pub fn files_written(&self) -> usize {
        self.saved_reports().map(|report| report.written.len()).sum()
    }

    /// Number of script files that failed to write
    pub fn files_failed(&self) -> usize {
        self.saved_reports().map(|report| report.failed.len()).sum()
    }

    fn saved_reports(&self) -> impl Iterator<Item = &SiteWriteReport> {
        self.sites.iter().filter_map(|site| match &site.outcome {
            SiteOutcome::Saved(report) => Some(report),
            _ => None,
        })
    }
}

/// Drives the crawl for every site in the configured list
#[derive(Debug)]
pub struct Harvester {
    config: CrawlerConfig,
    checker: PermissionChecker,
    extractor: ScriptExtractor,
    store: ScriptStore,
}

impl Harvester {
    /// Build the components for a run from the configuration
    pub fn new(config: CrawlerConfig) -> Result<Self> {
        let fetcher = PageFetcher::new(&config)?;
        let checker = PermissionChecker::new(fetcher.clone(), &config);
        let extractor = ScriptExtractor::new(fetcher, &config);
        let store = ScriptStore::with_config(StorageConfig {
            base_path: config.output_dir.clone(),
        });

        Ok(Self {
            config,
            checker,
            extractor,
            store,
        })
    }

    /// Read the site list and harvest every site in order
    ///
    /// Fails before any network activity when the site list cannot be read
    /// or is empty.
    #[instrument(skip(self), fields(input = %self.config.input_path.display()))]
    pub async fn run(&mut self) -> Result<RunSummary> {
        let started_at = Utc::now();

        let sites = read_sites(&self.config.input_path, self.config.max_rows)?;
        if sites.is_empty() {
            return Err(Error::NoSites(self.config.input_path.display().to_string()));
        }

        self.store
            .ensure_base()
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;

        let progress = self.progress_bar(sites.len());
        let mut reports = Vec::with_capacity(sites.len());
        for site in &sites {
            progress.set_message(site.clone());
            reports.push(self.harvest_site(site).await);
            progress.inc(1);
        }
        progress.finish_with_message("done");

        let summary = RunSummary {
            started_at,
            finished_at: Utc::now(),
            sites: reports,
        };
        info!(
            "Harvested {} sites: {} saved, {} files written, {} failed writes",
            summary.sites.len(),
            summary.sites_saved(),
            summary.files_written(),
            summary.files_failed()
        );
        Ok(summary)
    }

    /// Harvest a single site identifier
    #[instrument(skip(self))]
    pub async fn harvest_site(&mut self, raw_site: &str) -> SiteReport {
        let url = ensure_full_url(raw_site);
        let report = |scripts, outcome| SiteReport {
            site: raw_site.to_string(),
            url: url.clone(),
            scripts,
            outcome,
        };

        let target = match self.permitted_target(&url).await {
            Ok(target) => target,
            Err(denied) => return report(0, SiteOutcome::NoPermission(denied)),
        };

        info!("Crawling page {}", target);
        let scripts = match self.extractor.extract(target.as_str()).await {
            Ok(scripts) => scripts,
            Err(e) => {
                warn!(url = %target, error = %e, "Failed to fetch page");
                return report(0, SiteOutcome::FetchFailed(e.to_string()));
            }
        };
        info!("Found {} script tags on {}", scripts.len(), target);

        let outcome = match self.store.save(raw_site, &url, &scripts).await {
            Ok(Some(saved)) => {
                info!("Saved {} scripts to {}", saved.written.len(), saved.dir.display());
                SiteOutcome::Saved(saved)
            }
            Ok(None) => {
                info!("No scripts extracted from '{}', no directory created", url);
                SiteOutcome::NoScripts
            }
            Err(e) => {
                error!(site = %raw_site, error = %e, "Failed to prepare site directory");
                SiteOutcome::StorageFailed(e.to_string())
            }
        };

        report(scripts.len(), outcome)
    }

    async fn permitted_target(&self, url: &str) -> std::result::Result<Url, PermissionDenied> {
        let target = Url::parse(url).map_err(|e| {
            warn!(url = %url, error = %e, "Cannot check robots.txt for unparsable URL");
            PermissionDenied::Unavailable(format!("invalid URL: {}", e))
        })?;

        match self.checker.check(&target).await {
            Permission::Allowed => Ok(target),
            Permission::Disallowed => {
                info!("Robots.txt disallows {}, skipping", target);
                Err(PermissionDenied::Disallowed)
            }
            Permission::Unavailable(e) => {
                warn!(url = %target, error = %e, "Robots.txt unavailable, skipping site");
                Err(PermissionDenied::Unavailable(e.to_string()))
            }
        }
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }
        let progress = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
        {
            progress.set_style(style.progress_chars("##-"));
        }
        progress
    }
}
