//! Robots.txt permission checks
//!
//! A site is only crawled when its robots.txt could be fetched, parsed and
//! explicitly permits the target URL for our agent. A missing or unreadable
//! robots.txt is treated as "nothing may be fetched".

use std::time::Duration;

use texting_robots::Robot;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::crawler::config::CrawlerConfig;
use crate::crawler::error::CrawlError;
use crate::crawler::fetch::PageFetcher;

/// Well-known path of the permission document
pub const ROBOTS_PATH: &str = "/robots.txt";

/// Outcome of a robots.txt check for one URL
#[derive(Debug)]
pub enum Permission {
    /// Robots.txt permits the URL for our agent
    Allowed,
    /// Robots.txt forbids the URL for our agent
    Disallowed,
    /// Robots.txt could not be fetched or parsed
    Unavailable(CrawlError),
}

impl Permission {
    /// Whether the URL may be fetched
    pub fn is_allowed(&self) -> bool {
        matches!(self, Permission::Allowed)
    }
}

/// Checks target URLs against their site's robots.txt
#[derive(Debug, Clone)]
pub struct PermissionChecker {
    fetcher: PageFetcher,
    agent: String,
    timeout: Duration,
}

impl PermissionChecker {
    /// Create a checker that matches robots.txt groups for the config's agent token
    pub fn new(fetcher: PageFetcher, config: &CrawlerConfig) -> Self {
        Self {
            fetcher,
            agent: config.robots_agent().to_string(),
            timeout: config.page_timeout,
        }
    }

    /// Fetch the target's robots.txt and decide whether the target may be crawled
    #[instrument(skip(self), fields(agent = %self.agent))]
    pub async fn check(&self, target: &Url) -> Permission {
        let robots_url = match robots_url(target) {
            Ok(url) => url,
            Err(e) => return Permission::Unavailable(e),
        };

        let document = match self.fetcher.fetch(robots_url.as_str(), self.timeout).await {
            Ok(page) => page.body,
            Err(e) => return Permission::Unavailable(e),
        };

        match Robot::new(&self.agent, document.as_bytes()) {
            Ok(robot) if robot.allowed(target.as_str()) => Permission::Allowed,
            Ok(_) => Permission::Disallowed,
            Err(e) => Permission::Unavailable(CrawlError::RobotsTxt(format!(
                "failed to parse {}: {}",
                robots_url, e
            ))),
        }
    }

    /// URLs of the target that may be crawled: the target itself, or nothing
    ///
    /// Any failure to obtain a decision is logged and yields an empty list.
    pub async fn allowed_urls(&self, target: &str) -> Vec<Url> {
        let target_url = match Url::parse(target) {
            Ok(url) => url,
            Err(e) => {
                warn!(url = %target, error = %e, "Cannot check robots.txt for unparsable URL");
                return Vec::new();
            }
        };

        match self.check(&target_url).await {
            Permission::Allowed => {
                debug!("Robots.txt allows {}", target_url);
                vec![target_url]
            }
            Permission::Disallowed => {
                info!("Robots.txt disallows {}", target_url);
                Vec::new()
            }
            Permission::Unavailable(e) => {
                warn!(url = %target_url, error = %e, "Robots.txt unavailable, skipping site");
                Vec::new()
            }
        }
    }
}

/// Robots.txt location for the origin of `target`
pub fn robots_url(target: &Url) -> Result<Url, CrawlError> {
    Ok(target.join(ROBOTS_PATH)?)
}
