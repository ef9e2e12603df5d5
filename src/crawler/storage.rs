use std::collections::HashMap;
use std::{io, path::PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};
use url::Url;

use super::ExtractedScript;

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Base path for storage
    pub base_path: PathBuf,
}

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to create {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

type Result<T> = std::result::Result<T, StorageError>;

/// What happened when one site's scripts were written
#[derive(Debug, Clone)]
pub struct SiteWriteReport {
    /// Directory the scripts were written to
    pub dir: PathBuf,

    /// Whether the directory was created by this call
    pub created: bool,

    /// Files written successfully, in ordinal order
    pub written: Vec<PathBuf>,

    /// Files that could not be written, with the error message
    pub failed: Vec<(PathBuf, String)>,
}

/// Storage manager for extracted scripts
///
/// Remembers which site claimed each directory name during the run so that
/// two different sites never share a directory.
#[derive(Debug, Clone)]
pub struct ScriptStore {
    config: StorageConfig,
    claimed: HashMap<String, String>,
}

impl ScriptStore {
    /// Create a new storage with custom configuration
    pub fn with_config(config: StorageConfig) -> Self {
        Self {
            config,
            claimed: HashMap::new(),
        }
    }

    /// Creates the base directory if it does not exist yet
    pub async fn ensure_base(&self) -> Result<()> {
        let base = &self.config.base_path;
        if fs::try_exists(base).await? {
            info!("Output directory '{}' already exists", base.display());
        } else {
            fs::create_dir_all(base)
                .await
                .map_err(|source| StorageError::CreateDir {
                    path: base.clone(),
                    source,
                })?;
            info!("Created output directory '{}'", base.display());
        }
        Ok(())
    }

    /// Writes each script to `script_<n>.js` under the site's directory
    ///
    /// Returns `Ok(None)` without touching the filesystem when there are no
    /// scripts. An existing directory is reused as-is. A file that fails to
    /// write is logged and recorded in the report; the rest are still written.
    pub async fn save(
        &mut self,
        raw_site: &str,
        site_url: &str,
        scripts: &[ExtractedScript],
    ) -> Result<Option<SiteWriteReport>> {
        if scripts.is_empty() {
            return Ok(None);
        }

        let dir_name = self.claim_dir_name(raw_site, site_url).await?;
        let dir = self.config.base_path.join(&dir_name);

        let created = !fs::try_exists(&dir).await?;
        if created {
            fs::create_dir_all(&dir)
                .await
                .map_err(|source| StorageError::CreateDir {
                    path: dir.clone(),
                    source,
                })?;
            info!("Created site directory {} (site: {})", dir.display(), raw_site);
        } else {
            info!("Reusing site directory {} (site: {})", dir.display(), raw_site);
        }

        let mut report = SiteWriteReport {
            dir: dir.clone(),
            created,
            written: Vec::with_capacity(scripts.len()),
            failed: Vec::new(),
        };

        for (i, script) in scripts.iter().enumerate() {
            let path = dir.join(script_file_name(i + 1));
            match fs::write(&path, script_file_contents(script)).await {
                Ok(()) => {
                    debug!("Saved script #{} to {}", i + 1, path.display());
                    report.written.push(path);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to save script");
                    report.failed.push((path, e.to_string()));
                }
            }
        }

        Ok(Some(report))
    }

    async fn claim_dir_name(&mut self, raw_site: &str, site_url: &str) -> Result<String> {
        let key = site_key(raw_site, site_url);
        let base_name = match sanitized_dir_name(raw_site, site_url) {
            Some(name) => name,
            None => fallback_dir_name(raw_site, self.count_base_entries().await?),
        };

        let mut candidate = base_name.clone();
        let mut suffix = 1;
        loop {
            match self.claimed.get(&candidate) {
                Some(owner) if *owner != key => {
                    suffix += 1;
                    candidate = format!("{}_{}", base_name, suffix);
                }
                _ => break,
            }
        }

        if candidate != base_name {
            warn!(
                site = %raw_site,
                "Directory name {} already used by another site this run, using {}",
                base_name,
                candidate
            );
        }
        self.claimed.insert(candidate.clone(), key);
        Ok(candidate)
    }

    async fn count_base_entries(&self) -> Result<usize> {
        let mut count = 0;
        let mut entries = fs::read_dir(&self.config.base_path).await?;
        while entries.next_entry().await?.is_some() {
            count += 1;
        }
        Ok(count)
    }
}

/// File name of the `ordinal`-th script of a site, starting at 1
pub fn script_file_name(ordinal: usize) -> String {
    format!("script_{}.js", ordinal)
}

/// Provenance header, payload and trailing blank line
pub fn script_file_contents(script: &ExtractedScript) -> String {
    format!("/* Source URL: {} */\n{}\n\n", script.page_url, script.payload)
}

/// `host[:port]` of a URL, empty when it has no host
fn authority(site_url: &str) -> String {
    let Ok(url) = Url::parse(site_url) else {
        return String::new();
    };
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        _ => String::new(),
    }
}

/// Directory name derived from the site's host, or from the raw identifier
/// when the URL has no host
pub fn sanitized_dir_name(raw_site: &str, site_url: &str) -> Option<String> {
    let from_host = authority(site_url).replace(['.', ':', '-'], "_");
    if !from_host.is_empty() {
        return Some(from_host);
    }

    let from_raw: String = raw_site
        .chars()
        .map(|c| if is_name_char(c) { c } else { '_' })
        .collect();
    let from_raw = from_raw.trim_matches('_');
    (!from_raw.is_empty()).then(|| from_raw.to_string())
}

/// Synthetic name for identifiers with nothing usable left after sanitizing
pub fn fallback_dir_name(raw_site: &str, counter: usize) -> String {
    let prefix: String = raw_site
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(10)
        .collect();
    format!("unknown_site_{}_{}", counter, prefix)
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
}

/// Canonical identity of a site: `scheme://authority`, or the trimmed raw value
pub fn site_key(raw_site: &str, site_url: &str) -> String {
    let host = authority(site_url);
    match Url::parse(site_url) {
        Ok(url) if !host.is_empty() => format!("{}://{}", url.scheme(), host).to_lowercase(),
        _ => raw_site.trim().to_string(),
    }
}
