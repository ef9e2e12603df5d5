//! Page fetching with an insecure-scheme fallback for broken TLS setups

use std::error::Error as StdError;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::crawler::config::CrawlerConfig;
use crate::crawler::error::{CrawlError, FailureKind};
use crate::crawler::normalize::ensure_full_url;

/// Substrings that identify a TLS failure in a connect error's source chain,
/// most specific first
const TLS_MARKERS: &[&str] = &["certificate", "handshake", "wrong version number", "tls", "ssl"];

/// A successfully fetched response body
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects and any scheme fallback
    pub url: Url,

    /// Response body decoded as text
    pub body: String,
}

/// Fetches pages and script bodies with a fixed client identity
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    /// Build a fetcher whose client sends the configured user agent
    pub fn new(config: &CrawlerConfig) -> Result<Self, CrawlError> {
        let client = Client::builder().user_agent(&config.user_agent).build()?;
        Ok(Self { client })
    }

    /// Fetch a page, retrying once over `http://` if the `https://` attempt hit a TLS error
    ///
    /// A URL without a scheme is treated as `https://`. Status errors,
    /// timeouts and connection failures are returned as-is without a retry.
    #[instrument(skip(self))]
    pub async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchedPage, CrawlError> {
        let full_url = ensure_full_url(url);

        match self.get(&full_url, timeout).await {
            Ok(page) => Ok(page),
            Err(err)
                if err.kind() == Some(FailureKind::Tls) && full_url.starts_with("https://") =>
            {
                let insecure_url = full_url.replacen("https://", "http://", 1);
                warn!(url = %full_url, error = %err, "TLS error, retrying over http");
                let retry = self.get(&insecure_url, timeout).await;
                retry.map_err(|retry_err| CrawlError::FallbackFailed {
                    url: insecure_url,
                    source: Box::new(retry_err),
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Issue a single GET with no fallback, failing on a non-success status
    pub async fn get(&self, url: &str, timeout: Duration) -> Result<FetchedPage, CrawlError> {
        debug!("GET {} (timeout {:?})", url, timeout);

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| request_error(url, e))?;

        let final_url = response.url().clone();
        let body = response.text().await.map_err(|e| request_error(url, e))?;

        Ok(FetchedPage {
            url: final_url,
            body,
        })
    }
}

fn request_error(url: &str, source: reqwest::Error) -> CrawlError {
    CrawlError::Request {
        url: url.to_string(),
        kind: classify(&source),
        source,
    }
}

/// Classify a client error into a [`FailureKind`]
pub fn classify(err: &reqwest::Error) -> FailureKind {
    if let Some(status) = err.status() {
        return FailureKind::Status(status.as_u16());
    }
    if err.is_timeout() {
        return FailureKind::Timeout;
    }
    if is_tls_error(err) {
        return FailureKind::Tls;
    }
    if err.is_connect() {
        return FailureKind::Connect;
    }
    FailureKind::Other
}

// TLS negotiation happens while connecting, so other failures never count.
// The top-level message embeds the URL, so only the causes are inspected.
fn is_tls_error(err: &reqwest::Error) -> bool {
    if !err.is_connect() {
        return false;
    }
    let mut source: Option<&(dyn StdError + 'static)> = err.source();
    while let Some(cause) = source {
        let message = cause.to_string().to_ascii_lowercase();
        if TLS_MARKERS.iter().any(|marker| message.contains(marker)) {
            return true;
        }
        source = cause.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn fetcher() -> PageFetcher {
        let config = CrawlerConfig::builder().user_agent("TestBot/1.0").build();
        PageFetcher::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_success_sends_user_agent() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/page")
            .match_header("user-agent", "TestBot/1.0")
            .with_status(200)
            .with_body("<html></html>")
            .expect(1)
            .create_async()
            .await;

        let page = fetcher()
            .fetch(&format!("{}/page", server.url()), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(page.body, "<html></html>");
        assert_eq!(page.url.path(), "/page");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_status_error_is_not_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .with_status(500)
            .expect(1)
            .create_async()
            .await;

        let err = fetcher()
            .fetch(&server.url(), Duration::from_secs(5))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), Some(FailureKind::Status(500)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_tls_failure_retries_once_over_http() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .with_status(200)
            .with_body("plain")
            .expect(1)
            .create_async()
            .await;

        // The mock server only speaks plain HTTP, so the TLS handshake fails.
        let secure_url = format!("https://{}/", server.host_with_port());
        let page = fetcher()
            .fetch(&secure_url, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(page.url.scheme(), "http");
        assert_eq!(page.body, "plain");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_fallback_reports_retry_error() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .with_status(503)
            .expect(1)
            .create_async()
            .await;

        let secure_url = format!("https://{}/", server.host_with_port());
        let err = fetcher()
            .fetch(&secure_url, Duration::from_secs(5))
            .await
            .unwrap_err();

        assert!(matches!(err, CrawlError::FallbackFailed { .. }));
        assert_eq!(err.kind(), Some(FailureKind::Status(503)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_connection_refused_is_not_tls() {
        let err = fetcher()
            .fetch("http://127.0.0.1:1/", Duration::from_secs(5))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), Some(FailureKind::Connect));
    }

    #[tokio::test]
    async fn test_non_connect_error_mentioning_tls_is_not_tls() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/")
            .with_status(302)
            .with_header("location", "/ssl/tls")
            .create_async()
            .await;

        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::custom(|attempt| {
                attempt.error("certificate pinning rejected the TLS redirect")
            }))
            .build()
            .unwrap();
        let err = client.get(server.url()).send().await.unwrap_err();

        assert!(err.is_redirect());
        assert_eq!(classify(&err), FailureKind::Other);
    }
}
