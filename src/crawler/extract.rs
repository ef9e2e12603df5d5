//! Script extraction from fetched pages

use std::time::Duration;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::crawler::config::CrawlerConfig;
use crate::crawler::error::CrawlError;
use crate::crawler::fetch::PageFetcher;

/// A `<script>` element reduced to what extraction needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptTag {
    /// Non-empty `src` attribute, if any
    pub src: Option<String>,

    /// Inline text content, empty when the element has none
    pub text: String,
}

impl ScriptTag {
    fn from_element(element: ElementRef<'_>) -> Self {
        let src = element
            .value()
            .attr("src")
            .map(str::trim)
            .filter(|src| !src.is_empty())
            .map(String::from);

        Self {
            src,
            text: element.text().collect(),
        }
    }
}

/// Where a script's payload came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptSource {
    /// Text between the script tags
    Inline,
    /// External file referenced by `src`
    External {
        /// Absolute URL, or the raw attribute when it could not be resolved
        url: String,
        /// Whether the body was retrieved
        loaded: bool,
    },
}

/// One script found on a page, normalized to a text payload
#[derive(Debug, Clone)]
pub struct ExtractedScript {
    /// Page the script element was found on
    pub page_url: Url,

    /// Inline or external origin
    pub source: ScriptSource,

    /// Script text, annotated for external scripts
    pub payload: String,
}

/// Find every `<script>` element in document order
pub fn script_tags(html: &str) -> Result<Vec<ScriptTag>, CrawlError> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("script")
        .map_err(|e| CrawlError::HtmlParse(format!("Failed to parse script selector: {}", e)))?;

    Ok(document.select(&selector).map(ScriptTag::from_element).collect())
}

/// Payload for an external script that was retrieved
pub fn external_payload(src_url: &str, body: &str) -> String {
    format!("// External JS: {}\n{}", src_url, body)
}

/// Payload for an external script that could not be retrieved
pub fn failed_payload(src_url: &str) -> String {
    format!("// External JS (failed to load): {}", src_url)
}

/// Fetches pages and turns their script elements into payloads
#[derive(Debug, Clone)]
pub struct ScriptExtractor {
    fetcher: PageFetcher,
    page_timeout: Duration,
    script_timeout: Duration,
}

impl ScriptExtractor {
    /// Create an extractor using the config's timeouts
    pub fn new(fetcher: PageFetcher, config: &CrawlerConfig) -> Self {
        Self {
            fetcher,
            page_timeout: config.page_timeout,
            script_timeout: config.script_timeout,
        }
    }

    /// Fetch `url` and return one script per `<script>` element, in document order
    ///
    /// External scripts that fail to load still produce a placeholder entry.
    /// Only a failure to fetch the page itself is an error.
    #[instrument(skip(self))]
    pub async fn extract(&self, url: &str) -> Result<Vec<ExtractedScript>, CrawlError> {
        let page = self.fetcher.fetch(url, self.page_timeout).await?;
        let tags = script_tags(&page.body)?;
        debug!("Found {} script elements on {}", tags.len(), page.url);

        let mut scripts = Vec::with_capacity(tags.len());
        for tag in tags {
            let (source, payload) = match tag.src {
                Some(src) => self.load_external(&page.url, &src).await,
                None => (ScriptSource::Inline, tag.text),
            };
            scripts.push(ExtractedScript {
                page_url: page.url.clone(),
                source,
                payload,
            });
        }

        Ok(scripts)
    }

    /// Like [`extract`](Self::extract), but a failed page fetch is logged and yields no scripts
    pub async fn extract_or_empty(&self, url: &str) -> Vec<ExtractedScript> {
        match self.extract(url).await {
            Ok(scripts) => scripts,
            Err(e) => {
                warn!(url = %url, error = %e, "Failed to extract scripts");
                Vec::new()
            }
        }
    }

    async fn load_external(&self, page_url: &Url, src: &str) -> (ScriptSource, String) {
        let src_url = match page_url.join(src) {
            Ok(url) => url,
            Err(e) => {
                warn!(src = %src, error = %e, "Cannot resolve script src against {}", page_url);
                let source = ScriptSource::External {
                    url: src.to_string(),
                    loaded: false,
                };
                return (source, failed_payload(src));
            }
        };

        match self.fetcher.get(src_url.as_str(), self.script_timeout).await {
            Ok(script) => {
                let payload = external_payload(src_url.as_str(), &script.body);
                let source = ScriptSource::External {
                    url: src_url.to_string(),
                    loaded: true,
                };
                (source, payload)
            }
            Err(e) => {
                warn!(src = %src_url, error = %e, "Failed to download external script");
                let payload = failed_payload(src_url.as_str());
                let source = ScriptSource::External {
                    url: src_url.to_string(),
                    loaded: false,
                };
                (source, payload)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn extractor() -> ScriptExtractor {
        let config = CrawlerConfig::builder()
            .user_agent("TestBot/1.0")
            .page_timeout(Duration::from_secs(5))
            .script_timeout(Duration::from_secs(5))
            .build();
        ScriptExtractor::new(PageFetcher::new(&config).unwrap(), &config)
    }

    #[test]
    fn test_script_tags_in_document_order() {
        let html = r#"<html><head>
            <script src="/a.js"></script>
            <script>var x = 1;</script>
            </head><body>
            <script src="   "></script>
            <script></script>
            </body></html>"#;

        let tags = script_tags(html).unwrap();
        assert_eq!(tags.len(), 4);
        assert_eq!(tags[0].src.as_deref(), Some("/a.js"));
        assert_eq!(tags[1].src, None);
        assert_eq!(tags[1].text, "var x = 1;");
        // A blank src counts as inline
        assert_eq!(tags[2].src, None);
        assert_eq!(tags[3].text, "");
    }

    #[test]
    fn test_no_scripts() {
        let tags = script_tags("<html><body><p>hello</p></body></html>").unwrap();
        assert!(tags.is_empty());
    }

    #[tokio::test]
    async fn test_page_without_scripts_returns_empty() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/")
            .with_status(200)
            .with_body("<html><body>No code here</body></html>")
            .create_async()
            .await;

        let scripts = extractor().extract(&format!("{}/", server.url())).await.unwrap();
        assert!(scripts.is_empty());
    }

    #[tokio::test]
    async fn test_inline_and_external_scripts() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/shop/index.html")
            .with_status(200)
            .with_body(
                r#"<html><head><script>console.log("hi");</script>
                <script src="js/app.js"></script></head></html>"#,
            )
            .create_async()
            .await;
        let script_mock = server
            .mock("GET", "/shop/js/app.js")
            .match_header("user-agent", "TestBot/1.0")
            .with_status(200)
            .with_body("function app() {}")
            .expect(1)
            .create_async()
            .await;

        let page_url = format!("{}/shop/index.html", server.url());
        let scripts = extractor().extract(&page_url).await.unwrap();

        assert_eq!(scripts.len(), 2);
        assert_eq!(scripts[0].source, ScriptSource::Inline);
        assert_eq!(scripts[0].payload, r#"console.log("hi");"#);

        let src_url = format!("{}/shop/js/app.js", server.url());
        assert_eq!(
            scripts[1].payload,
            format!("// External JS: {}\nfunction app() {{}}", src_url)
        );
        assert_eq!(
            scripts[1].source,
            ScriptSource::External {
                url: src_url,
                loaded: true
            }
        );
        assert_eq!(scripts[1].page_url.as_str(), page_url);
        script_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_external_script_keeps_placeholder() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/")
            .with_status(200)
            .with_body(r#"<script src="/missing.js"></script><script>1</script>"#)
            .create_async()
            .await;
        server
            .mock("GET", "/missing.js")
            .with_status(404)
            .create_async()
            .await;

        let scripts = extractor().extract(&format!("{}/", server.url())).await.unwrap();

        assert_eq!(scripts.len(), 2);
        assert_eq!(
            scripts[0].payload,
            format!("// External JS (failed to load): {}/missing.js", server.url())
        );
        assert!(matches!(
            scripts[0].source,
            ScriptSource::External { loaded: false, .. }
        ));
        assert_eq!(scripts[1].payload, "1");
    }

    #[tokio::test]
    async fn test_failed_page_fetch() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/")
            .with_status(403)
            .create_async()
            .await;

        let extractor = extractor();
        let url = format!("{}/", server.url());

        assert!(extractor.extract(&url).await.is_err());
        assert!(extractor.extract_or_empty(&url).await.is_empty());
    }

    #[tokio::test]
    async fn test_external_script_is_not_retried_over_http() {
        let mut server = Server::new_async().await;
        let secure_src = format!("https://{}/x.js", server.host_with_port());
        server
            .mock("GET", "/")
            .with_status(200)
            .with_body(format!(r#"<script src="{}"></script>"#, secure_src))
            .create_async()
            .await;
        // Reachable over plain http, so any insecure retry would hit it.
        let script_mock = server
            .mock("GET", "/x.js")
            .with_status(200)
            .with_body("leaked();")
            .expect(0)
            .create_async()
            .await;

        let scripts = extractor().extract(&format!("{}/", server.url())).await.unwrap();

        assert_eq!(scripts.len(), 1);
        assert_eq!(scripts[0].payload, failed_payload(&secure_src));
        assert_eq!(
            scripts[0].source,
            ScriptSource::External {
                url: secure_src,
                loaded: false
            }
        );
        script_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unresolvable_src_keeps_raw_value() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/")
            .with_status(200)
            .with_body(r#"<script src="http://[::1"></script><script>ok()</script>"#)
            .create_async()
            .await;

        let scripts = extractor().extract(&format!("{}/", server.url())).await.unwrap();

        assert_eq!(scripts.len(), 2);
        assert_eq!(
            scripts[0].payload,
            "// External JS (failed to load): http://[::1"
        );
        assert_eq!(
            scripts[0].source,
            ScriptSource::External {
                url: "http://[::1".to_string(),
                loaded: false
            }
        );
        assert_eq!(scripts[1].payload, "ok()");
    }

    #[tokio::test]
    async fn test_relative_src_resolves_against_redirect_target() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/")
            .with_status(302)
            .with_header("location", "/sub/page.html")
            .create_async()
            .await;
        server
            .mock("GET", "/sub/page.html")
            .with_status(200)
            .with_body(r#"<script src="js/app.js"></script>"#)
            .create_async()
            .await;
        let script_mock = server
            .mock("GET", "/sub/js/app.js")
            .with_status(200)
            .with_body("app();")
            .expect(1)
            .create_async()
            .await;

        let scripts = extractor().extract(&format!("{}/", server.url())).await.unwrap();

        let src_url = format!("{}/sub/js/app.js", server.url());
        assert_eq!(scripts.len(), 1);
        assert_eq!(
            scripts[0].page_url.as_str(),
            format!("{}/sub/page.html", server.url())
        );
        assert_eq!(scripts[0].payload, external_payload(&src_url, "app();"));
        assert_eq!(
            scripts[0].source,
            ScriptSource::External {
                url: src_url,
                loaded: true
            }
        );
        script_mock.assert_async().await;
    }
}
