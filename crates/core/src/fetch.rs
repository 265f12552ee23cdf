//! Document fetching from URLs and local files.
//!
//! Pages are returned as raw bytes; decoding is left to the extractor. The
//! [`Fetcher`] trait is the seam the batch orchestrator talks to, so tests can
//! swap the network for an in-memory map.

use std::fs;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client;
use url::Url;

use crate::{CorrigoError, Result};

/// User agent used by default. Some news sites refuse to serve content to
/// unknown agents.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit";

/// HTTP client configuration for fetching web pages.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Custom User-Agent string.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { timeout: 30, user_agent: DEFAULT_USER_AGENT.to_string() }
    }
}

/// Something that can turn a locator into document bytes.
pub trait Fetcher {
    /// Fetches the document behind `locator`.
    fn fetch(&self, locator: &str) -> impl Future<Output = Result<Vec<u8>>>;
}

/// Fetches `http(s)://` locators over the network and everything else from disk.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Builds a fetcher with its own connection pool.
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .map_err(CorrigoError::HttpError)?;

        Ok(Self { client, config })
    }

    /// Performs a GET request and returns the response body.
    ///
    /// Non-success statuses are failures: an error page has no article in it.
    pub async fn fetch_url(&self, url: &str) -> Result<Vec<u8>> {
        let parsed_url = Url::parse(url).map_err(|e| CorrigoError::InvalidUrl(e.to_string()))?;

        if !matches!(parsed_url.scheme(), "http" | "https") {
            return Err(CorrigoError::InvalidUrl(format!(
                "unsupported scheme '{}' (expected http or https)",
                parsed_url.scheme()
            )));
        }

        tracing::debug!(url, "fetching document");

        let response = self
            .client
            .get(parsed_url)
            .header("User-Agent", &self.config.user_agent)
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let response = response.error_for_status()?;
        let body = response.bytes().await.map_err(|e| self.map_transport_error(e))?;

        Ok(body.to_vec())
    }

    fn map_transport_error(&self, e: reqwest::Error) -> CorrigoError {
        if e.is_timeout() { CorrigoError::Timeout { timeout: self.config.timeout } } else { CorrigoError::HttpError(e) }
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>> {
        if is_remote(locator) { self.fetch_url(locator).await } else { fetch_file(locator) }
    }
}

/// Returns true when the locator should be fetched over HTTP.
pub fn is_remote(locator: &str) -> bool {
    locator.starts_with("http://") || locator.starts_with("https://")
}

/// Reads a document from a local file.
pub fn fetch_file(path: &str) -> Result<Vec<u8>> {
    let path_buf = PathBuf::from(path);

    if !path_buf.exists() {
        Err(CorrigoError::FileNotFound(path_buf))
    } else {
        fs::read(&path_buf).map_err(CorrigoError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn block_on<F: Future>(future: F) -> F::Output {
        tokio::runtime::Runtime::new().unwrap().block_on(future)
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.timeout, 30);
        assert!(config.user_agent.starts_with("Mozilla/5.0"));
    }

    #[test]
    fn test_fetch_url_invalid() {
        let fetcher = HttpFetcher::new(FetchConfig::default()).unwrap();
        let result = block_on(fetcher.fetch_url("not-a-url"));
        assert!(matches!(result, Err(CorrigoError::InvalidUrl(_))));
    }

    #[test]
    fn test_fetch_url_rejects_other_schemes() {
        let fetcher = HttpFetcher::new(FetchConfig::default()).unwrap();
        let result = block_on(fetcher.fetch_url("ftp://example.com/feed.xml"));
        assert!(matches!(result, Err(CorrigoError::InvalidUrl(_))));
    }

    #[test]
    fn test_fetch_file_not_found() {
        let result = fetch_file("/nonexistent/path/file.html");
        assert!(matches!(result, Err(CorrigoError::FileNotFound(_))));
    }

    #[test]
    fn test_fetcher_reads_local_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all("<p>привет</p>".as_bytes()).unwrap();

        let fetcher = HttpFetcher::new(FetchConfig::default()).unwrap();
        let body = block_on(fetcher.fetch(file.path().to_str().unwrap())).unwrap();
        assert_eq!(body, "<p>привет</p>".as_bytes());
    }

    #[test]
    fn test_is_remote() {
        assert!(is_remote("https://ria.ru/export/rss2/archive/index.xml"));
        assert!(is_remote("http://example.com"));
        assert!(!is_remote("fixtures/feed.xml"));
    }
}
