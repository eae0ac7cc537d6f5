//! Ingestor trait for pluggable source fetching.
//!
//! `Ingestor` is the trait a website-crawler adapter (C2) builds on: it
//! discovers pages from a starting URL and fetches specific URLs on demand
//! (used by the Dependency Engine to re-fetch a single stale page rather
//! than re-crawling an entire site).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{FetchError, FetchResult};
use crate::traits::crawler::UrlValidator;

/// Raw page content fetched by an `Ingestor`, before adapter-specific
/// parsing into `Row`s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPage {
    /// URL or identifier for this content
    pub url: String,

    /// Raw content (markdown, HTML, or plain text)
    pub content: String,

    /// Content title if available
    pub title: Option<String>,

    /// MIME type or content type (e.g., "text/html", "application/pdf")
    pub content_type: Option<String>,

    /// When the content was fetched
    pub fetched_at: DateTime<Utc>,

    /// Source-specific metadata (e.g., HTTP headers)
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl RawPage {
    /// Create a new raw page with minimal fields.
    pub fn new(url: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content: content.into(),
            title: None,
            content_type: None,
            fetched_at: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    /// Set the page title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the fetched timestamp.
    pub fn with_fetched_at(mut self, fetched_at: DateTime<Utc>) -> Self {
        self.fetched_at = fetched_at;
        self
    }

    /// Add a metadata key-value pair.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Get content length in bytes.
    pub fn content_length(&self) -> usize {
        self.content.len()
    }

    /// Check if this page has content.
    pub fn has_content(&self) -> bool {
        !self.content.trim().is_empty()
    }

    /// Extract the site URL from this page's URL.
    pub fn site_url(&self) -> Option<String> {
        url::Url::parse(&self.url)
            .ok()
            .map(|u| format!("{}://{}", u.scheme(), u.host_str().unwrap_or("")))
    }
}

/// Configuration for discovery operations.
#[derive(Debug, Clone)]
pub struct DiscoverConfig {
    /// Starting URL or identifier
    pub url: String,

    /// Maximum number of pages to discover
    pub limit: usize,

    /// Maximum depth for recursive discovery (0 = single page)
    pub max_depth: usize,

    /// URL patterns to include (substring match)
    pub include_patterns: Vec<String>,

    /// URL patterns to exclude (substring match)
    pub exclude_patterns: Vec<String>,

    /// Additional options (source-specific)
    pub options: HashMap<String, String>,
}

impl DiscoverConfig {
    /// Create a new config for discovering from a URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            limit: 100,
            max_depth: 2,
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            options: HashMap::new(),
        }
    }

    /// Set the page limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Set the max depth.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Add an include pattern.
    pub fn include(mut self, pattern: impl Into<String>) -> Self {
        self.include_patterns.push(pattern.into());
        self
    }

    /// Add an exclude pattern.
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_patterns.push(pattern.into());
        self
    }

    /// Add a source-specific option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}

/// Ingestor trait for pluggable content fetching.
///
/// Implementations fetch content from various sources:
/// - `HttpIngestor` - generic HTTP crawling with link following, the
///   backbone of the website-crawler adapter family
/// - `MockIngestor` - canned responses for adapter tests
///
/// # SSRF protection
///
/// A website-crawler adapter always wraps its ingestor in
/// `ValidatedIngestor` before handing it to the job runner:
///
/// ```rust,ignore
/// let ingestor = ValidatedIngestor::new(HttpIngestor::new());
/// ```
#[async_trait]
pub trait Ingestor: Send + Sync {
    /// Discover and fetch pages from a source.
    ///
    /// Starts at `config.url`, follows links up to `config.max_depth`, and
    /// returns up to `config.limit` raw pages.
    async fn discover(&self, config: &DiscoverConfig) -> FetchResult<Vec<RawPage>>;

    /// Fetch specific URLs: re-fetching a single stale page, or a
    /// user-submitted URL, without re-running discovery.
    async fn fetch_specific(&self, urls: &[String]) -> FetchResult<Vec<RawPage>>;

    /// Fetch a single URL.
    async fn fetch_one(&self, url: &str) -> FetchResult<RawPage> {
        let pages = self.fetch_specific(&[url.to_string()]).await?;
        pages
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::ClientError { status: 404 })
    }

    /// Get the ingestor name (for logging/debugging).
    fn name(&self) -> &str {
        "unknown"
    }
}

/// An ingestor that validates URLs before fetching (SSRF protection).
///
/// Wraps any URL-based ingestor to ensure every URL, including ones
/// discovered mid-crawl via link-following, is checked against
/// [`UrlValidator`] before it is fetched.
pub struct ValidatedIngestor<I: Ingestor> {
    inner: I,
    validator: UrlValidator,
}

impl<I: Ingestor> ValidatedIngestor<I> {
    /// Create a new validated ingestor with default security rules.
    pub fn new(ingestor: I) -> Self {
        Self {
            inner: ingestor,
            validator: UrlValidator::new(),
        }
    }

    /// Create with a custom validator.
    pub fn with_validator(ingestor: I, validator: UrlValidator) -> Self {
        Self {
            inner: ingestor,
            validator,
        }
    }

    /// Validate a URL, returning an error if blocked.
    async fn validate_url(&self, url: &str) -> FetchResult<()> {
        self.validator
            .validate_with_dns(url)
            .await
            .map_err(FetchError::Security)
    }
}

#[async_trait]
impl<I: Ingestor> Ingestor for ValidatedIngestor<I> {
    async fn discover(&self, config: &DiscoverConfig) -> FetchResult<Vec<RawPage>> {
        self.validate_url(&config.url).await?;

        let pages = self.inner.discover(config).await?;

        let validated: Vec<_> = pages
            .into_iter()
            .filter(|p| self.validator.validate(&p.url).is_ok())
            .collect();

        Ok(validated)
    }

    async fn fetch_specific(&self, urls: &[String]) -> FetchResult<Vec<RawPage>> {
        let mut valid_urls = Vec::with_capacity(urls.len());
        for url in urls {
            if let Err(e) = self.validate_url(url).await {
                tracing::warn!("Skipping blocked URL {}: {}", url, e);
                continue;
            }
            valid_urls.push(url.clone());
        }

        if valid_urls.is_empty() {
            return Ok(Vec::new());
        }

        let pages = self.inner.fetch_specific(&valid_urls).await?;

        let validated: Vec<_> = pages
            .into_iter()
            .filter(|p| self.validator.validate(&p.url).is_ok())
            .collect();

        Ok(validated)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_page_builder() {
        let page = RawPage::new("https://example.com", "Hello, world!")
            .with_title("Example")
            .with_content_type("text/html")
            .with_metadata("source", "test");

        assert_eq!(page.url, "https://example.com");
        assert_eq!(page.title, Some("Example".to_string()));
        assert_eq!(page.content_type, Some("text/html".to_string()));
        assert_eq!(page.metadata.get("source"), Some(&"test".to_string()));
        assert!(page.has_content());
    }

    #[test]
    fn test_discover_config_builder() {
        let config = DiscoverConfig::new("https://example.com")
            .with_limit(50)
            .with_max_depth(3)
            .include("*/blog/*")
            .exclude("*/admin/*")
            .with_option("scrape_formats", "markdown");

        assert_eq!(config.url, "https://example.com");
        assert_eq!(config.limit, 50);
        assert_eq!(config.max_depth, 3);
        assert!(config.include_patterns.contains(&"*/blog/*".to_string()));
        assert!(config.exclude_patterns.contains(&"*/admin/*".to_string()));
        assert_eq!(
            config.options.get("scrape_formats"),
            Some(&"markdown".to_string())
        );
    }

    #[test]
    fn test_site_url_extraction() {
        let page = RawPage::new("https://example.com/path/to/page", "content");
        assert_eq!(page.site_url(), Some("https://example.com".to_string()));
    }

    #[test]
    fn test_empty_content_detection() {
        let empty = RawPage::new("https://example.com", "   ");
        assert!(!empty.has_content());

        let has_content = RawPage::new("https://example.com", "Hello");
        assert!(has_content.has_content());
    }
}
