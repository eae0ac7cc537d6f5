//! Mock ingestor for testing.
//!
//! Provides a configurable mock implementation of the Ingestor trait.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::FetchResult;
use crate::traits::ingestor::{DiscoverConfig, Ingestor, RawPage};

/// Mock ingestor for testing.
///
/// Allows configuring canned responses for discover and fetch operations.
///
/// # Example
///
/// ```rust
/// use fetch_client::ingestors::{MockIngestor, RawPage};
///
/// let mut mock = MockIngestor::new();
/// mock.add_page(RawPage::new("https://example.com", "# Hello\n\nWorld"));
///
/// // Now discover or fetch will return this page
/// ```
#[derive(Default)]
pub struct MockIngestor {
    /// Canned pages indexed by URL
    pages: Arc<RwLock<HashMap<String, RawPage>>>,
    /// Track call counts for verification
    discover_calls: Arc<RwLock<Vec<String>>>,
    fetch_calls: Arc<RwLock<Vec<Vec<String>>>>,
}

impl MockIngestor {
    /// Create a new empty mock ingestor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a page that will be returned by discover/fetch.
    pub fn add_page(&self, page: RawPage) {
        let mut pages = self.pages.write().unwrap();
        pages.insert(page.url.clone(), page);
    }

    /// Add multiple pages.
    pub fn add_pages(&self, pages: Vec<RawPage>) {
        for page in pages {
            self.add_page(page);
        }
    }

    /// Create a mock with pre-configured pages (builder pattern).
    pub fn with_page(self, page: RawPage) -> Self {
        self.add_page(page);
        self
    }

    /// Create a mock with multiple pre-configured pages (builder pattern).
    pub fn with_pages(self, pages: Vec<RawPage>) -> Self {
        self.add_pages(pages);
        self
    }

    /// Get the number of times discover was called.
    pub fn discover_call_count(&self) -> usize {
        self.discover_calls.read().unwrap().len()
    }

    /// Get the URLs that were requested via discover.
    pub fn discover_calls(&self) -> Vec<String> {
        self.discover_calls.read().unwrap().clone()
    }

    /// Get the number of times fetch_specific was called.
    pub fn fetch_call_count(&self) -> usize {
        self.fetch_calls.read().unwrap().len()
    }

    /// Get the URLs that were requested via fetch_specific.
    pub fn fetch_calls(&self) -> Vec<Vec<String>> {
        self.fetch_calls.read().unwrap().clone()
    }

    /// Clear all recorded calls.
    pub fn reset_calls(&self) {
        self.discover_calls.write().unwrap().clear();
        self.fetch_calls.write().unwrap().clear();
    }

    /// Clear all pages and calls.
    pub fn reset(&self) {
        self.pages.write().unwrap().clear();
        self.reset_calls();
    }
}

impl Clone for MockIngestor {
    fn clone(&self) -> Self {
        Self {
            pages: Arc::clone(&self.pages),
            discover_calls: Arc::clone(&self.discover_calls),
            fetch_calls: Arc::clone(&self.fetch_calls),
        }
    }
}

#[async_trait]
impl Ingestor for MockIngestor {
    async fn discover(&self, config: &DiscoverConfig) -> FetchResult<Vec<RawPage>> {
        self.discover_calls
            .write()
            .unwrap()
            .push(config.url.clone());

        let pages = self.pages.read().unwrap();
        let site_url = url::Url::parse(&config.url)
            .ok()
            .map(|u| format!("{}://{}", u.scheme(), u.host_str().unwrap_or("")));

        let matching: Vec<RawPage> = pages
            .values()
            .filter(|p| {
                if let Some(ref site) = site_url {
                    p.url.starts_with(site)
                } else {
                    true
                }
            })
            .take(config.limit)
            .cloned()
            .collect();

        Ok(matching)
    }

    async fn fetch_specific(&self, urls: &[String]) -> FetchResult<Vec<RawPage>> {
        self.fetch_calls.write().unwrap().push(urls.to_vec());

        let pages = self.pages.read().unwrap();
        let found: Vec<RawPage> = urls
            .iter()
            .filter_map(|url| pages.get(url).cloned())
            .collect();

        Ok(found)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Builder for creating test scenarios with the mock ingestor.
pub struct MockIngestorBuilder {
    mock: MockIngestor,
}

impl MockIngestorBuilder {
    /// Start building a mock ingestor.
    pub fn new() -> Self {
        Self {
            mock: MockIngestor::new(),
        }
    }

    /// Add a simple page with just URL and content.
    pub fn page(self, url: &str, content: &str) -> Self {
        self.mock.add_page(RawPage::new(url, content));
        self
    }

    /// Add a page with a title.
    pub fn page_with_title(self, url: &str, title: &str, content: &str) -> Self {
        self.mock
            .add_page(RawPage::new(url, content).with_title(title));
        self
    }

    /// Build the mock ingestor.
    pub fn build(self) -> MockIngestor {
        self.mock
    }
}

impl Default for MockIngestorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
