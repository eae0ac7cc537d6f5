//! Crawl configuration for the website-crawler adapter family.

use serde::{Deserialize, Serialize};

/// Per-site crawl configuration: how far to go, how fast, and what to
/// respect along the way. A website-crawler adapter's `plan()` turns this
/// into one or more [`crate::traits::ingestor::DiscoverConfig`] calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Starting URL to crawl
    pub url: String,

    /// Maximum number of pages to crawl
    pub max_pages: usize,

    /// Maximum depth to crawl (0 = only starting page)
    pub max_depth: usize,

    /// Delay between requests in milliseconds
    pub rate_limit_ms: u64,

    /// Follow links to subdomains
    pub follow_subdomains: bool,

    /// URL substrings to include (simple contains match, same as
    /// `DiscoverConfig`'s patterns)
    #[serde(default)]
    pub include_patterns: Vec<String>,

    /// URL substrings to exclude
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_pages: 100,
            max_depth: 3,
            rate_limit_ms: 1000,
            follow_subdomains: false,
            include_patterns: vec![],
            exclude_patterns: vec![],
        }
    }
}

impl CrawlConfig {
    /// Create a new crawl config for a URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set maximum pages.
    pub fn with_max_pages(mut self, max: usize) -> Self {
        self.max_pages = max;
        self
    }

    /// Set maximum depth.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set rate limit.
    pub fn with_rate_limit_ms(mut self, ms: u64) -> Self {
        self.rate_limit_ms = ms;
        self
    }

    /// Enable subdomain following.
    pub fn with_subdomains(mut self) -> Self {
        self.follow_subdomains = true;
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

    /// Turn this into a [`crate::traits::ingestor::DiscoverConfig`] for the
    /// `Ingestor` trait.
    pub fn to_discover_config(&self) -> crate::traits::ingestor::DiscoverConfig {
        let mut config = crate::traits::ingestor::DiscoverConfig::new(self.url.clone())
            .with_limit(self.max_pages)
            .with_max_depth(self.max_depth);
        for pattern in &self.include_patterns {
            config = config.include(pattern.clone());
        }
        for pattern in &self.exclude_patterns {
            config = config.exclude(pattern.clone());
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crawl_config_converts_to_discover_config() {
        let crawl = CrawlConfig::new("https://example.com")
            .with_max_pages(25)
            .with_max_depth(2)
            .include("/news");

        let discover = crawl.to_discover_config();
        assert_eq!(discover.url, "https://example.com");
        assert_eq!(discover.limit, 25);
        assert_eq!(discover.max_depth, 2);
        assert_eq!(discover.include_patterns, vec!["/news".to_string()]);
    }

    #[test]
    fn defaults_do_not_follow_subdomains() {
        let config = CrawlConfig::new("https://example.com");
        assert!(!config.follow_subdomains);
    }
}
