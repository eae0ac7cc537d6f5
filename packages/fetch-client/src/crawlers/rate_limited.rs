//! Rate-limited ingestor wrapper.
//!
//! Wraps any `Ingestor` implementation with rate limiting using the
//! governor crate, grounding C1's "optional rate-limit interval" per
//! source client instance.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::error::FetchResult;
use crate::traits::ingestor::{DiscoverConfig, Ingestor, RawPage};

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// An ingestor wrapper that enforces rate limits.
///
/// Uses the governor crate for precise rate limiting with burst support.
pub struct RateLimitedIngestor<I: Ingestor> {
    inner: I,
    limiter: Arc<DefaultRateLimiter>,
}

impl<I: Ingestor> RateLimitedIngestor<I> {
    /// Create a new rate-limited ingestor.
    ///
    /// # Arguments
    /// * `ingestor` - The underlying ingestor to wrap
    /// * `requests_per_second` - Maximum requests per second
    pub fn new(ingestor: I, requests_per_second: u32) -> Self {
        let quota = Quota::per_second(
            NonZeroU32::new(requests_per_second).expect("requests_per_second must be > 0"),
        );
        Self {
            inner: ingestor,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Create with a custom quota.
    pub fn with_quota(ingestor: I, quota: Quota) -> Self {
        Self {
            inner: ingestor,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Create with burst support.
    pub fn with_burst(ingestor: I, requests_per_second: u32, burst: u32) -> Self {
        let quota = Quota::per_second(
            NonZeroU32::new(requests_per_second).expect("requests_per_second must be > 0"),
        )
        .allow_burst(NonZeroU32::new(burst).expect("burst must be > 0"));

        Self {
            inner: ingestor,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    async fn wait_for_permit(&self) {
        self.limiter.until_ready().await;
    }
}

#[async_trait]
impl<I: Ingestor> Ingestor for RateLimitedIngestor<I> {
    async fn discover(&self, config: &DiscoverConfig) -> FetchResult<Vec<RawPage>> {
        self.wait_for_permit().await;
        self.inner.discover(config).await
    }

    async fn fetch_specific(&self, urls: &[String]) -> FetchResult<Vec<RawPage>> {
        let mut pages = Vec::with_capacity(urls.len());

        for url in urls {
            self.wait_for_permit().await;

            match self.inner.fetch_specific(std::slice::from_ref(url)).await {
                Ok(mut found) => pages.append(&mut found),
                Err(e) => {
                    tracing::warn!("Failed to fetch {}: {}", url, e);
                }
            }
        }

        Ok(pages)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Extension trait for easy rate limiting.
pub trait IngestorExt: Ingestor + Sized {
    /// Wrap this ingestor with rate limiting.
    fn rate_limited(self, requests_per_second: u32) -> RateLimitedIngestor<Self> {
        RateLimitedIngestor::new(self, requests_per_second)
    }

    /// Wrap with rate limiting and burst support.
    fn rate_limited_with_burst(self, requests_per_second: u32, burst: u32) -> RateLimitedIngestor<Self> {
        RateLimitedIngestor::with_burst(self, requests_per_second, burst)
    }
}

impl<I: Ingestor + Sized> IngestorExt for I {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestors::MockIngestor;
    use std::time::Instant;

    #[tokio::test]
    async fn test_rate_limiting() {
        let mock = MockIngestor::new();
        mock.add_page(RawPage::new("https://example.com/1", "Page 1"));
        mock.add_page(RawPage::new("https://example.com/2", "Page 2"));
        mock.add_page(RawPage::new("https://example.com/3", "Page 3"));

        // 2 requests per second
        let ingestor = mock.rate_limited(2);

        let start = Instant::now();

        let urls = vec![
            "https://example.com/1".to_string(),
            "https://example.com/2".to_string(),
            "https://example.com/3".to_string(),
        ];
        let pages = ingestor.fetch_specific(&urls).await.unwrap();

        let elapsed = start.elapsed();

        assert_eq!(pages.len(), 3);

        // Should take at least 1 second for 3 requests at 2/sec
        assert!(elapsed.as_millis() >= 500, "Rate limiting not working: {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_extension_trait() {
        let mock = MockIngestor::new();
        let _ingestor = mock.rate_limited(1);
    }
}
