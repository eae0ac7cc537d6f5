//! HTTP fetching and crawling for source adapters (C1).
//!
//! `fetch-client` is the shared HTTP layer every adapter family builds on:
//! bounded concurrency, rate limiting, SSRF-safe URL validation, and a
//! BFS website crawler with HTML→markdown conversion for the
//! website-crawler adapter family. A REST+JSON adapter (EIA, Census, SEC
//! EDGAR) typically drives `reqwest` directly through its own client and
//! only needs [`security::credentials::SecretString`] and the retry/backoff
//! conventions this crate documents; a website-crawler adapter wraps
//! [`ingestors::HttpIngestor`] in [`ingestors::ValidatedIngestor`] and,
//! optionally, [`crawlers::RateLimitedIngestor`].
//!
//! ```rust,ignore
//! use fetch_client::ingestors::{HttpIngestor, ValidatedIngestor};
//! use fetch_client::traits::ingestor::DiscoverConfig;
//!
//! let ingestor = ValidatedIngestor::new(HttpIngestor::new());
//! let config = DiscoverConfig::new("https://redcross.org").with_limit(50);
//! let pages = ingestor.discover(&config).await?;
//! ```
//!
//! ## Modules
//!
//! - [`traits`] - `Ingestor` trait and `UrlValidator` (SSRF protection)
//! - [`types`] - `CrawlConfig`, the adapter-facing crawl configuration
//! - [`ingestors`] - `HttpIngestor`, `MockIngestor`
//! - [`crawlers`] - `RateLimitedIngestor`
//! - [`security`] - credential handling (`SecretString`, `ApiCredentials`)

pub mod crawlers;
pub mod error;
pub mod fetcher;
pub mod ingestors;
pub mod security;
pub mod traits;
pub mod types;

pub use error::{FetchError, FetchResult, SecurityError};
pub use fetcher::{FetchedResponse, Fetcher, RetryPolicy};
pub use traits::{
    crawler::UrlValidator,
    ingestor::{DiscoverConfig, Ingestor, RawPage, ValidatedIngestor},
};
pub use types::config::CrawlConfig;

pub use crawlers::{IngestorExt, RateLimitedIngestor};
pub use ingestors::{HttpIngestor, MockIngestor, MockIngestorBuilder};
pub use security::credentials::{ApiCredentials, SecretString};
