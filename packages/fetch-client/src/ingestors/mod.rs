//! Ingestor implementations for the website-crawler adapter family.
//!
//! - `HttpIngestor` - HTTP crawling with link following
//! - `MockIngestor` - canned responses, for adapter tests
//!
//! # Example
//!
//! ```rust,ignore
//! use fetch_client::ingestors::{HttpIngestor, ValidatedIngestor};
//! use fetch_client::traits::ingestor::DiscoverConfig;
//!
//! let ingestor = ValidatedIngestor::new(HttpIngestor::new());
//! let config = DiscoverConfig::new("https://example.com").with_limit(10);
//! let pages = ingestor.discover(&config).await?;
//! ```

mod http;
mod mock;

pub use http::HttpIngestor;
pub use mock::{MockIngestor, MockIngestorBuilder};

pub use crate::traits::ingestor::{DiscoverConfig, Ingestor, RawPage, ValidatedIngestor};
