//! Crawling support shared by `Ingestor` implementations.
//!
//! - `RateLimitedIngestor` - wrapper that adds rate limiting

pub mod rate_limited;

pub use rate_limited::{IngestorExt, RateLimitedIngestor};
