//! Typed errors for the fetch client.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so a `FetchError`
//! crossing into `ingestion-jobs` stays a matchable fact instead of an opaque
//! string. No `anyhow::Error` crosses this boundary; `anyhow` is fine as
//! internal transport inside `fetch()` itself.

use thiserror::Error;

/// Errors surfaced by [`crate::traits::ingestor::Ingestor::discover`] and
/// `fetch_specific`. Maps onto the job runner's `ConfigError` (`InvalidUrl`)
/// / `TransientNetworkError` / `RateLimited` / `Cancelled` taxonomy so a
/// caller can decide retryability without string matching.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Security validation failed (SSRF protection).
    #[error("security error: {0}")]
    Security(#[from] SecurityError),

    /// Transport failure after exhausting the retry budget: connection
    /// reset, DNS hiccup, 5xx. Retryable at the job level.
    #[error("transient failure after {attempts} attempt(s): {source}")]
    Transient {
        attempts: u32,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Non-2xx, non-429, non-5xx response. Retrying won't change a 404.
    #[error("client error: HTTP {status}")]
    ClientError { status: u16 },

    /// Request or connect timeout.
    #[error("timeout fetching {url}")]
    Timeout { url: String },

    /// HTTP 429, with the `Retry-After` value if the server sent one.
    #[error("rate limited{}", retry_after.map(|s| format!(", retry after {s}s")).unwrap_or_default())]
    RateLimited { retry_after: Option<u64> },

    /// Malformed URL, unresolvable host, or unsupported scheme.
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    /// Fetch was cancelled (e.g. job deadline, shutdown signal).
    #[error("fetch cancelled")]
    Cancelled,

    /// DNS resolution failed outright.
    #[error("DNS resolution failed: {0}")]
    Dns(String),

    /// The discover limit was hit before the crawl frontier was exhausted;
    /// not a failure, but callers that need exhaustiveness can match on it.
    #[error("page limit reached: {count}")]
    MaxPagesReached { count: usize },
}

impl FetchError {
    /// Whether retrying the same request could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::Transient { .. } | FetchError::Timeout { .. } | FetchError::RateLimited { .. }
        )
    }
}

/// Security-related errors, primarily for SSRF protection.
#[derive(Debug, Error)]
pub enum SecurityError {
    /// URL scheme not allowed (e.g., file://, ftp://)
    #[error("disallowed URL scheme: {0}")]
    DisallowedScheme(String),

    /// Host is blocked (e.g., localhost, internal IPs)
    #[error("blocked host: {0}")]
    BlockedHost(String),

    /// IP in blocked CIDR range (e.g., 10.0.0.0/8)
    #[error("blocked IP range: {0}")]
    BlockedCidr(String),

    /// URL has no host
    #[error("URL has no host")]
    NoHost,

    /// DNS resolution failed
    #[error("DNS resolution failed: {0}")]
    DnsResolution(String),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for security operations.
pub type SecurityResult<T> = std::result::Result<T, SecurityError>;
