//! The `SourceAdapter` trait (C2): three pure operations plus the
//! concurrency/retry/rate-limit defaults a source declares about itself.

use async_trait::async_trait;
use warehouse::{Row, SchemaSpec};

use crate::error::AdapterResult;
use crate::plan::FetchPlan;

/// Per-source execution policy. Every adapter declares these defaults; the
/// Job Runner's per-source semaphore and retry backoff are sized from them.
#[derive(Debug, Clone, Copy)]
pub struct AdapterConfig {
    pub max_concurrency: usize,
    pub max_retries: u32,
    pub rate_limit_interval_ms: u64,
    pub timeout_secs: u64,
    /// Whether zero rows inserted should fail the job outright instead of
    /// succeeding with a logged warning. Off by default; a handful of
    /// known-flaky sources opt in.
    pub require_rows: bool,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            max_retries: 3,
            rate_limit_interval_ms: 250,
            timeout_secs: 30,
            require_rows: false,
        }
    }
}

/// Parameters identifying one ingestion run (dataset/category/date range),
/// carried verbatim in `IngestionJob.payload`.
pub type JobParams = serde_json::Value;

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable identifier matching `IngestionJob.source` and the job-type
    /// routing key in `CommandRegistry`.
    fn name(&self) -> &'static str;

    fn config(&self) -> AdapterConfig {
        AdapterConfig::default()
    }

    /// Deterministic target-table schema for the given job parameters.
    /// Pure: same `params` always yields the same `SchemaSpec`.
    fn schema_for(&self, params: &JobParams) -> AdapterResult<SchemaSpec>;

    /// The ordered set of HTTP requests (or crawl/LLM calls) this job needs
    /// to perform, before any of them run.
    fn plan(&self, params: &JobParams) -> AdapterResult<FetchPlan>;

    /// Turn a raw response body into canonical rows. Pure given the same
    /// `body` and `params`.
    fn parse(&self, params: &JobParams, body: &[u8]) -> AdapterResult<Vec<Row>>;

    /// Override when a source's work isn't representable as a fixed
    /// request list known up front — a BFS crawl whose page set is
    /// discovered as it runs, or rows extracted from a document already
    /// resolved elsewhere in the job payload. Returning `Some` bypasses
    /// `plan`/`parse` for this job entirely; the default drives the
    /// plan -> fetch -> parse pipeline every other source uses.
    async fn execute_custom(&self, _params: &JobParams) -> Option<AdapterResult<Vec<Row>>> {
        None
    }
}
