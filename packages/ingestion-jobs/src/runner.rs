//! Job Runner (C5): claims ready jobs, drives one `SourceAdapter` through
//! plan -> fetch -> parse -> write, and folds the outcome back into the
//! job record. Lifecycle methods mirror the original's `BaseSourceIngestor`:
//! `start_job`, `complete_job`, `fail_job`.

use std::collections::HashMap;
use std::sync::Arc;

use fetch_client::{FetchedResponse, Fetcher};
use ingestion_adapters::{HttpMethod, SourceAdapter};
use ingestion_quality::QualityStore;
use job_engine::{ClaimedJob, FailureKind, JobStore};
use reqwest::Method;
use tracing::{info, warn};
use warehouse::{BatchWriter, Provisioner, Row, SchemaSpec};

use crate::error::{JobError, JobResult};

/// Outcome folded back into the job record; never propagated to the
/// caller of [`JobRunner::run`].
#[derive(Debug)]
pub enum JobOutcome {
    Success { job_id: uuid::Uuid, rows_inserted: i64 },
    SuccessWithWarning { job_id: uuid::Uuid, rows_inserted: i64 },
    Failed { job_id: uuid::Uuid, error: JobError },
}

impl JobOutcome {
    pub fn job_id(&self) -> uuid::Uuid {
        match self {
            JobOutcome::Success { job_id, .. } => *job_id,
            JobOutcome::SuccessWithWarning { job_id, .. } => *job_id,
            JobOutcome::Failed { job_id, .. } => *job_id,
        }
    }

    pub fn succeeded(&self) -> bool {
        !matches!(self, JobOutcome::Failed { .. })
    }
}

pub struct JobRunner {
    store: Arc<dyn JobStore>,
    provisioner: Provisioner,
    writer: BatchWriter,
    quality: Arc<QualityStore>,
    rule_seeder_min_rows: usize,
    adapters: HashMap<&'static str, Arc<dyn SourceAdapter>>,
    worker_id: String,
}

impl JobRunner {
    pub fn new(
        store: Arc<dyn JobStore>,
        provisioner: Provisioner,
        writer: BatchWriter,
        quality: Arc<QualityStore>,
        rule_seeder_min_rows: usize,
        worker_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            provisioner,
            writer,
            quality,
            rule_seeder_min_rows,
            adapters: HashMap::new(),
            worker_id: worker_id.into(),
        }
    }

    pub fn register_adapter(mut self, adapter: Arc<dyn SourceAdapter>) -> Self {
        self.adapters.insert(adapter.name(), adapter);
        self
    }

    pub fn has_adapter(&self, source: &str) -> bool {
        self.adapters.contains_key(source)
    }

    /// The adapter's own declared retry budget, for a caller inserting a
    /// job row that needs to set `max_retries` up front rather than fall
    /// back to the table's generic default.
    pub fn max_retries_for(&self, source: &str) -> Option<u32> {
        self.adapters.get(source).map(|a| a.config().max_retries)
    }

    /// Claim up to `limit` ready jobs and run each to completion. Every
    /// job's outcome is folded into the job record; this call itself is
    /// infallible to the caller beyond the claim step.
    pub async fn run_once(&self, limit: i64) -> anyhow::Result<Vec<JobOutcome>> {
        let claimed = self.store.claim_ready(&self.worker_id, limit).await?;
        let mut outcomes = Vec::with_capacity(claimed.len());
        for job in claimed {
            outcomes.push(self.run_job(job).await);
        }
        Ok(outcomes)
    }

    #[tracing::instrument(skip(self, job), fields(job_id = %job.id, source = %job.job_type))]
    async fn run_job(&self, job: ClaimedJob) -> JobOutcome {
        let Some(adapter) = self.adapters.get(job.job_type.as_str()).cloned() else {
            let error = JobError::Deserialization(job_engine::DeserializationError::UnknownJobType(
                job.job_type.clone(),
            ));
            self.fail_job(job.id, &error).await;
            return JobOutcome::Failed { job_id: job.id, error };
        };

        match self.execute(&job, adapter.as_ref()).await {
            Ok((rows_inserted, require_rows, warn_on_empty)) => {
                self.complete_job(job.id, rows_inserted, require_rows, warn_on_empty).await
            }
            Err(error) => {
                self.fail_job(job.id, &error).await;
                JobOutcome::Failed { job_id: job.id, error }
            }
        }
    }

    async fn execute(
        &self,
        job: &ClaimedJob,
        adapter: &dyn SourceAdapter,
    ) -> JobResult<(i64, bool, bool)> {
        let config = adapter.config();
        let schema = adapter.schema_for(&job.payload)?;
        self.provisioner.prepare(&job.job_type, &schema).await?;

        let rows = match adapter.execute_custom(&job.payload).await {
            Some(result) => result?,
            None => {
                let plan = adapter.plan(&job.payload)?;
                let fetcher = Fetcher::with_full_policy(
                    config.max_concurrency,
                    config.max_retries,
                    config.timeout_secs,
                    config.rate_limit_interval_ms,
                );

                let mut rows = Vec::new();
                for request in &plan.requests {
                    let method = match request.method {
                        HttpMethod::Get => Method::GET,
                        HttpMethod::Post => Method::POST,
                    };
                    let response: FetchedResponse = fetcher
                        .fetch(method, &request.url, &request.headers, &request.query, request.body.clone())
                        .await
                        .map_err(|e| JobError::Adapter(ingestion_adapters::AdapterError::from(e)))?;
                    rows.extend(adapter.parse(&job.payload, &response.body)?);
                }
                rows
            }
        };

        let outcome = self.writer.write(&schema, &rows, None).await?;
        if outcome.rows_written() > 0 {
            self.spawn_quality_pipeline(&schema, &job.job_type, rows);
        }
        Ok((outcome.rows_written() as i64, config.require_rows, true))
    }

    /// Fires the Quality Pipeline (C9) after a successful write without
    /// blocking the job on it — a profiling/scoring failure is a quality
    /// signal in its own right, never a reason to fail an ingest that
    /// already landed its rows.
    fn spawn_quality_pipeline(&self, schema: &SchemaSpec, source: &str, rows: Vec<Row>) {
        let quality = self.quality.clone();
        let table_name = schema.table_name.clone();
        let source = source.to_string();
        let min_rows = self.rule_seeder_min_rows;
        tokio::spawn(async move {
            match ingestion_quality::run_pipeline(&quality, &table_name, &source, &rows, min_rows).await {
                Ok(result) => info!(
                    table = %table_name,
                    violations = result.violations.len(),
                    alerts = result.alerts.len(),
                    score = result.score.composite(),
                    "quality pipeline complete"
                ),
                Err(error) => warn!(table = %table_name, %error, "quality pipeline failed"),
            }
        });
    }

    /// PENDING/claimed -> RUNNING is handled by the store's `claim_ready`
    /// transaction itself; this is the explicit marker for callers that
    /// claim through a different path (e.g. a manual retry trigger).
    pub async fn start_job(&self, job_id: uuid::Uuid) -> anyhow::Result<()> {
        self.store.heartbeat(job_id).await
    }

    /// RUNNING -> SUCCESS, or FAILED if `require_rows` and nothing was
    /// inserted. With `warn_on_empty` and no `require_rows`, zero rows is
    /// SUCCESS with a logged warning rather than a failure.
    async fn complete_job(
        &self,
        job_id: uuid::Uuid,
        rows_inserted: i64,
        require_rows: bool,
        warn_on_empty: bool,
    ) -> JobOutcome {
        if rows_inserted == 0 && require_rows {
            let error = JobError::EmptyResultRequired;
            self.fail_job(job_id, &error).await;
            return JobOutcome::Failed { job_id, error };
        }
        if let Err(e) = self.store.mark_succeeded(job_id, rows_inserted).await {
            warn!(job_id = %job_id, error = %e, "failed to mark job succeeded");
        }
        if rows_inserted == 0 && warn_on_empty {
            warn!(job_id = %job_id, "job completed with zero rows inserted");
            JobOutcome::SuccessWithWarning { job_id, rows_inserted }
        } else {
            info!(job_id = %job_id, rows_inserted, "job succeeded");
            JobOutcome::Success { job_id, rows_inserted }
        }
    }

    /// RUNNING -> FAILED, `error_details.exception_type` carried in the
    /// error text the store persists.
    async fn fail_job(&self, job_id: uuid::Uuid, error: &JobError) {
        let kind = error.failure_kind();
        let message = format!("{error}");
        if let Err(e) = self.store.mark_failed(job_id, &message, kind).await {
            warn!(job_id = %job_id, error = %e, "failed to record job failure");
        }
        let retryable = matches!(kind, FailureKind::Retryable);
        warn!(job_id = %job_id, %error, retryable, "job failed");
    }
}
