//! Thin job-submission API surface (§6): wires the Job Runner,
//! Retry/Dependency Engines, and Job Monitor to Postgres behind five
//! HTTP endpoints and a background poll loop. Split into a library and a
//! thin [`src/bin/main.rs`] binary so integration tests can drive the
//! router and poll loop directly against a real database.

pub mod api;
pub mod chains;
pub mod config;
pub mod error;
pub mod jobs_repo;
pub mod monitoring;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use ingestion_adapters::SourceAdapter;
use ingestion_jobs::JobRunner;
use ingestion_quality::QualityStore;
use sqlx::postgres::PgPoolOptions;
use warehouse::{BatchWriter, PostgresJobStore, Provisioner};

use crate::config::Config;
use crate::state::AppState;

pub async fn connect(config: &Config) -> anyhow::Result<sqlx::PgPool> {
    let pool = PgPoolOptions::new().max_connections(10).connect(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}

/// Builds a [`JobRunner`] with `adapters` registered and its store/provisioner/
/// writer pointed at `pool`. Production startup registers the built-in
/// source families; tests register fakes pointed at a mock HTTP server.
pub fn build_job_runner(
    pool: sqlx::PgPool,
    batch_size: usize,
    rule_seeder_min_rows: usize,
    worker_id: impl Into<String>,
    adapters: Vec<Arc<dyn SourceAdapter>>,
) -> JobRunner {
    let store = Arc::new(PostgresJobStore::new(pool.clone()));
    let provisioner = Provisioner::new(pool.clone());
    let quality = Arc::new(QualityStore::new(pool.clone()));
    let writer = BatchWriter::new(pool).with_batch_size(batch_size);

    let mut runner = JobRunner::new(store, provisioner, writer, quality, rule_seeder_min_rows, worker_id);
    for adapter in adapters {
        runner = runner.register_adapter(adapter);
    }
    runner
}

/// The Job Runner and Dependency Engine are both driven by polling rather
/// than a push queue, matching the original's worker loop: claim what's
/// ready, run it, fold outcomes back, then let the Dependency Engine
/// unblock whatever those outcomes just satisfied.
pub fn spawn_poll_loop(state: AppState, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match state.job_runner.run_once(state.config.max_concurrency_default as i64).await {
                Ok(outcomes) => {
                    for outcome in &outcomes {
                        if let Err(e) = chains::advance(&state.pool, outcome.job_id(), outcome.succeeded()).await {
                            tracing::warn!(error = %e, job_id = %outcome.job_id(), "failed to advance chain");
                        }
                    }
                }
                Err(e) => tracing::warn!(error = %e, "poll cycle failed to claim jobs"),
            }
        }
    });
}
