//! Direct queries against `ingestion_jobs` for the parts of the API surface
//! `job_engine::JobStore` doesn't expose: submission, point lookup, and the
//! immediate-retry path. `JobStore` only claims and folds outcomes back;
//! creating and inspecting job rows is the API layer's own concern.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgPool, Row};
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct JobRecord {
    pub id: Uuid,
    pub source: String,
    pub payload: serde_json::Value,
    pub status: String,
    pub attempt: i32,
    pub retry_count: i32,
    pub max_retries: i32,
    pub rows_inserted: Option<i64>,
    pub error_message: Option<String>,
    pub chain_id: Option<Uuid>,
    pub chain_node_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

fn row_to_record(row: sqlx::postgres::PgRow) -> JobRecord {
    JobRecord {
        id: row.get("id"),
        source: row.get("source"),
        payload: row.get("payload"),
        status: row.get("status"),
        attempt: row.get("attempt"),
        retry_count: row.get("retry_count"),
        max_retries: row.get("max_retries"),
        rows_inserted: row.get("rows_inserted"),
        error_message: row.get("error_message"),
        chain_id: row.get("chain_id"),
        chain_node_id: row.get("chain_node_id"),
        created_at: row.get("created_at"),
        started_at: row.get("started_at"),
        completed_at: row.get("completed_at"),
    }
}

/// Creates a PENDING job. `chain_id`/`chain_node_id` are `None` for a
/// standalone `POST /sources/<src>/ingest` submission. `max_retries`
/// should come from the source's own adapter config; `None` leaves the
/// table's generic default in place for callers that don't have an
/// adapter handle (e.g. a chain node whose source turns out unknown).
pub async fn submit_job(
    pool: &PgPool,
    source: &str,
    payload: &serde_json::Value,
    status: &str,
    chain_id: Option<Uuid>,
    chain_node_id: Option<&str>,
    max_retries: Option<u32>,
) -> anyhow::Result<Uuid> {
    let row = sqlx::query(
        "INSERT INTO ingestion_jobs (source, payload, status, chain_id, chain_node_id, max_retries) \
         VALUES ($1, $2, $3, $4, $5, coalesce($6, 3)) RETURNING id",
    )
    .bind(source)
    .bind(payload)
    .bind(status)
    .bind(chain_id)
    .bind(chain_node_id)
    .bind(max_retries.map(|n| n as i32))
    .fetch_one(pool)
    .await?;
    Ok(row.get("id"))
}

pub async fn get_by_id(pool: &PgPool, id: Uuid) -> anyhow::Result<Option<JobRecord>> {
    let row = sqlx::query(
        "SELECT id, source, payload, status, attempt, retry_count, max_retries, rows_inserted, \
                error_message, chain_id, chain_node_id, created_at, started_at, completed_at \
         FROM ingestion_jobs WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(row_to_record))
}

/// Resets a FAILED job to PENDING immediately, bypassing `next_retry_at`
/// backoff and the `retry_count < max_retries` budget — the explicit
/// operator override the Retry Scheduler's automatic path doesn't cover.
pub async fn retry_immediately(pool: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query(
        "UPDATE ingestion_jobs SET status = 'pending', next_retry_at = NULL, error_message = NULL \
         WHERE id = $1 AND status = 'failed'",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
