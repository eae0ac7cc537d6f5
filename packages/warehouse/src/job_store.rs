//! Postgres-backed [`job_engine::JobStore`]: claims `IngestionJob` rows with
//! `FOR UPDATE SKIP LOCKED` so concurrent workers never claim the same job
//! twice, the same way the teacher's crawler storage claimed crawl targets.

use anyhow::{Context, Result};
use async_trait::async_trait;
use job_engine::{ClaimedJob, FailureKind, JobStore};
use sqlx::{PgPool, Row};
use uuid::Uuid;

pub struct PostgresJobStore {
    pool: PgPool,
}

impl PostgresJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PostgresJobStore {
    async fn claim_ready(&self, worker_id: &str, limit: i64) -> Result<Vec<ClaimedJob>> {
        let mut tx = self.pool.begin().await.context("failed to start claim transaction")?;

        let rows = sqlx::query(
            r#"
            SELECT id, source, payload, payload_version, attempt
            FROM ingestion_jobs
            WHERE (status = 'pending')
               OR (status = 'failed' AND retry_count < max_retries AND next_retry_at <= now())
            ORDER BY created_at DESC
            LIMIT $1
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(limit)
        .fetch_all(&mut *tx)
        .await
        .context("failed to select claimable jobs")?;

        let mut claimed = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: Uuid = row.get("id");
            sqlx::query(
                r#"
                UPDATE ingestion_jobs
                SET status = 'running', started_at = now(), claimed_by = $2, attempt = attempt + 1
                WHERE id = $1
                "#,
            )
            .bind(id)
            .bind(worker_id)
            .execute(&mut *tx)
            .await
            .context("failed to mark job running")?;

            claimed.push(ClaimedJob {
                id,
                job_type: row.get("source"),
                payload: row.get("payload"),
                version: row.get("payload_version"),
                attempt: row.get::<i32, _>("attempt") + 1,
            });
        }

        tx.commit().await.context("failed to commit claim transaction")?;
        Ok(claimed)
    }

    async fn mark_succeeded(&self, job_id: Uuid, rows_inserted: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE ingestion_jobs
            SET status = 'success', completed_at = now(), rows_inserted = $2
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .bind(rows_inserted)
        .execute(&self.pool)
        .await
        .context("failed to mark job succeeded")?;
        Ok(())
    }

    async fn mark_failed(&self, job_id: Uuid, error: &str, kind: FailureKind) -> Result<()> {
        match kind {
            FailureKind::Retryable => {
                sqlx::query(
                    r#"
                    UPDATE ingestion_jobs
                    SET status = 'failed',
                        completed_at = now(),
                        error_message = $2,
                        retry_count = retry_count + 1,
                        next_retry_at = now() + (least(300 * power(2, retry_count), 86400) * interval '1 second')
                    WHERE id = $1
                    "#,
                )
                .bind(job_id)
                .bind(error)
                .execute(&self.pool)
                .await
                .context("failed to record retryable failure")?;
            }
            FailureKind::NonRetryable => {
                sqlx::query(
                    r#"
                    UPDATE ingestion_jobs
                    SET status = 'failed', completed_at = now(), error_message = $2, retry_count = max_retries
                    WHERE id = $1
                    "#,
                )
                .bind(job_id)
                .bind(error)
                .execute(&self.pool)
                .await
                .context("failed to record non-retryable failure")?;
            }
        }
        Ok(())
    }

    async fn heartbeat(&self, job_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE ingestion_jobs SET heartbeat_at = now() WHERE id = $1")
            .bind(job_id)
            .execute(&self.pool)
            .await
            .context("failed to record heartbeat")?;
        Ok(())
    }
}
