//! Job Monitor: metrics, per-source health, and alert conditions backing
//! `GET /monitoring/dashboard`. A direct translation of the aggregate
//! queries the original ran against `IngestionJob`, built on raw
//! `sqlx::query` since the dashboard has no typed row shape worth a
//! compile-time macro.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::{PgPool, Row};
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct RecentFailure {
    pub job_id: Uuid,
    pub source: String,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub retry_count: i32,
}

#[derive(Debug, Serialize)]
pub struct JobMetrics {
    pub time_window_hours: i64,
    pub source_filter: Option<String>,
    pub total_jobs: i64,
    pub status_breakdown: serde_json::Value,
    pub success_rate_percent: f64,
    pub failure_rate_percent: f64,
    pub avg_duration_seconds: f64,
    pub total_rows_inserted: i64,
    pub recent_failures: Vec<RecentFailure>,
}

pub async fn job_metrics(pool: &PgPool, hours: i64, source: Option<&str>) -> anyhow::Result<JobMetrics> {
    let cutoff = Utc::now() - Duration::hours(hours);

    let status_rows = sqlx::query(
        "SELECT status, count(*) AS n FROM ingestion_jobs \
         WHERE created_at >= $1 AND ($2::text IS NULL OR source = $2) \
         GROUP BY status",
    )
    .bind(cutoff)
    .bind(source)
    .fetch_all(pool)
    .await?;

    let mut status_breakdown = serde_json::Map::new();
    let mut total_jobs = 0i64;
    for row in &status_rows {
        let status: String = row.get("status");
        let count: i64 = row.get("n");
        total_jobs += count;
        status_breakdown.insert(status, serde_json::json!(count));
    }
    let success_count = status_breakdown.get("success").and_then(|v| v.as_i64()).unwrap_or(0);
    let failed_count = status_breakdown.get("failed").and_then(|v| v.as_i64()).unwrap_or(0);

    let success_rate_percent = if total_jobs > 0 { success_count as f64 / total_jobs as f64 * 100.0 } else { 0.0 };
    let failure_rate_percent = if total_jobs > 0 { failed_count as f64 / total_jobs as f64 * 100.0 } else { 0.0 };

    let duration_row = sqlx::query(
        "SELECT avg(extract(epoch FROM completed_at - started_at)) AS avg_seconds, \
                coalesce(sum(rows_inserted), 0) AS total_rows \
         FROM ingestion_jobs \
         WHERE created_at >= $1 AND ($2::text IS NULL OR source = $2) \
           AND status = 'success' AND started_at IS NOT NULL AND completed_at IS NOT NULL",
    )
    .bind(cutoff)
    .bind(source)
    .fetch_one(pool)
    .await?;
    let avg_duration_seconds: f64 = duration_row.try_get::<Option<f64>, _>("avg_seconds")?.unwrap_or(0.0);
    let total_rows_inserted: i64 = duration_row.get("total_rows");

    let failure_rows = sqlx::query(
        "SELECT id, source, error_message, created_at, retry_count FROM ingestion_jobs \
         WHERE created_at >= $1 AND ($2::text IS NULL OR source = $2) AND status = 'failed' \
         ORDER BY created_at DESC LIMIT 5",
    )
    .bind(cutoff)
    .bind(source)
    .fetch_all(pool)
    .await?;

    let recent_failures = failure_rows
        .iter()
        .map(|row| RecentFailure {
            job_id: row.get("id"),
            source: row.get("source"),
            error_message: row.get::<Option<String>, _>("error_message").map(|m| m.chars().take(200).collect()),
            created_at: row.get("created_at"),
            retry_count: row.get("retry_count"),
        })
        .collect();

    Ok(JobMetrics {
        time_window_hours: hours,
        source_filter: source.map(str::to_string),
        total_jobs,
        status_breakdown: serde_json::Value::Object(status_breakdown),
        success_rate_percent: round2(success_rate_percent),
        failure_rate_percent: round2(failure_rate_percent),
        avg_duration_seconds: round2(avg_duration_seconds),
        total_rows_inserted,
        recent_failures,
    })
}

#[derive(Debug, Serialize)]
pub struct SourceHealth {
    pub status: &'static str,
    pub health_score: i64,
    pub jobs_24h: i64,
    pub success_24h: i64,
    pub failed_24h: i64,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub last_failure_message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SourceHealthReport {
    pub sources: std::collections::BTreeMap<String, SourceHealth>,
    pub overall_health: &'static str,
}

pub async fn source_health(pool: &PgPool) -> anyhow::Result<SourceHealthReport> {
    let cutoff = Utc::now() - Duration::hours(24);
    let sources: Vec<String> = sqlx::query("SELECT DISTINCT source FROM ingestion_jobs")
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|row| row.get("source"))
        .collect();

    let mut report = std::collections::BTreeMap::new();
    for source in &sources {
        let counts = sqlx::query(
            "SELECT \
                count(*) AS total, \
                count(*) FILTER (WHERE status = 'success') AS success, \
                count(*) FILTER (WHERE status = 'failed') AS failed \
             FROM ingestion_jobs WHERE source = $1 AND created_at >= $2",
        )
        .bind(source)
        .bind(cutoff)
        .fetch_one(pool)
        .await?;
        let total: i64 = counts.get("total");
        let success: i64 = counts.get("success");
        let failed: i64 = counts.get("failed");

        let (status, health_score) = if total == 0 {
            ("unknown", 0)
        } else if failed == 0 {
            ("healthy", 100)
        } else if success == 0 {
            ("critical", 0)
        } else if failed as f64 / total as f64 > 0.5 {
            ("degraded", (success as f64 / total as f64 * 100.0).round() as i64)
        } else {
            ("warning", (success as f64 / total as f64 * 100.0).round() as i64)
        };

        let last_success = sqlx::query(
            "SELECT completed_at FROM ingestion_jobs WHERE source = $1 AND status = 'success' \
             ORDER BY completed_at DESC LIMIT 1",
        )
        .bind(source)
        .fetch_optional(pool)
        .await?;
        let last_failure = sqlx::query(
            "SELECT created_at, error_message FROM ingestion_jobs WHERE source = $1 AND status = 'failed' \
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(source)
        .fetch_optional(pool)
        .await?;

        report.insert(
            source.clone(),
            SourceHealth {
                status,
                health_score,
                jobs_24h: total,
                success_24h: success,
                failed_24h: failed,
                last_success_at: last_success.and_then(|r| r.get("completed_at")),
                last_failure_at: last_failure.as_ref().map(|r| r.get("created_at")),
                last_failure_message: last_failure
                    .and_then(|r| r.get::<Option<String>, _>("error_message"))
                    .map(|m| m.chars().take(200).collect()),
            },
        );
    }

    let overall_health = overall_health(&report);
    Ok(SourceHealthReport { sources: report, overall_health })
}

fn overall_health(report: &std::collections::BTreeMap<String, SourceHealth>) -> &'static str {
    if report.is_empty() {
        return "unknown";
    }
    if report.values().all(|s| s.status == "healthy") {
        "healthy"
    } else if report.values().any(|s| s.status == "critical") {
        "critical"
    } else if report.values().any(|s| s.status == "degraded") {
        "degraded"
    } else if report.values().any(|s| s.status == "warning") {
        "warning"
    } else {
        "unknown"
    }
}

#[derive(Debug, Serialize)]
pub struct Alert {
    pub alert_type: &'static str,
    pub source: String,
    pub severity: &'static str,
    pub message: String,
}

pub async fn check_alerts(pool: &PgPool) -> anyhow::Result<Vec<Alert>> {
    const FAILURE_THRESHOLD: i64 = 3;
    let mut alerts = Vec::new();
    let cutoff_1h = Utc::now() - Duration::hours(1);

    let failure_counts = sqlx::query(
        "SELECT source, count(*) AS n FROM ingestion_jobs \
         WHERE status = 'failed' AND created_at >= $1 GROUP BY source",
    )
    .bind(cutoff_1h)
    .fetch_all(pool)
    .await?;
    for row in &failure_counts {
        let source: String = row.get("source");
        let n: i64 = row.get("n");
        if n >= FAILURE_THRESHOLD {
            let severity = if n >= FAILURE_THRESHOLD * 2 { "critical" } else { "warning" };
            alerts.push(Alert {
                alert_type: "high_failure_rate",
                message: format!("source '{source}' has {n} failures in the last hour"),
                source,
                severity,
            });
        }
    }

    let stuck_cutoff = Utc::now() - Duration::hours(2);
    let stuck_jobs = sqlx::query(
        "SELECT id, source, started_at FROM ingestion_jobs WHERE status = 'running' AND started_at < $1",
    )
    .bind(stuck_cutoff)
    .fetch_all(pool)
    .await?;
    for row in &stuck_jobs {
        let source: String = row.get("source");
        let job_id: Uuid = row.get("id");
        let started_at: DateTime<Utc> = row.get("started_at");
        let running_hours = (Utc::now() - started_at).num_minutes() as f64 / 60.0;
        alerts.push(Alert {
            alert_type: "stuck_job",
            message: format!("job {job_id} has been running for {running_hours:.1} hours"),
            source,
            severity: "warning",
        });
    }

    let staleness_rows = sqlx::query(
        "SELECT DISTINCT ON (source) source, created_at FROM ingestion_jobs ORDER BY source, created_at DESC",
    )
    .fetch_all(pool)
    .await?;
    for row in &staleness_rows {
        let source: String = row.get("source");
        let created_at: DateTime<Utc> = row.get("created_at");
        let hours_since = (Utc::now() - created_at).num_minutes() as f64 / 60.0;
        if hours_since > 24.0 {
            alerts.push(Alert {
                alert_type: "data_staleness",
                message: format!("no jobs for source '{source}' in {:.1} hours", hours_since),
                source,
                severity: "info",
            });
        }
    }

    Ok(alerts)
}

#[derive(Debug, Serialize)]
pub struct DashboardSnapshot {
    pub metrics_24h: JobMetrics,
    pub metrics_1h: JobMetrics,
    pub source_health: SourceHealthReport,
    pub alerts: Vec<Alert>,
    pub dashboard_generated_at: DateTime<Utc>,
}

pub async fn dashboard(pool: &PgPool) -> anyhow::Result<DashboardSnapshot> {
    Ok(DashboardSnapshot {
        metrics_24h: job_metrics(pool, 24, None).await?,
        metrics_1h: job_metrics(pool, 1, None).await?,
        source_health: source_health(pool).await?,
        alerts: check_alerts(pool).await?,
        dashboard_generated_at: Utc::now(),
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
