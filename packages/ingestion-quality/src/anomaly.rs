//! Anomaly Detector: flags numeric values whose z-score against a
//! column's profiled mean/stddev exceeds a threshold. Distinct from the
//! Rule Evaluator's RANGE rule — a range is a fixed, seeded bound; this
//! recomputes against whatever profile is passed in, so it catches drift
//! a stale seeded rule would miss.

use chrono::{DateTime, Utc};
use warehouse::{Row, Value};

use crate::types::{AlertStatus, ProfileColumn, ProfileSnapshot};

const DEFAULT_Z_SCORE_THRESHOLD: f64 = 3.0;

/// Minimum number of prior snapshots [`detect_drift`] needs before it will
/// flag anything — one snapshot is noise, not a trend.
pub const MIN_HISTORY_FOR_DRIFT: usize = 3;

/// Relative change beyond which `row_count`/`null_pct`/`distinct_count`
/// drift is considered statistically significant rather than normal
/// day-to-day variation.
const DRIFT_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone)]
pub struct Anomaly {
    pub row_index: usize,
    pub column: String,
    pub value: f64,
    pub z_score: f64,
}

/// A flagged deviation between a table's current profile and its recent
/// history — row-count/null-rate/cardinality drift, or a schema change
/// (a column appearing or disappearing between snapshots).
#[derive(Debug, Clone)]
pub struct AnomalyAlert {
    pub table_name: String,
    pub alert_type: String,
    pub status: AlertStatus,
    pub detail: String,
    pub detected_at: DateTime<Utc>,
}

/// Compares `current` against its `history` (most recent first; only the
/// most recent [`MIN_HISTORY_FOR_DRIFT`] are used). Flags row_count,
/// null_pct, and distinct_count drift beyond [`DRIFT_THRESHOLD`] relative
/// change from the historical average, plus any column present in one but
/// not the other.
pub fn detect_drift(current: &ProfileSnapshot, history: &[ProfileSnapshot]) -> Vec<AnomalyAlert> {
    if history.len() < MIN_HISTORY_FOR_DRIFT {
        return Vec::new();
    }
    let recent = &history[..MIN_HISTORY_FOR_DRIFT];
    let mut alerts = Vec::new();

    let avg_row_count = mean(recent.iter().map(|s| s.row_count as f64));
    if let Some(alert) = drift_alert(current, "row_count", current.row_count as f64, avg_row_count) {
        alerts.push(alert);
    }

    for column in &current.columns {
        let historical: Vec<&ProfileColumn> = recent
            .iter()
            .filter_map(|s| s.columns.iter().find(|c| c.column_name == column.column_name))
            .collect();
        if historical.len() < recent.len() {
            alerts.push(AnomalyAlert {
                table_name: current.table_name.clone(),
                alert_type: "schema_change".to_string(),
                status: AlertStatus::Open,
                detail: format!("column {} is new since the last {} snapshots", column.column_name, recent.len()),
                detected_at: current.profiled_at,
            });
            continue;
        }
        let avg_null_pct = mean(historical.iter().map(|c| c.null_pct));
        if let Some(alert) = drift_alert(
            current,
            &format!("{}.null_pct", column.column_name),
            column.null_pct,
            avg_null_pct,
        ) {
            alerts.push(alert);
        }
        let avg_distinct = mean(historical.iter().map(|c| c.distinct_count as f64));
        if let Some(alert) = drift_alert(
            current,
            &format!("{}.distinct_count", column.column_name),
            column.distinct_count as f64,
            avg_distinct,
        ) {
            alerts.push(alert);
        }
    }

    for snapshot in recent {
        for column in &snapshot.columns {
            if !current.columns.iter().any(|c| c.column_name == column.column_name) {
                alerts.push(AnomalyAlert {
                    table_name: current.table_name.clone(),
                    alert_type: "schema_change".to_string(),
                    status: AlertStatus::Open,
                    detail: format!("column {} disappeared from the latest snapshot", column.column_name),
                    detected_at: current.profiled_at,
                });
            }
        }
    }

    alerts
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let values: Vec<f64> = values.collect();
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn drift_alert(current: &ProfileSnapshot, metric: &str, value: f64, baseline: f64) -> Option<AnomalyAlert> {
    if baseline == 0.0 {
        return None;
    }
    let relative_change = (value - baseline).abs() / baseline;
    let relative_change_pct = relative_change * 100.0;
    (relative_change > DRIFT_THRESHOLD).then(|| AnomalyAlert {
        table_name: current.table_name.clone(),
        alert_type: "drift".to_string(),
        status: AlertStatus::Open,
        detail: format!(
            "{metric} drifted {relative_change_pct:.0}% from its {}-snapshot average ({baseline:.2} -> {value:.2})",
            MIN_HISTORY_FOR_DRIFT
        ),
        detected_at: current.profiled_at,
    })
}

pub fn detect(column: &ProfileColumn, rows: &[Row]) -> Vec<Anomaly> {
    detect_with_threshold(column, rows, DEFAULT_Z_SCORE_THRESHOLD)
}

pub fn detect_with_threshold(column: &ProfileColumn, rows: &[Row], threshold: f64) -> Vec<Anomaly> {
    let (Some(mean), Some(stddev)) = (column.mean, column.stddev) else { return Vec::new() };
    if stddev <= 0.0 {
        return Vec::new();
    }

    rows.iter()
        .enumerate()
        .filter_map(|(i, row)| {
            let value = match row.get(&column.column_name)? {
                Value::Integer(n) => *n as f64,
                Value::Number(n) => *n,
                _ => return None,
            };
            let z_score = (value - mean) / stddev;
            (z_score.abs() > threshold).then(|| Anomaly {
                row_index: i,
                column: column.column_name.clone(),
                value,
                z_score,
            })
        })
        .collect()
}
