//! Quality Pipeline persistence: provisions its own tables at runtime via
//! the Table Provisioner (C3), the same pattern `ingestion-collection`
//! uses for `collected_items`, since these tables are owned by this crate
//! rather than part of the engine's bootstrap migration.
//!
//! `quality_profile_snapshots` and `quality_anomaly_alerts` are append-only
//! logs: each row's `unique_key` is a fresh UUID, so the Batch Writer's
//! `ON CONFLICT DO NOTHING` upsert behaves as a plain insert and history
//! accumulates instead of being overwritten.

use sqlx::PgPool;
use uuid::Uuid;
use warehouse::{BatchWriter, ColumnSpec, ColumnType, Provisioner, Row, SchemaSpec, Value, WarehouseResult};

use crate::anomaly::AnomalyAlert;
use crate::types::{AlertStatus, ProfileSnapshot, QualityRule, RuleSeverity, RuleType};

pub struct QualityStore {
    pool: PgPool,
    provisioner: Provisioner,
    writer: BatchWriter,
}

impl QualityStore {
    pub fn new(pool: PgPool) -> Self {
        let provisioner = Provisioner::new(pool.clone());
        let writer = BatchWriter::new(pool.clone());
        Self { pool, provisioner, writer }
    }

    fn snapshots_schema() -> SchemaSpec {
        SchemaSpec::new("quality_profile_snapshots", vec!["snapshot_id".into()])
            .with_column(ColumnSpec::new("snapshot_id", ColumnType::Text).not_null())
            .with_column(ColumnSpec::new("table_name", ColumnType::Text).not_null())
            .with_column(ColumnSpec::new("source", ColumnType::Text).not_null())
            .with_column(ColumnSpec::new("row_count", ColumnType::Integer).not_null())
            .with_column(ColumnSpec::new("columns", ColumnType::Text).not_null())
            .with_column(ColumnSpec::new("profiled_at", ColumnType::Timestamp).not_null())
            .with_index("quality_profile_snapshots_table_idx", vec!["table_name".into()])
    }

    fn rules_schema() -> SchemaSpec {
        SchemaSpec::new("quality_rules", vec!["name".into()])
            .with_column(ColumnSpec::new("name", ColumnType::Text).not_null())
            .with_column(ColumnSpec::new("description", ColumnType::Text).not_null())
            .with_column(ColumnSpec::new("source", ColumnType::Text).not_null())
            .with_column(ColumnSpec::new("dataset_pattern", ColumnType::Text).not_null())
            .with_column(ColumnSpec::new("column_name", ColumnType::Text))
            .with_column(ColumnSpec::new("rule_type", ColumnType::Text).not_null())
            .with_column(ColumnSpec::new("severity", ColumnType::Text).not_null())
            .with_column(ColumnSpec::new("parameters", ColumnType::Text).not_null())
            .with_column(ColumnSpec::new("auto_generated", ColumnType::Boolean).not_null())
    }

    fn alerts_schema() -> SchemaSpec {
        SchemaSpec::new("quality_anomaly_alerts", vec!["alert_id".into()])
            .with_column(ColumnSpec::new("alert_id", ColumnType::Text).not_null())
            .with_column(ColumnSpec::new("table_name", ColumnType::Text).not_null())
            .with_column(ColumnSpec::new("alert_type", ColumnType::Text).not_null())
            .with_column(ColumnSpec::new("status", ColumnType::Text).not_null())
            .with_column(ColumnSpec::new("detail", ColumnType::Text).not_null())
            .with_column(ColumnSpec::new("detected_at", ColumnType::Timestamp).not_null())
            .with_index("quality_anomaly_alerts_table_idx", vec!["table_name".into()])
    }

    pub async fn persist_snapshot(&self, snapshot: &ProfileSnapshot) -> WarehouseResult<()> {
        let schema = Self::snapshots_schema();
        self.provisioner.prepare("quality", &schema).await?;

        let mut row = Row::new();
        row.insert("snapshot_id".to_string(), Value::Text(Uuid::new_v4().to_string()));
        row.insert("table_name".to_string(), Value::Text(snapshot.table_name.clone()));
        row.insert("source".to_string(), Value::Text(snapshot.source.clone()));
        row.insert("row_count".to_string(), Value::Integer(snapshot.row_count as i64));
        row.insert(
            "columns".to_string(),
            Value::Text(serde_json::to_string(&snapshot.columns).unwrap_or_default()),
        );
        row.insert("profiled_at".to_string(), Value::Timestamp(snapshot.profiled_at));

        self.writer.write(&schema, &[row], None).await?;
        Ok(())
    }

    /// Snapshots for `table_name` older than `before`, newest first,
    /// capped at `limit` — the history [`crate::anomaly::detect_drift`]
    /// compares the just-persisted current snapshot against.
    pub async fn recent_snapshots(
        &self,
        table_name: &str,
        before: chrono::DateTime<chrono::Utc>,
        limit: i64,
    ) -> WarehouseResult<Vec<ProfileSnapshot>> {
        self.provisioner.prepare("quality", &Self::snapshots_schema()).await?;

        let rows = sqlx::query_as::<_, (String, String, i64, String, chrono::DateTime<chrono::Utc>)>(
            "SELECT table_name, source, row_count, columns, profiled_at FROM quality_profile_snapshots \
             WHERE table_name = $1 AND profiled_at < $2 ORDER BY profiled_at DESC LIMIT $3",
        )
        .bind(table_name)
        .bind(before)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(table_name, source, row_count, columns, profiled_at)| {
                let columns = serde_json::from_str(&columns).ok()?;
                Some(ProfileSnapshot { table_name, source, row_count: row_count.max(0) as usize, columns, profiled_at })
            })
            .collect())
    }

    /// Names of rules already seeded for `table_name`, so
    /// [`crate::seeder::seed_rules`] stays idempotent across pipeline runs.
    pub async fn existing_rule_names(&self, table_name: &str) -> WarehouseResult<std::collections::HashSet<String>> {
        self.provisioner.prepare("quality", &Self::rules_schema()).await?;

        let pattern = format!("^{}$", regex::escape(table_name));
        let names = sqlx::query_scalar::<_, String>("SELECT name FROM quality_rules WHERE dataset_pattern = $1")
            .bind(&pattern)
            .fetch_all(&self.pool)
            .await?;
        Ok(names.into_iter().collect())
    }

    pub async fn persist_rules(&self, rules: &[QualityRule]) -> WarehouseResult<()> {
        if rules.is_empty() {
            return Ok(());
        }
        let schema = Self::rules_schema();
        self.provisioner.prepare("quality", &schema).await?;

        let rows: Vec<Row> = rules.iter().map(rule_to_row).collect();
        self.writer.write(&schema, &rows, None).await?;
        Ok(())
    }

    /// All rules (auto-seeded and hand-authored) whose `dataset_pattern`
    /// matches `table_name`, for [`crate::evaluator::evaluate`].
    pub async fn rules_for(&self, table_name: &str) -> WarehouseResult<Vec<QualityRule>> {
        self.provisioner.prepare("quality", &Self::rules_schema()).await?;

        #[allow(clippy::type_complexity)]
        let rows = sqlx::query_as::<_, (String, String, String, String, Option<String>, String, String, String, bool)>(
            "SELECT name, description, source, dataset_pattern, column_name, rule_type, severity, \
             parameters, auto_generated FROM quality_rules",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(name, description, source, dataset_pattern, column_name, rule_type, severity, parameters, auto_generated)| {
                let re = regex::Regex::new(&dataset_pattern).ok()?;
                if !re.is_match(table_name) {
                    return None;
                }
                Some(QualityRule {
                    name,
                    description,
                    source,
                    dataset_pattern,
                    column_name,
                    rule_type: parse_rule_type(&rule_type)?,
                    severity: parse_severity(&severity)?,
                    parameters: serde_json::from_str(&parameters).ok()?,
                    auto_generated,
                })
            })
            .collect())
    }

    pub async fn persist_alerts(&self, alerts: &[AnomalyAlert]) -> WarehouseResult<()> {
        if alerts.is_empty() {
            return Ok(());
        }
        let schema = Self::alerts_schema();
        self.provisioner.prepare("quality", &schema).await?;

        let rows: Vec<Row> = alerts.iter().map(alert_to_row).collect();
        self.writer.write(&schema, &rows, None).await?;
        Ok(())
    }
}

fn rule_to_row(rule: &QualityRule) -> Row {
    let mut row = Row::new();
    row.insert("name".to_string(), Value::Text(rule.name.clone()));
    row.insert("description".to_string(), Value::Text(rule.description.clone()));
    row.insert("source".to_string(), Value::Text(rule.source.clone()));
    row.insert("dataset_pattern".to_string(), Value::Text(rule.dataset_pattern.clone()));
    row.insert("column_name".to_string(), rule.column_name.clone().map(Value::Text).unwrap_or(Value::Null));
    row.insert("rule_type".to_string(), Value::Text(rule_type_str(rule.rule_type).to_string()));
    row.insert("severity".to_string(), Value::Text(severity_str(rule.severity).to_string()));
    row.insert("parameters".to_string(), Value::Text(rule.parameters.to_string()));
    row.insert("auto_generated".to_string(), Value::Boolean(rule.auto_generated));
    row
}

fn alert_to_row(alert: &AnomalyAlert) -> Row {
    let mut row = Row::new();
    row.insert("alert_id".to_string(), Value::Text(Uuid::new_v4().to_string()));
    row.insert("table_name".to_string(), Value::Text(alert.table_name.clone()));
    row.insert("alert_type".to_string(), Value::Text(alert.alert_type.clone()));
    row.insert("status".to_string(), Value::Text(status_str(alert.status).to_string()));
    row.insert("detail".to_string(), Value::Text(alert.detail.clone()));
    row.insert("detected_at".to_string(), Value::Timestamp(alert.detected_at));
    row
}

fn rule_type_str(rule_type: RuleType) -> &'static str {
    match rule_type {
        RuleType::RowCount => "ROW_COUNT",
        RuleType::NotNull => "NOT_NULL",
        RuleType::Range => "RANGE",
        RuleType::Enum => "ENUM",
        RuleType::Regex => "REGEX",
        RuleType::Freshness => "FRESHNESS",
    }
}

fn parse_rule_type(s: &str) -> Option<RuleType> {
    match s {
        "ROW_COUNT" => Some(RuleType::RowCount),
        "NOT_NULL" => Some(RuleType::NotNull),
        "RANGE" => Some(RuleType::Range),
        "ENUM" => Some(RuleType::Enum),
        "REGEX" => Some(RuleType::Regex),
        "FRESHNESS" => Some(RuleType::Freshness),
        _ => None,
    }
}

fn severity_str(severity: RuleSeverity) -> &'static str {
    match severity {
        RuleSeverity::Info => "info",
        RuleSeverity::Warning => "warning",
        RuleSeverity::Error => "error",
    }
}

fn parse_severity(s: &str) -> Option<RuleSeverity> {
    match s {
        "info" => Some(RuleSeverity::Info),
        "warning" => Some(RuleSeverity::Warning),
        "error" => Some(RuleSeverity::Error),
        _ => None,
    }
}

fn status_str(status: AlertStatus) -> &'static str {
    match status {
        AlertStatus::Open => "open",
        AlertStatus::Acknowledged => "acknowledged",
        AlertStatus::Resolved => "resolved",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_type_round_trips_through_its_text_encoding() {
        for rule_type in [
            RuleType::RowCount,
            RuleType::NotNull,
            RuleType::Range,
            RuleType::Enum,
            RuleType::Regex,
            RuleType::Freshness,
        ] {
            assert_eq!(parse_rule_type(rule_type_str(rule_type)), Some(rule_type));
        }
    }

    #[test]
    fn severity_round_trips_through_its_text_encoding() {
        for severity in [RuleSeverity::Info, RuleSeverity::Warning, RuleSeverity::Error] {
            assert_eq!(parse_severity(severity_str(severity)), Some(severity));
        }
    }

    #[test]
    fn unknown_rule_type_text_fails_to_parse() {
        assert_eq!(parse_rule_type("NOT_A_RULE_TYPE"), None);
    }
}
