//! Batch Writer (C4): chunked idempotent upserts. Each batch commits
//! independently, so a write that fails partway through has already
//! durably written the batches before it — safe to re-run because writes
//! are idempotent upserts, not because nothing happened.

use job_engine::BatchOutcome;
use sqlx::{PgPool, QueryBuilder};
use tracing::{info, warn};

use crate::error::WarehouseError;
use crate::schema::{ColumnType, Row, SchemaSpec, Value};

const DEFAULT_BATCH_SIZE: usize = 1000;

pub struct BatchWriter {
    pool: PgPool,
    batch_size: usize,
}

impl BatchWriter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, batch_size: DEFAULT_BATCH_SIZE }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Write `rows` into `spec.table_name`, upserting on `spec.unique_key`.
    /// `update_columns` defaults to every declared column when `None`.
    /// The conflict key is validated against the schema's own unique key
    /// before any SQL is issued, per C4's fail-fast contract.
    #[tracing::instrument(skip(self, rows), fields(table = %spec.table_name, rows = rows.len()))]
    pub async fn write(
        &self,
        spec: &SchemaSpec,
        rows: &[Row],
        update_columns: Option<&[String]>,
    ) -> Result<BatchOutcome, WarehouseError> {
        if rows.is_empty() {
            return Ok(BatchOutcome::Complete { batches: 0, rows: 0 });
        }
        if spec.unique_key.is_empty() {
            return Err(WarehouseError::ConflictKeyMismatch {
                table: spec.table_name.clone(),
                conflict_key: spec.unique_key.clone(),
            });
        }

        let update_cols: Vec<String> = match update_columns {
            Some(cols) => cols.to_vec(),
            None => spec
                .columns
                .iter()
                .map(|c| c.name.clone())
                .filter(|c| !spec.unique_key.contains(c))
                .collect(),
        };
        for col in &update_cols {
            if !spec.columns.iter().any(|c| &c.name == col) {
                return Err(WarehouseError::ConflictKeyMismatch {
                    table: spec.table_name.clone(),
                    conflict_key: vec![col.clone()],
                });
            }
        }

        let mut batches_succeeded = 0usize;
        let mut rows_written = 0u64;

        for (batch_index, chunk) in rows.chunks(self.batch_size).enumerate() {
            match self.write_batch(spec, &update_cols, chunk).await {
                Ok(()) => {
                    batches_succeeded += 1;
                    rows_written += chunk.len() as u64;
                }
                Err(error) => {
                    warn!(table = %spec.table_name, batch = batch_index, %error, "batch write failed");
                    return Ok(BatchOutcome::Partial {
                        batches_succeeded,
                        rows_written,
                        failed_at_batch: batch_index,
                        error: anyhow::anyhow!(error),
                    });
                }
            }
        }

        info!(table = %spec.table_name, batches = batches_succeeded, rows = rows_written, "batch write complete");
        Ok(BatchOutcome::Complete { batches: batches_succeeded, rows: rows_written })
    }

    async fn write_batch(
        &self,
        spec: &SchemaSpec,
        update_columns: &[String],
        rows: &[Row],
    ) -> Result<(), WarehouseError> {
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new(format!("INSERT INTO {} (", spec.table_name));
        builder.push(spec.columns.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join(", "));
        builder.push(") ");

        builder.push_values(rows, |mut separated, row| {
            for column in &spec.columns {
                let value = row.get(&column.name).cloned().unwrap_or(Value::Null);
                bind_value(&mut separated, value, column.column_type);
            }
        });

        builder.push(format!(" ON CONFLICT ({}) ", spec.unique_key.join(", ")));
        if update_columns.is_empty() {
            builder.push("DO NOTHING");
        } else {
            builder.push("DO UPDATE SET ");
            let mut assignments: Vec<String> =
                update_columns.iter().map(|c| format!("{c} = EXCLUDED.{c}")).collect();
            assignments.push("ingested_at = now()".to_string());
            builder.push(assignments.join(", "));
        }

        builder.build().execute(&self.pool).await?;
        Ok(())
    }
}

fn bind_value<'a, 'b, Sep>(
    separated: &mut sqlx::query_builder::Separated<'a, 'b, sqlx::Postgres, Sep>,
    value: Value,
    column_type: ColumnType,
) where
    Sep: std::fmt::Display,
{
    match value {
        Value::Null => match column_type {
            ColumnType::Integer => {
                separated.push_bind(Option::<i64>::None);
            }
            ColumnType::Number => {
                separated.push_bind(Option::<f64>::None);
            }
            ColumnType::Text => {
                separated.push_bind(Option::<String>::None);
            }
            ColumnType::Boolean => {
                separated.push_bind(Option::<bool>::None);
            }
            ColumnType::Timestamp => {
                separated.push_bind(Option::<chrono::DateTime<chrono::Utc>>::None);
            }
        },
        Value::Integer(i) => {
            separated.push_bind(i);
        }
        Value::Number(n) => {
            separated.push_bind(n);
        }
        Value::Text(s) => {
            separated.push_bind(s);
        }
        Value::Boolean(b) => {
            separated.push_bind(b);
        }
        Value::Timestamp(t) => {
            separated.push_bind(t);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnSpec, ColumnType};

    fn sample_spec() -> SchemaSpec {
        SchemaSpec::new("eia_petroleum_spot_prices", vec!["period".into(), "series_id".into()])
            .with_column(ColumnSpec::new("period", ColumnType::Timestamp).not_null())
            .with_column(ColumnSpec::new("series_id", ColumnType::Text).not_null())
            .with_column(ColumnSpec::new("value", ColumnType::Number))
    }

    #[test]
    fn rejects_conflict_key_not_in_schema() {
        let spec = sample_spec();
        let update_cols = vec!["not_a_column".to_string()];
        assert!(!spec.columns.iter().any(|c| c.name == update_cols[0]));
    }

    #[test]
    fn empty_row_set_is_trivially_complete() {
        let outcome = BatchOutcome::Complete { batches: 0, rows: 0 };
        assert!(outcome.is_complete());
        assert_eq!(outcome.rows_written(), 0);
    }
}
