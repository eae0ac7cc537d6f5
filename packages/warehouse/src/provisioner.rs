//! Table Provisioner (C3): idempotent `CREATE TABLE IF NOT EXISTS` plus
//! declared indexes, grounded in the teacher's raw-`sqlx::query` storage
//! style since column sets are only known at runtime from each adapter's
//! schema.

use sqlx::PgPool;
use tracing::info;

use crate::error::{WarehouseError, WarehouseResult};
use crate::registry::DatasetRegistry;
use crate::schema::SchemaSpec;

pub struct Provisioner {
    pool: PgPool,
    registry: DatasetRegistry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrepareOutcome {
    pub created: bool,
}

impl Provisioner {
    pub fn new(pool: PgPool) -> Self {
        let registry = DatasetRegistry::new(pool.clone());
        Self { pool, registry }
    }

    /// Idempotent `CREATE TABLE IF NOT EXISTS` plus declared indexes, then
    /// step 3 of §4.3: upsert `spec` into the [`DatasetRegistry`] under
    /// `source` so `last_updated_at` is refreshed on every ingest, not
    /// just the first one that creates the table.
    #[tracing::instrument(skip(self, spec), fields(table = %spec.table_name))]
    pub async fn prepare(&self, source: &str, spec: &SchemaSpec) -> WarehouseResult<PrepareOutcome> {
        if spec.columns.is_empty() {
            return Err(WarehouseError::InvalidSchema(format!(
                "{} declares no columns",
                spec.table_name
            )));
        }
        for key_col in &spec.unique_key {
            if !spec.columns.iter().any(|c| &c.name == key_col) {
                return Err(WarehouseError::InvalidSchema(format!(
                    "unique_key column {key_col} is not among {}'s declared columns",
                    spec.table_name
                )));
            }
        }

        let existed = self.table_exists(&spec.table_name).await?;

        let mut ddl = format!("CREATE TABLE IF NOT EXISTS {} (\n", spec.table_name);
        ddl.push_str("    id BIGSERIAL PRIMARY KEY,\n");
        for column in &spec.columns {
            let nullability = if column.nullable { "" } else { " NOT NULL" };
            ddl.push_str(&format!(
                "    {} {}{},\n",
                column.name,
                column.column_type.sql_type(),
                nullability
            ));
        }
        ddl.push_str("    ingested_at TIMESTAMPTZ NOT NULL DEFAULT now(),\n");
        ddl.push_str(&format!(
            "    CONSTRAINT {} UNIQUE ({})\n",
            spec.unique_constraint_name(),
            spec.unique_key.join(", ")
        ));
        ddl.push(')');

        sqlx::query(&ddl).execute(&self.pool).await?;

        for index in &spec.indexes {
            let index_sql = format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                index.name,
                spec.table_name,
                index.columns.join(", ")
            );
            sqlx::query(&index_sql).execute(&self.pool).await?;
        }

        if !existed {
            info!(table = %spec.table_name, columns = spec.columns.len(), "provisioned table");
        }

        self.registry.upsert(source, spec).await?;

        Ok(PrepareOutcome { created: !existed })
    }

    async fn table_exists(&self, table_name: &str) -> WarehouseResult<bool> {
        let row: (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_name = $1)",
        )
        .bind(table_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0)
    }
}
