//! `DatasetRegistry`: the catalog of tables the Provisioner has created,
//! upserted every time `prepare` runs so the dashboard and Collection
//! Orchestrator can discover what exists without scanning `information_schema`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::WarehouseResult;
use crate::schema::SchemaSpec;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DatasetRegistryEntry {
    pub table_name: String,
    pub source: String,
    pub column_count: i32,
    pub unique_key: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct DatasetRegistry {
    pool: PgPool,
}

impl DatasetRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn upsert(&self, source: &str, spec: &SchemaSpec) -> WarehouseResult<()> {
        sqlx::query(
            r#"
            INSERT INTO dataset_registry (table_name, source, column_count, unique_key, created_at, updated_at)
            VALUES ($1, $2, $3, $4, now(), now())
            ON CONFLICT (table_name) DO UPDATE SET
                source = EXCLUDED.source,
                column_count = EXCLUDED.column_count,
                unique_key = EXCLUDED.unique_key,
                updated_at = now()
            "#,
        )
        .bind(&spec.table_name)
        .bind(source)
        .bind(spec.columns.len() as i32)
        .bind(serde_json::to_value(&spec.unique_key)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get(&self, table_name: &str) -> WarehouseResult<Option<DatasetRegistryEntry>> {
        let entry = sqlx::query_as::<_, DatasetRegistryEntry>(
            "SELECT table_name, source, column_count, unique_key, created_at, updated_at FROM dataset_registry WHERE table_name = $1",
        )
        .bind(table_name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(entry)
    }

    pub async fn list_by_source(&self, source: &str) -> WarehouseResult<Vec<DatasetRegistryEntry>> {
        let entries = sqlx::query_as::<_, DatasetRegistryEntry>(
            "SELECT table_name, source, column_count, unique_key, created_at, updated_at FROM dataset_registry WHERE source = $1 ORDER BY table_name",
        )
        .bind(source)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }
}
