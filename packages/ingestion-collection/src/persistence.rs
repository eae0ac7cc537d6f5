//! Typed-table persistence for collected items: one shared
//! `collected_items` table (item shapes vary too much per `item_type` to
//! provision one table each), deduplicated on a content hash so a
//! re-collected, unchanged item is a no-op and an item that picked up new
//! fields is an update, not a duplicate row.

use std::collections::{BTreeMap, HashSet};

use sha2::{Digest, Sha256};
use sqlx::PgPool;
use warehouse::{BatchWriter, ColumnSpec, ColumnType, Provisioner, Row, SchemaSpec, Value, WarehouseResult};

use crate::types::CollectedItem;

pub struct CollectionStore {
    pool: PgPool,
    provisioner: Provisioner,
    writer: BatchWriter,
}

impl CollectionStore {
    pub fn new(pool: PgPool) -> Self {
        let provisioner = Provisioner::new(pool.clone());
        let writer = BatchWriter::new(pool.clone());
        Self { pool, provisioner, writer }
    }

    fn schema() -> SchemaSpec {
        SchemaSpec::new("collected_items", vec!["content_hash".into()])
            .with_column(ColumnSpec::new("target_id", ColumnType::Text).not_null())
            .with_column(ColumnSpec::new("item_type", ColumnType::Text).not_null())
            .with_column(ColumnSpec::new("content_hash", ColumnType::Text).not_null())
            .with_column(ColumnSpec::new("source_url", ColumnType::Text))
            .with_column(ColumnSpec::new("confidence", ColumnType::Text).not_null())
            .with_column(ColumnSpec::new("data", ColumnType::Text).not_null())
            .with_index("collected_items_target_idx", vec!["target_id".into()])
    }

    /// Upsert `items` for `target_id`. Sets each item's `is_new` to
    /// whether its content hash existed before this call, so callers can
    /// report `items_new`/`items_updated` accurately.
    pub async fn persist(&self, target_id: &str, items: &mut [CollectedItem]) -> WarehouseResult<()> {
        let schema = Self::schema();
        self.provisioner.prepare("collection", &schema).await?;

        if items.is_empty() {
            return Ok(());
        }

        let hashes: Vec<String> = items.iter().map(content_hash).collect();
        let existing: HashSet<String> =
            sqlx::query_scalar::<_, String>("SELECT content_hash FROM collected_items WHERE content_hash = ANY($1)")
                .bind(&hashes)
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .collect();

        let mut rows = Vec::with_capacity(items.len());
        for (item, hash) in items.iter_mut().zip(hashes.into_iter()) {
            item.is_new = !existing.contains(&hash);

            let mut row = Row::new();
            row.insert("target_id".to_string(), Value::Text(target_id.to_string()));
            row.insert("item_type".to_string(), Value::Text(item.item_type.clone()));
            row.insert("content_hash".to_string(), Value::Text(hash));
            row.insert(
                "source_url".to_string(),
                item.source_url.clone().map(Value::Text).unwrap_or(Value::Null),
            );
            row.insert("confidence".to_string(), Value::Text(confidence_label(item)));
            row.insert("data".to_string(), Value::Text(serde_json::to_string(&item.data).unwrap_or_default()));
            rows.push(row);
        }

        self.writer.write(&schema, &rows, None).await?;
        Ok(())
    }
}

fn confidence_label(item: &CollectedItem) -> String {
    match item.confidence {
        crate::types::Confidence::High => "high".to_string(),
        crate::types::Confidence::Medium => "medium".to_string(),
        crate::types::Confidence::Low => "low".to_string(),
    }
}

/// Deterministic content hash: `item_type` plus `data` with keys sorted,
/// so the same logical item hashes identically across collection runs
/// regardless of the originating `HashMap`'s iteration order.
fn content_hash(item: &CollectedItem) -> String {
    let sorted: BTreeMap<&String, &serde_json::Value> = item.data.iter().collect();
    let payload = format!("{}:{}", item.item_type, serde_json::to_string(&sorted).unwrap_or_default());
    hex::encode(Sha256::digest(payload.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_across_key_insertion_order() {
        let mut a_data = std::collections::HashMap::new();
        a_data.insert("company_name".to_string(), serde_json::json!("Acme"));
        a_data.insert("sector".to_string(), serde_json::json!("Fintech"));
        let a = CollectedItem::new("portfolio_company", a_data);

        let mut b_data = std::collections::HashMap::new();
        b_data.insert("sector".to_string(), serde_json::json!("Fintech"));
        b_data.insert("company_name".to_string(), serde_json::json!("Acme"));
        let b = CollectedItem::new("portfolio_company", b_data);

        assert_eq!(content_hash(&a), content_hash(&b));
    }
}
