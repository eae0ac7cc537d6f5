//! Cross-Source Validator: compares the same entity collected from two
//! different sources and flags fields that disagree, surfacing ingestion
//! bugs and upstream data drift a single-source profile can't see.

use std::collections::HashMap;

use warehouse::{Row, Value};

#[derive(Debug, Clone)]
pub struct CrossSourceMismatch {
    pub key: String,
    pub column: String,
    pub left_source: String,
    pub right_source: String,
    pub left_value: String,
    pub right_value: String,
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Text(s) => s.clone(),
        Value::Boolean(b) => b.to_string(),
        Value::Timestamp(t) => t.to_rfc3339(),
    }
}

/// Compare two sources' rows for the same set of entities, keyed by
/// `key_fn`. Only columns present on both sides are compared; a column
/// missing entirely on one side is not a mismatch (the sources simply
/// don't both carry it).
pub fn compare(
    left_source: &str,
    left_rows: &[Row],
    right_source: &str,
    right_rows: &[Row],
    key_fn: impl Fn(&Row) -> Option<String>,
) -> Vec<CrossSourceMismatch> {
    let right_by_key: HashMap<String, &Row> =
        right_rows.iter().filter_map(|row| key_fn(row).map(|k| (k, row))).collect();

    let mut mismatches = Vec::new();
    for left_row in left_rows {
        let Some(key) = key_fn(left_row) else { continue };
        let Some(right_row) = right_by_key.get(&key) else { continue };

        for (column, left_value) in left_row {
            let Some(right_value) = right_row.get(column) else { continue };
            if matches!(left_value, Value::Null) || matches!(right_value, Value::Null) {
                continue;
            }
            if left_value != right_value {
                mismatches.push(CrossSourceMismatch {
                    key: key.clone(),
                    column: column.clone(),
                    left_source: left_source.to_string(),
                    right_source: right_source.to_string(),
                    left_value: display_value(left_value),
                    right_value: display_value(right_value),
                });
            }
        }
    }
    mismatches
}
