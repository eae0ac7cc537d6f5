//! Canonical row/value types and the schema shape the Table Provisioner
//! turns into `CREATE TABLE` statements.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single cell. `BTreeMap` keeps column order deterministic so generated
/// SQL (and its parameter binding order) is reproducible across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    Null,
    Integer(i64),
    Number(f64),
    Text(String),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
}

/// A parsed record, keyed by normalized column name.
pub type Row = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Integer,
    Number,
    Text,
    Boolean,
    Timestamp,
}

impl ColumnType {
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Integer => "BIGINT",
            ColumnType::Number => "DOUBLE PRECISION",
            ColumnType::Text => "TEXT",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Timestamp => "TIMESTAMPTZ",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self { name: normalize_column_name(&name.into()), column_type, nullable: true }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    pub columns: Vec<String>,
}

/// The schema an adapter declares for its target table. The Provisioner
/// turns this into `CREATE TABLE IF NOT EXISTS` plus `CREATE INDEX IF NOT
/// EXISTS` per declared index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaSpec {
    pub table_name: String,
    pub columns: Vec<ColumnSpec>,
    /// Column names forming the table's named UNIQUE constraint.
    pub unique_key: Vec<String>,
    pub indexes: Vec<IndexSpec>,
}

impl SchemaSpec {
    pub fn new(table_name: impl Into<String>, unique_key: Vec<String>) -> Self {
        Self {
            table_name: normalize_table_name(&table_name.into()),
            columns: Vec::new(),
            unique_key: unique_key.iter().map(|c| normalize_column_name(c)).collect(),
            indexes: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: ColumnSpec) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_index(mut self, name: impl Into<String>, columns: Vec<String>) -> Self {
        self.indexes.push(IndexSpec { name: name.into(), columns });
        self
    }

    pub fn unique_constraint_name(&self) -> String {
        format!("{}_unique_key", self.table_name)
    }
}

/// Table naming convention: `{source}_{category}_{subcategory}`,
/// normalized and lowercased. Deterministic given the same inputs.
pub fn table_name(source: &str, category: &str, subcategory: &str) -> String {
    let raw = format!("{source}_{category}_{subcategory}");
    normalize_table_name(&raw)
}

fn normalize_table_name(raw: &str) -> String {
    normalize_identifier(raw)
}

/// lowercase -> replace `[^a-z0-9_]` with `_` -> prefix `col_` if it starts
/// with a digit -> suffix `_col` if the result is a reserved SQL keyword.
pub fn normalize_column_name(raw: &str) -> String {
    let normalized = normalize_identifier(raw);
    let normalized = if normalized.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        format!("col_{normalized}")
    } else {
        normalized
    };
    if is_reserved_keyword(&normalized) {
        format!("{normalized}_col")
    } else {
        normalized
    }
}

fn normalize_identifier(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

const RESERVED_KEYWORDS: &[&str] = &[
    "select", "insert", "update", "delete", "table", "from", "where", "group", "order", "limit",
    "offset", "join", "user", "primary", "foreign", "key", "references", "grant", "all", "any",
    "check", "column", "constraint", "default", "index", "null", "unique", "analyze", "cast",
];

fn is_reserved_keyword(s: &str) -> bool {
    RESERVED_KEYWORDS.contains(&s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_special_characters() {
        assert_eq!(normalize_column_name("Total $ Amount"), "total___amount");
    }

    #[test]
    fn prefixes_when_leading_digit() {
        assert_eq!(normalize_column_name("2024_value"), "col_2024_value");
    }

    #[test]
    fn suffixes_reserved_keywords() {
        assert_eq!(normalize_column_name("Table"), "table_col");
        assert_eq!(normalize_column_name("select"), "select_col");
    }

    #[test]
    fn table_name_is_deterministic() {
        let a = table_name("EIA", "Petroleum", "Spot Prices");
        let b = table_name("EIA", "Petroleum", "Spot Prices");
        assert_eq!(a, b);
        assert_eq!(a, "eia_petroleum_spot_prices");
    }
}
