//! Profiling and rule types shared by the profiler, seeder, evaluator, and
//! scorer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-column statistics computed over one table's rows at a point in
/// time. Mirrors the original's `DataProfileColumn`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileColumn {
    pub column_name: String,
    pub null_count: usize,
    pub null_pct: f64,
    pub distinct_count: usize,
    /// `distinct_count / row_count`; high ratio suggests an identifier
    /// column rather than a low-cardinality one.
    pub cardinality_ratio: f64,
    pub mean: Option<f64>,
    pub stddev: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub p25: Option<f64>,
    pub p75: Option<f64>,
    /// Most frequent string values, for ENUM rule seeding.
    pub top_values: Vec<String>,
}

/// One table's profile at a point in time. Mirrors the original's
/// `DataProfileSnapshot`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub table_name: String,
    pub source: String,
    pub row_count: usize,
    pub columns: Vec<ProfileColumn>,
    pub profiled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleType {
    RowCount,
    NotNull,
    Range,
    Enum,
    Regex,
    Freshness,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSeverity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityRule {
    pub name: String,
    pub description: String,
    pub source: String,
    pub dataset_pattern: String,
    pub column_name: Option<String>,
    pub rule_type: RuleType,
    pub severity: RuleSeverity,
    pub parameters: serde_json::Value,
    pub auto_generated: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RuleViolation {
    pub rule_name: String,
    pub severity: RuleSeverity,
    pub message: String,
}

/// Status of an [`crate::anomaly::AnomalyAlert`] over its lifetime; mirrors
/// the original's open/acknowledged/resolved triage states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Open,
    Acknowledged,
    Resolved,
}

/// Composite quality score: weighted per §C9, each dimension in `[0, 1]`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct QualityScore {
    pub completeness: f64,
    pub freshness: f64,
    pub validity: f64,
    pub consistency: f64,
}

impl QualityScore {
    pub const COMPLETENESS_WEIGHT: f64 = 0.30;
    pub const FRESHNESS_WEIGHT: f64 = 0.20;
    pub const VALIDITY_WEIGHT: f64 = 0.30;
    pub const CONSISTENCY_WEIGHT: f64 = 0.20;

    pub fn composite(&self) -> f64 {
        self.completeness * Self::COMPLETENESS_WEIGHT
            + self.freshness * Self::FRESHNESS_WEIGHT
            + self.validity * Self::VALIDITY_WEIGHT
            + self.consistency * Self::CONSISTENCY_WEIGHT
    }
}
