//! Rule Seeder: turns a [`ProfileSnapshot`] into auto-generated
//! [`QualityRule`]s, the same heuristics as the original's
//! `seed_rules_from_profiles` (ROW_COUNT, NOT_NULL, RANGE, ENUM, REGEX,
//! FRESHNESS), `auto_`-prefixed and idempotent against a set of already
//! seeded names.

use std::collections::HashSet;

use regex::Regex;

use crate::types::{ProfileColumn, ProfileSnapshot, QualityRule, RuleSeverity, RuleType};

const SKIP_COLUMNS: &[&str] = &["id", "created_at", "updated_at", "deleted_at"];
const TEMPORAL_COLUMNS: &[&str] = &["created_at", "updated_at", "ingested_at", "last_updated_at"];

/// Default for `min_rows_for_not_null_and_enum` when a caller has no
/// configured override — mirrors `RULE_SEEDER_MIN_ROWS`'s own default.
pub const DEFAULT_MIN_ROWS_FOR_NOT_NULL_AND_ENUM: usize = 50;
const FIPS_REGEX_PATTERN: &str = r"^\d{2}$|^\d{5}$|^\d{11}$";
const SKEW_CV_THRESHOLD: f64 = 1.5;
const FRESHNESS_MAX_AGE_DAYS: i64 = 90;

fn fips_pattern() -> Regex {
    Regex::new(r"(?i)(fips|geo_id|geoid|fips_code|state_fips|county_fips)").expect("static pattern is valid")
}

/// Propose auto-generated rules for one table's profile. `existing_names`
/// is the set of rule names already seeded (from this table or others);
/// a proposal whose name is already in that set is skipped, making repeat
/// seeding runs idempotent. `min_rows_for_not_null_and_enum` gates the
/// NOT_NULL/ENUM heuristics below — usually `Config::rule_seeder_min_rows`.
pub fn seed_rules(
    snapshot: &ProfileSnapshot,
    existing_names: &HashSet<String>,
    min_rows_for_not_null_and_enum: usize,
) -> Vec<QualityRule> {
    let mut proposed = Vec::new();
    let table = &snapshot.table_name;
    let dataset_pattern = format!("^{}$", regex::escape(table));

    if snapshot.row_count > 0 {
        let min_rows = ((snapshot.row_count as f64) * 0.5).max(1.0) as usize;
        proposed.push(QualityRule {
            name: format!("auto_row_count_{table}"),
            description: format!(
                "Table {table} should have at least {min_rows} rows (50% of {})",
                snapshot.row_count
            ),
            source: snapshot.source.clone(),
            dataset_pattern: dataset_pattern.clone(),
            column_name: None,
            rule_type: RuleType::RowCount,
            severity: RuleSeverity::Warning,
            parameters: serde_json::json!({ "min": min_rows }),
            auto_generated: true,
        });
    }

    let fips = fips_pattern();
    for column in &snapshot.columns {
        proposed.extend(seed_column_rules(
            snapshot,
            column,
            &dataset_pattern,
            &fips,
            min_rows_for_not_null_and_enum,
        ));
    }

    proposed.retain(|rule| !existing_names.contains(&rule.name));
    proposed
}

fn seed_column_rules(
    snapshot: &ProfileSnapshot,
    column: &ProfileColumn,
    dataset_pattern: &str,
    fips: &Regex,
    min_rows_for_not_null_and_enum: usize,
) -> Vec<QualityRule> {
    let mut rules = Vec::new();
    let table = &snapshot.table_name;
    let col = &column.column_name;
    let col_lower = col.to_lowercase();
    let skip = SKIP_COLUMNS.contains(&col_lower.as_str());

    if !skip && snapshot.row_count >= min_rows_for_not_null_and_enum && column.null_pct == 0.0 {
        rules.push(QualityRule {
            name: format!("auto_not_null_{table}_{col}"),
            description: format!("{table}.{col} has 0% nulls — enforce not-null"),
            source: snapshot.source.clone(),
            dataset_pattern: dataset_pattern.to_string(),
            column_name: Some(col.clone()),
            rule_type: RuleType::NotNull,
            severity: RuleSeverity::Warning,
            parameters: serde_json::json!({}),
            auto_generated: true,
        });
    }

    if let Some(range) = range_rule(snapshot, column, dataset_pattern) {
        rules.push(range);
    }

    if !skip
        && snapshot.row_count >= min_rows_for_not_null_and_enum
        && column.distinct_count > 0
        && column.distinct_count <= 20
        && column.cardinality_ratio <= 0.5
        && !column.top_values.is_empty()
    {
        rules.push(QualityRule {
            name: format!("auto_enum_{table}_{col}"),
            description: format!(
                "{table}.{col} has {} distinct values — enforce enum",
                column.distinct_count
            ),
            source: snapshot.source.clone(),
            dataset_pattern: dataset_pattern.to_string(),
            column_name: Some(col.clone()),
            rule_type: RuleType::Enum,
            severity: RuleSeverity::Info,
            parameters: serde_json::json!({ "allowed": column.top_values }),
            auto_generated: true,
        });
    }

    if fips.is_match(col) {
        rules.push(QualityRule {
            name: format!("auto_regex_{table}_{col}"),
            description: format!("{table}.{col} should match FIPS code format (2/5/11 digits)"),
            source: snapshot.source.clone(),
            dataset_pattern: dataset_pattern.to_string(),
            column_name: Some(col.clone()),
            rule_type: RuleType::Regex,
            severity: RuleSeverity::Warning,
            parameters: serde_json::json!({ "pattern": FIPS_REGEX_PATTERN }),
            auto_generated: true,
        });
    }

    if TEMPORAL_COLUMNS.contains(&col_lower.as_str()) {
        rules.push(QualityRule {
            name: format!("auto_freshness_{table}_{col}"),
            description: format!(
                "{table}.{col} should have data within the last {FRESHNESS_MAX_AGE_DAYS} days"
            ),
            source: snapshot.source.clone(),
            dataset_pattern: dataset_pattern.to_string(),
            column_name: Some(col.clone()),
            rule_type: RuleType::Freshness,
            severity: RuleSeverity::Info,
            parameters: serde_json::json!({ "max_age_days": FRESHNESS_MAX_AGE_DAYS }),
            auto_generated: true,
        });
    }

    rules
}

/// `mean ± 4σ` for roughly-normal columns; a coefficient of variation
/// above 1.5 signals a skewed distribution (populations, dollar amounts),
/// where IQR-based or min/max-based bounds avoid flagging legitimate
/// long-tail values as violations.
fn range_rule(snapshot: &ProfileSnapshot, column: &ProfileColumn, dataset_pattern: &str) -> Option<QualityRule> {
    let mean = column.mean?;
    let stddev = column.stddev?;
    if stddev <= 0.0 {
        return None;
    }

    let cv = if mean != 0.0 { stddev / mean.abs() } else { f64::INFINITY };
    let is_skewed = cv > SKEW_CV_THRESHOLD;

    let (range_min, range_max, method) = if is_skewed {
        if let (Some(p25), Some(p75)) = (column.p25, column.p75) {
            let iqr = p75 - p25;
            (p25 - 6.0 * iqr, p75 + 6.0 * iqr, "IQR×6")
        } else if let (Some(min), Some(max)) = (column.min, column.max) {
            let range = max - min;
            (min - 0.5 * range, max + 0.5 * range, "min/max×1.5")
        } else {
            (mean - 4.0 * stddev, mean + 4.0 * stddev, "mean±4σ")
        }
    } else {
        (mean - 4.0 * stddev, mean + 4.0 * stddev, "mean±4σ")
    };

    let table = &snapshot.table_name;
    let col = &column.column_name;
    Some(QualityRule {
        name: format!("auto_range_{table}_{col}"),
        description: format!("{table}.{col} range check ({method}, cv={cv:.1})"),
        source: snapshot.source.clone(),
        dataset_pattern: dataset_pattern.to_string(),
        column_name: Some(col.clone()),
        rule_type: RuleType::Range,
        severity: RuleSeverity::Warning,
        parameters: serde_json::json!({ "min": round4(range_min), "max": round4(range_max) }),
        auto_generated: true,
    })
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProfileColumn;

    fn snapshot_with(columns: Vec<ProfileColumn>, row_count: usize) -> ProfileSnapshot {
        ProfileSnapshot {
            table_name: "widgets".to_string(),
            source: "eia".to_string(),
            row_count,
            columns,
            profiled_at: chrono::Utc::now(),
        }
    }

    fn column(name: &str) -> ProfileColumn {
        ProfileColumn {
            column_name: name.to_string(),
            null_count: 0,
            null_pct: 0.0,
            distinct_count: 0,
            cardinality_ratio: 0.0,
            mean: None,
            stddev: None,
            min: None,
            max: None,
            p25: None,
            p75: None,
            top_values: Vec::new(),
        }
    }

    #[test]
    fn row_count_rule_uses_fifty_percent_of_current_count() {
        let snapshot = snapshot_with(vec![], 200);
        let rules = seed_rules(&snapshot, &HashSet::new(), DEFAULT_MIN_ROWS_FOR_NOT_NULL_AND_ENUM);
        let row_count_rule = rules.iter().find(|r| r.rule_type == RuleType::RowCount).unwrap();
        assert_eq!(row_count_rule.parameters["min"], 100);
    }

    #[test]
    fn not_null_skipped_below_minimum_row_count() {
        let mut col = column("status");
        col.null_pct = 0.0;
        let snapshot = snapshot_with(vec![col], 10);
        let rules = seed_rules(&snapshot, &HashSet::new(), DEFAULT_MIN_ROWS_FOR_NOT_NULL_AND_ENUM);
        assert!(!rules.iter().any(|r| r.rule_type == RuleType::NotNull));
    }

    #[test]
    fn id_column_never_gets_not_null_or_enum_rules() {
        let mut col = column("id");
        col.null_pct = 0.0;
        col.distinct_count = 5;
        col.cardinality_ratio = 0.05;
        col.top_values = vec!["1".into()];
        let snapshot = snapshot_with(vec![col], 200);
        let rules = seed_rules(&snapshot, &HashSet::new(), DEFAULT_MIN_ROWS_FOR_NOT_NULL_AND_ENUM);
        assert!(!rules.iter().any(|r| r.rule_type == RuleType::NotNull || r.rule_type == RuleType::Enum));
    }

    #[test]
    fn idempotent_seeding_skips_already_seeded_names() {
        let snapshot = snapshot_with(vec![], 200);
        let mut existing = HashSet::new();
        existing.insert("auto_row_count_widgets".to_string());
        let rules = seed_rules(&snapshot, &existing, DEFAULT_MIN_ROWS_FOR_NOT_NULL_AND_ENUM);
        assert!(!rules.iter().any(|r| r.name == "auto_row_count_widgets"));
    }

    #[test]
    fn fips_shaped_column_name_gets_regex_rule() {
        let col = column("state_fips_code");
        let snapshot = snapshot_with(vec![col], 200);
        let rules = seed_rules(&snapshot, &HashSet::new(), DEFAULT_MIN_ROWS_FOR_NOT_NULL_AND_ENUM);
        assert!(rules.iter().any(|r| r.rule_type == RuleType::Regex));
    }

    #[test]
    fn skewed_distribution_widens_range_via_iqr() {
        let mut col = column("population");
        col.mean = Some(100.0);
        col.stddev = Some(500.0);
        col.p25 = Some(10.0);
        col.p75 = Some(50.0);
        let snapshot = snapshot_with(vec![col], 200);
        let rules = seed_rules(&snapshot, &HashSet::new(), DEFAULT_MIN_ROWS_FOR_NOT_NULL_AND_ENUM);
        let range_rule = rules.iter().find(|r| r.rule_type == RuleType::Range).unwrap();
        assert!(range_rule.description.contains("IQR"));
    }
}
