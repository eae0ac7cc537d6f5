//! Rule Evaluator: runs seeded or hand-authored [`QualityRule`]s against a
//! batch of rows and reports [`RuleViolation`]s.

use regex::Regex;
use warehouse::{Row, Value};

use crate::types::{QualityRule, RuleSeverity, RuleType, RuleViolation};

pub fn evaluate(rule: &QualityRule, rows: &[Row]) -> Vec<RuleViolation> {
    match rule.rule_type {
        RuleType::RowCount => evaluate_row_count(rule, rows),
        RuleType::NotNull => evaluate_not_null(rule, rows),
        RuleType::Range => evaluate_range(rule, rows),
        RuleType::Enum => evaluate_enum(rule, rows),
        RuleType::Regex => evaluate_regex(rule, rows),
        RuleType::Freshness => evaluate_freshness(rule, rows),
    }
}

fn violation(rule: &QualityRule, message: String) -> RuleViolation {
    RuleViolation { rule_name: rule.name.clone(), severity: rule.severity, message }
}

fn evaluate_row_count(rule: &QualityRule, rows: &[Row]) -> Vec<RuleViolation> {
    let min = rule.parameters.get("min").and_then(|v| v.as_u64()).unwrap_or(0) as usize;
    if rows.len() < min {
        vec![violation(rule, format!("expected at least {min} rows, found {}", rows.len()))]
    } else {
        Vec::new()
    }
}

fn evaluate_not_null(rule: &QualityRule, rows: &[Row]) -> Vec<RuleViolation> {
    let Some(column) = &rule.column_name else { return Vec::new() };
    rows.iter()
        .enumerate()
        .filter(|(_, row)| matches!(row.get(column), None | Some(Value::Null)))
        .map(|(i, _)| violation(rule, format!("row {i}: {column} is null")))
        .collect()
}

fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Integer(i) => Some(*i as f64),
        Value::Number(n) => Some(*n),
        _ => None,
    }
}

fn evaluate_range(rule: &QualityRule, rows: &[Row]) -> Vec<RuleViolation> {
    let Some(column) = &rule.column_name else { return Vec::new() };
    let min = rule.parameters.get("min").and_then(|v| v.as_f64());
    let max = rule.parameters.get("max").and_then(|v| v.as_f64());

    rows.iter()
        .enumerate()
        .filter_map(|(i, row)| {
            let value = numeric_value(row.get(column)?)?;
            let out_of_range = min.is_some_and(|min| value < min) || max.is_some_and(|max| value > max);
            out_of_range.then(|| {
                violation(rule, format!("row {i}: {column}={value} outside [{min:?}, {max:?}]"))
            })
        })
        .collect()
}

fn evaluate_enum(rule: &QualityRule, rows: &[Row]) -> Vec<RuleViolation> {
    let Some(column) = &rule.column_name else { return Vec::new() };
    let allowed: Vec<String> = rule
        .parameters
        .get("allowed")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default();

    rows.iter()
        .enumerate()
        .filter_map(|(i, row)| match row.get(column) {
            Some(Value::Text(s)) if !allowed.contains(s) => {
                Some(violation(rule, format!("row {i}: {column}={s:?} not in allowed set")))
            }
            _ => None,
        })
        .collect()
}

fn evaluate_regex(rule: &QualityRule, rows: &[Row]) -> Vec<RuleViolation> {
    let Some(column) = &rule.column_name else { return Vec::new() };
    let Some(pattern) = rule.parameters.get("pattern").and_then(|v| v.as_str()) else { return Vec::new() };
    let Ok(re) = Regex::new(pattern) else { return Vec::new() };

    rows.iter()
        .enumerate()
        .filter_map(|(i, row)| match row.get(column) {
            Some(Value::Text(s)) if !re.is_match(s) => {
                Some(violation(rule, format!("row {i}: {column}={s:?} does not match {pattern}")))
            }
            _ => None,
        })
        .collect()
}

fn evaluate_freshness(rule: &QualityRule, rows: &[Row]) -> Vec<RuleViolation> {
    let Some(column) = &rule.column_name else { return Vec::new() };
    let max_age_days = rule.parameters.get("max_age_days").and_then(|v| v.as_i64()).unwrap_or(90);
    let now = chrono::Utc::now();

    let Some(newest) = rows.iter().filter_map(|row| match row.get(column) {
        Some(Value::Timestamp(t)) => Some(*t),
        _ => None,
    }).max() else {
        return Vec::new();
    };

    if now.signed_duration_since(newest) > chrono::Duration::days(max_age_days) {
        vec![violation(rule, format!("newest {column} is {newest}, older than {max_age_days} days"))]
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn rule(rule_type: RuleType, column: Option<&str>, params: serde_json::Value) -> QualityRule {
        QualityRule {
            name: "test_rule".to_string(),
            description: String::new(),
            source: "eia".to_string(),
            dataset_pattern: "^widgets$".to_string(),
            column_name: column.map(str::to_string),
            rule_type,
            severity: RuleSeverity::Warning,
            parameters: params,
            auto_generated: true,
        }
    }

    #[test]
    fn row_count_violation_when_below_minimum() {
        let r = rule(RuleType::RowCount, None, serde_json::json!({"min": 10}));
        let violations = evaluate(&r, &[]);
        assert_eq!(violations.len(), 1);
    }

    #[test]
    fn range_flags_out_of_bounds_values() {
        let r = rule(RuleType::Range, Some("value"), serde_json::json!({"min": 0.0, "max": 100.0}));
        let mut row: BTreeMap<String, Value> = BTreeMap::new();
        row.insert("value".to_string(), Value::Number(150.0));
        let violations = evaluate(&r, &[row]);
        assert_eq!(violations.len(), 1);
    }

    #[test]
    fn enum_passes_when_value_in_allowed_set() {
        let r = rule(RuleType::Enum, Some("status"), serde_json::json!({"allowed": ["active", "closed"]}));
        let mut row: BTreeMap<String, Value> = BTreeMap::new();
        row.insert("status".to_string(), Value::Text("active".to_string()));
        assert!(evaluate(&r, &[row]).is_empty());
    }
}
