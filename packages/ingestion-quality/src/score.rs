//! Composite quality scoring: folds a profile, its evaluated violations,
//! and any cross-source mismatches into the four weighted dimensions
//! from §C9 (completeness 0.30, freshness 0.20, validity 0.30,
//! consistency 0.20).

use crate::cross_source::CrossSourceMismatch;
use crate::types::{ProfileSnapshot, QualityScore, RuleViolation};

/// `completeness` from the profile's average non-null rate; `validity`
/// from the fraction of evaluated rules that passed; `consistency` from
/// whether any cross-source mismatches were found; `freshness` from the
/// caller (it already ran the FRESHNESS rule and knows the verdict).
pub fn score(
    snapshot: &ProfileSnapshot,
    violations: &[RuleViolation],
    rules_evaluated: usize,
    mismatches: &[CrossSourceMismatch],
    freshness_ok: bool,
) -> QualityScore {
    let completeness = if snapshot.columns.is_empty() {
        1.0
    } else {
        1.0 - snapshot.columns.iter().map(|c| c.null_pct).sum::<f64>() / snapshot.columns.len() as f64
    };

    let validity = if rules_evaluated == 0 {
        1.0
    } else {
        let failed_rules = violations.len().min(rules_evaluated);
        1.0 - (failed_rules as f64 / rules_evaluated as f64)
    };

    let consistency = if mismatches.is_empty() { 1.0 } else { (1.0 - mismatches.len() as f64 * 0.05).max(0.0) };

    let freshness = if freshness_ok { 1.0 } else { 0.0 };

    QualityScore { completeness, freshness, validity, consistency }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ProfileColumn, RuleSeverity};

    fn snapshot(null_pcts: &[f64]) -> ProfileSnapshot {
        ProfileSnapshot {
            table_name: "widgets".to_string(),
            source: "eia".to_string(),
            row_count: 100,
            columns: null_pcts
                .iter()
                .map(|p| ProfileColumn {
                    column_name: "c".to_string(),
                    null_count: 0,
                    null_pct: *p,
                    distinct_count: 0,
                    cardinality_ratio: 0.0,
                    mean: None,
                    stddev: None,
                    min: None,
                    max: None,
                    p25: None,
                    p75: None,
                    top_values: Vec::new(),
                })
                .collect(),
            profiled_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn perfect_data_scores_composite_one() {
        let snap = snapshot(&[0.0, 0.0]);
        let quality = score(&snap, &[], 0, &[], true);
        assert_eq!(quality.composite(), 1.0);
    }

    #[test]
    fn nulls_reduce_completeness_proportionally() {
        let snap = snapshot(&[0.5, 0.0]);
        let quality = score(&snap, &[], 0, &[], true);
        assert_eq!(quality.completeness, 0.75);
    }

    #[test]
    fn a_single_violation_among_two_rules_halves_validity() {
        let snap = snapshot(&[0.0]);
        let violations = vec![RuleViolation {
            rule_name: "auto_not_null_widgets_c".to_string(),
            severity: RuleSeverity::Warning,
            message: "row 0: c is null".to_string(),
        }];
        let quality = score(&snap, &violations, 2, &[], true);
        assert_eq!(quality.validity, 0.5);
    }
}
