//! Default Validation Configs: minimum-viable `ROW_COUNT`/`NOT_NULL`
//! rules seeded per known source family ahead of the profile-driven
//! auto-seeder (`seeder::seed_rules`) ever running — mirrors the
//! original's `DEFAULT_VALIDATION_CONFIGS`/`get_default_validation_config`,
//! re-keyed to this crate's actual adapter families rather than the
//! original's (`fdic`/`census`/`fred`/`bls`).

use crate::types::{QualityRule, RuleSeverity, RuleType};

struct DefaultConfig {
    source: &'static str,
    dataset_pattern: &'static str,
    expected_min_rows: u64,
    required_columns: &'static [&'static str],
}

const DEFAULTS: &[DefaultConfig] = &[
    DefaultConfig {
        source: "eia",
        dataset_pattern: r"^eia_.*$",
        expected_min_rows: 1,
        required_columns: &["period", "series_key"],
    },
    DefaultConfig {
        source: "sec_edgar",
        dataset_pattern: r"^sec_edgar_filings$",
        expected_min_rows: 1,
        required_columns: &["cik", "accession_number"],
    },
    DefaultConfig {
        source: "cafr_pdf",
        dataset_pattern: r"^cafr_.*$",
        expected_min_rows: 1,
        required_columns: &["entity_name", "fiscal_year", "fund_name"],
    },
];

/// Default rules for `source`, empty if it isn't a known family. Names
/// are `default_`-prefixed so they never collide with the `auto_`-prefixed
/// names [`crate::seeder::seed_rules`] produces.
pub fn default_rules_for(source: &str) -> Vec<QualityRule> {
    DEFAULTS
        .iter()
        .filter(|c| c.source == source)
        .flat_map(|c| {
            let row_count = QualityRule {
                name: format!("default_row_count_{}", c.source),
                description: format!("{} should have at least {} row(s)", c.source, c.expected_min_rows),
                source: c.source.to_string(),
                dataset_pattern: c.dataset_pattern.to_string(),
                column_name: None,
                rule_type: RuleType::RowCount,
                severity: RuleSeverity::Error,
                parameters: serde_json::json!({ "min": c.expected_min_rows }),
                auto_generated: false,
            };
            let not_null = c.required_columns.iter().map(move |col| QualityRule {
                name: format!("default_not_null_{}_{col}", c.source),
                description: format!("{} requires {col} on every row", c.source),
                source: c.source.to_string(),
                dataset_pattern: c.dataset_pattern.to_string(),
                column_name: Some(col.to_string()),
                rule_type: RuleType::NotNull,
                severity: RuleSeverity::Error,
                parameters: serde_json::json!({}),
                auto_generated: false,
            });
            std::iter::once(row_count).chain(not_null)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_source_gets_row_count_and_not_null_rules() {
        let rules = default_rules_for("sec_edgar");
        assert!(rules.iter().any(|r| r.rule_type == RuleType::RowCount));
        assert!(rules.iter().any(|r| r.rule_type == RuleType::NotNull && r.column_name.as_deref() == Some("cik")));
    }

    #[test]
    fn unknown_source_has_no_defaults() {
        assert!(default_rules_for("not_a_real_source").is_empty());
    }

    #[test]
    fn default_rule_names_never_collide_with_auto_seeded_names() {
        let rules = default_rules_for("eia");
        assert!(rules.iter().all(|r| r.name.starts_with("default_")));
    }
}
