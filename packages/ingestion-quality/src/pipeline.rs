//! Quality Pipeline: the orchestration the Job Runner fires after a
//! successful write — profile the batch, persist the snapshot, compare it
//! against history for drift, auto-seed and evaluate rules, and fold
//! everything into a composite score. Runs asynchronously from the job
//! itself; a pipeline failure is logged and never turns a successful
//! ingest into a failed one.

use tracing::info;
use warehouse::Row;

use crate::anomaly::{self, AnomalyAlert};
use crate::defaults;
use crate::evaluator;
use crate::profiler;
use crate::score;
use crate::seeder;
use crate::store::QualityStore;
use crate::types::{QualityRule, QualityScore, RuleViolation};

/// Number of historical snapshots [`anomaly::detect_drift`] compares
/// against; matches [`anomaly::MIN_HISTORY_FOR_DRIFT`] plus headroom in
/// case older snapshots are missing columns the current one has.
const HISTORY_DEPTH: i64 = 5;

#[derive(Debug, Clone)]
pub struct QualityResult {
    pub table_name: String,
    pub violations: Vec<RuleViolation>,
    pub alerts: Vec<AnomalyAlert>,
    pub rules_seeded: Vec<QualityRule>,
    pub score: QualityScore,
}

/// Profile `rows`, persist the snapshot, and run the rest of the pipeline
/// against it. `table_name`/`source` identify the dataset the rows were
/// just written to.
#[tracing::instrument(skip(store, rows), fields(table = %table_name, rows = rows.len()))]
pub async fn run(
    store: &QualityStore,
    table_name: &str,
    source: &str,
    rows: &[Row],
    min_rows_for_not_null_and_enum: usize,
) -> anyhow::Result<QualityResult> {
    let snapshot = profiler::profile(table_name, source, rows);
    store.persist_snapshot(&snapshot).await?;

    let history = store.recent_snapshots(table_name, snapshot.profiled_at, HISTORY_DEPTH).await?;
    let alerts = anomaly::detect_drift(&snapshot, &history);
    if !alerts.is_empty() {
        info!(table = %table_name, count = alerts.len(), "anomaly alerts raised");
    }
    store.persist_alerts(&alerts).await?;

    // Seeded once per known source family, ahead of the profile-driven
    // auto-seeder below; idempotent since the Batch Writer upserts these
    // by their fixed `default_`-prefixed names.
    store.persist_rules(&defaults::default_rules_for(source)).await?;

    let existing_names = store.existing_rule_names(table_name).await?;
    let seeded = seeder::seed_rules(&snapshot, &existing_names, min_rows_for_not_null_and_enum);
    store.persist_rules(&seeded).await?;

    let rules = store.rules_for(table_name).await?;
    let mut violations = Vec::new();
    let mut freshness_ok = true;
    for rule in &rules {
        let rule_violations = evaluator::evaluate(rule, rows);
        if rule.rule_type == crate::types::RuleType::Freshness && !rule_violations.is_empty() {
            freshness_ok = false;
        }
        violations.extend(rule_violations);
    }

    // Cross-source comparison needs rows from a second source collected
    // around the same time; a single job's rows don't carry that, so it
    // runs out-of-band rather than per-job.
    let quality_score = score::score(&snapshot, &violations, rules.len(), &[], freshness_ok);

    Ok(QualityResult { table_name: table_name.to_string(), violations, alerts, rules_seeded: seeded, score: quality_score })
}
