//! Profiler: computes a [`ProfileSnapshot`] over a batch of rows, the
//! input the Rule Seeder and composite scorer both work from.

use std::collections::{BTreeSet, HashMap};

use warehouse::{Row, Value};

use crate::types::{ProfileColumn, ProfileSnapshot};

const TOP_VALUES_LIMIT: usize = 20;

pub fn profile(table_name: &str, source: &str, rows: &[Row]) -> ProfileSnapshot {
    let row_count = rows.len();
    let columns: BTreeSet<&String> = rows.iter().flat_map(|row| row.keys()).collect();

    let profiled = columns.into_iter().map(|name| profile_column(name, rows)).collect();

    ProfileSnapshot {
        table_name: table_name.to_string(),
        source: source.to_string(),
        row_count,
        columns: profiled,
        profiled_at: chrono::Utc::now(),
    }
}

fn profile_column(name: &str, rows: &[Row]) -> ProfileColumn {
    let row_count = rows.len();
    let values: Vec<&Value> = rows.iter().map(|row| row.get(name).unwrap_or(&Value::Null)).collect();

    let null_count = values.iter().filter(|v| matches!(v, Value::Null)).count();
    let null_pct = if row_count == 0 { 0.0 } else { null_count as f64 / row_count as f64 };

    let mut distinct_keys: BTreeSet<String> = BTreeSet::new();
    let mut frequencies: HashMap<String, usize> = HashMap::new();
    let mut numeric: Vec<f64> = Vec::new();

    for value in &values {
        match value {
            Value::Null => {}
            Value::Text(s) => {
                distinct_keys.insert(s.clone());
                *frequencies.entry(s.clone()).or_insert(0) += 1;
            }
            Value::Integer(i) => {
                distinct_keys.insert(i.to_string());
                numeric.push(*i as f64);
            }
            Value::Number(n) => {
                distinct_keys.insert(format!("{n}"));
                numeric.push(*n);
            }
            Value::Boolean(b) => {
                distinct_keys.insert(b.to_string());
            }
            Value::Timestamp(t) => {
                distinct_keys.insert(t.to_rfc3339());
            }
        }
    }

    let distinct_count = distinct_keys.len();
    let cardinality_ratio = if row_count == 0 { 0.0 } else { distinct_count as f64 / row_count as f64 };

    let (mean, stddev, min, max, p25, p75) = numeric_stats(&numeric);

    let mut top_values: Vec<(String, usize)> = frequencies.into_iter().collect();
    top_values.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let top_values = top_values.into_iter().take(TOP_VALUES_LIMIT).map(|(v, _)| v).collect();

    ProfileColumn {
        column_name: name.to_string(),
        null_count,
        null_pct,
        distinct_count,
        cardinality_ratio,
        mean,
        stddev,
        min,
        max,
        p25,
        p75,
        top_values,
    }
}

fn numeric_stats(values: &[f64]) -> (Option<f64>, Option<f64>, Option<f64>, Option<f64>, Option<f64>, Option<f64>) {
    if values.is_empty() {
        return (None, None, None, None, None, None);
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("profiled values are never NaN"));

    let n = sorted.len() as f64;
    let mean = sorted.iter().sum::<f64>() / n;
    let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    let min = sorted[0];
    let max = sorted[sorted.len() - 1];
    let p25 = percentile(&sorted, 0.25);
    let p75 = percentile(&sorted, 0.75);

    (Some(mean), Some(stddev), Some(min), Some(max), Some(p25), Some(p75))
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = p * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let weight = rank - lower as f64;
        sorted[lower] * (1.0 - weight) + sorted[upper] * weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warehouse::Value;

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn null_pct_and_distinct_count_over_mixed_rows() {
        let rows = vec![
            row(&[("status", Value::Text("active".into()))]),
            row(&[("status", Value::Text("active".into()))]),
            row(&[("status", Value::Null)]),
        ];
        let snapshot = profile("widgets", "test", &rows);
        let status = snapshot.columns.iter().find(|c| c.column_name == "status").unwrap();
        assert_eq!(status.null_count, 1);
        assert!((status.null_pct - (1.0 / 3.0)).abs() < 1e-9);
        assert_eq!(status.distinct_count, 1);
    }

    #[test]
    fn numeric_stats_computed_for_number_columns() {
        let rows = vec![
            row(&[("value", Value::Number(10.0))]),
            row(&[("value", Value::Number(20.0))]),
            row(&[("value", Value::Number(30.0))]),
        ];
        let snapshot = profile("widgets", "test", &rows);
        let value = snapshot.columns.iter().find(|c| c.column_name == "value").unwrap();
        assert_eq!(value.mean, Some(20.0));
        assert_eq!(value.min, Some(10.0));
        assert_eq!(value.max, Some(30.0));
    }
}
