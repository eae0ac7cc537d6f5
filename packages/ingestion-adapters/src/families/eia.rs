//! EIA (Energy Information Administration) REST+JSON adapter, representative
//! of the economic/government REST+JSON family: a single paginated GET
//! endpoint returning a flat `data: [...]` array, an API key in the query
//! string, and a conservative default concurrency matching EIA's published
//! 5,000 requests/hour limit.

use async_trait::async_trait;
use fetch_client::SecretString;
use serde::Deserialize;
use warehouse::{table_name, ColumnSpec, ColumnType, Row, SchemaSpec, Value};

use crate::adapter::{AdapterConfig, JobParams, SourceAdapter};
use crate::error::{AdapterError, AdapterResult};
use crate::plan::{FetchPlan, PlannedRequest};

#[derive(Debug, Deserialize)]
struct EiaJobParams {
    category: String,
    subcategory: Option<String>,
    route: String,
    frequency: String,
    #[serde(default)]
    facets: std::collections::HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct EiaEnvelope {
    response: EiaResponse,
}

#[derive(Debug, Deserialize)]
struct EiaResponse {
    data: Vec<EiaDatum>,
}

#[derive(Debug, Deserialize)]
struct EiaDatum {
    period: String,
    #[serde(default)]
    value: Option<f64>,
    #[serde(default)]
    units: Option<String>,
    #[serde(flatten)]
    facets: std::collections::BTreeMap<String, serde_json::Value>,
}

pub struct EiaAdapter {
    api_key: SecretString,
}

impl EiaAdapter {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { api_key: SecretString::new(api_key.into()) }
    }

    fn parsed_params(&self, params: &JobParams) -> AdapterResult<EiaJobParams> {
        serde_json::from_value(params.clone())
            .map_err(|e| AdapterError::Config(format!("invalid EIA job params: {e}")))
    }
}

#[async_trait]
impl SourceAdapter for EiaAdapter {
    fn name(&self) -> &'static str {
        "eia"
    }

    fn config(&self) -> AdapterConfig {
        AdapterConfig {
            max_concurrency: 2,
            max_retries: 3,
            rate_limit_interval_ms: 1000,
            timeout_secs: 30,
            require_rows: false,
        }
    }

    fn schema_for(&self, params: &JobParams) -> AdapterResult<SchemaSpec> {
        let p = self.parsed_params(params)?;
        let table = table_name("eia", &p.category, p.subcategory.as_deref().unwrap_or("data"));
        let spec = SchemaSpec::new(table, vec!["period".into(), "series_key".into()])
            .with_column(ColumnSpec::new("period", ColumnType::Text).not_null())
            .with_column(ColumnSpec::new("series_key", ColumnType::Text).not_null())
            .with_column(ColumnSpec::new("value", ColumnType::Number))
            .with_column(ColumnSpec::new("units", ColumnType::Text))
            .with_column(ColumnSpec::new("facets", ColumnType::Text))
            .with_index(format!("{}_period_idx", p.category), vec!["period".into()]);
        Ok(spec)
    }

    fn plan(&self, params: &JobParams) -> AdapterResult<FetchPlan> {
        let p = self.parsed_params(params)?;
        let mut request = PlannedRequest::get(format!("https://api.eia.gov/v2/{}/data", p.route))
            .with_query("api_key", self.api_key.expose())
            .with_query("frequency", &p.frequency)
            .with_query("data[0]", "value");
        for (i, (k, v)) in p.facets.iter().enumerate() {
            request = request.with_query(format!("facets[{k}][{i}]"), v);
        }
        Ok(FetchPlan::single(request))
    }

    fn parse(&self, params: &JobParams, body: &[u8]) -> AdapterResult<Vec<Row>> {
        let p = self.parsed_params(params)?;
        let envelope: EiaEnvelope =
            serde_json::from_slice(body).map_err(|e| AdapterError::Parse(e.to_string()))?;

        let rows = envelope
            .response
            .data
            .into_iter()
            .map(|datum| {
                let series_key = datum
                    .facets
                    .values()
                    .map(|v| v.as_str().unwrap_or_default().to_string())
                    .collect::<Vec<_>>()
                    .join(":");
                let series_key = if series_key.is_empty() { p.category.clone() } else { series_key };

                let mut row = Row::new();
                row.insert("period".to_string(), Value::Text(datum.period));
                row.insert("series_key".to_string(), Value::Text(series_key));
                row.insert(
                    "value".to_string(),
                    datum.value.map(Value::Number).unwrap_or(Value::Null),
                );
                row.insert(
                    "units".to_string(),
                    datum.units.map(Value::Text).unwrap_or(Value::Null),
                );
                row.insert(
                    "facets".to_string(),
                    Value::Text(serde_json::to_string(&datum.facets).unwrap_or_default()),
                );
                row
            })
            .collect();
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_is_deterministic() {
        let adapter = EiaAdapter::new("test-key");
        let params = serde_json::json!({
            "category": "petroleum", "subcategory": "consumption",
            "route": "petroleum/cons/refoth", "frequency": "annual",
        });
        let a = adapter.schema_for(&params).unwrap();
        let b = adapter.schema_for(&params).unwrap();
        assert_eq!(a.table_name, b.table_name);
        assert_eq!(a.table_name, "eia_petroleum_consumption");
    }

    #[test]
    fn parses_flat_data_array() {
        let adapter = EiaAdapter::new("test-key");
        let params = serde_json::json!({
            "category": "petroleum", "route": "petroleum/cons/refoth", "frequency": "annual",
        });
        let body = br#"{"response":{"data":[{"period":"2024","value":12.5,"units":"MBBL"}]}}"#;
        let rows = adapter.parse(&params, body).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("value"), Some(&Value::Number(12.5)));
    }
}
