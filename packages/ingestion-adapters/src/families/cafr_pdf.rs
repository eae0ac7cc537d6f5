//! CAFR (Comprehensive Annual Financial Report) PDF+LLM adapter: a report
//! rarely exposes its fund balances as machine-readable data, so the adapter
//! treats an LLM as an external collaborator (`extract`) that turns
//! extracted PDF text into structured rows, with a regex-based fallback for
//! when the collaborator is unavailable.

use async_trait::async_trait;
use llm_client::OpenAIClient;
use regex::Regex;
use schemars::JsonSchema;
use serde::Deserialize;
use warehouse::{ColumnSpec, ColumnType, Row, SchemaSpec, Value};

use crate::adapter::{AdapterConfig, JobParams, SourceAdapter};
use crate::error::{AdapterError, AdapterResult};
use crate::plan::FetchPlan;

#[derive(Debug, Deserialize)]
struct CafrJobParams {
    entity_name: String,
    fiscal_year: i64,
    /// Already-OCR'd report text; extraction happens against this, not
    /// against a freshly fetched document — the job payload is expected
    /// to carry it once upstream OCR has resolved the report's attachment.
    report_text: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct FundBalance {
    fund_name: String,
    total_assets: f64,
    total_liabilities: f64,
    fund_balance: f64,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct CafrExtraction {
    funds: Vec<FundBalance>,
}

pub struct CafrPdfAdapter {
    client: Option<OpenAIClient>,
}

impl CafrPdfAdapter {
    pub fn new(client: Option<OpenAIClient>) -> Self {
        Self { client }
    }

    fn parsed_params(&self, params: &JobParams) -> AdapterResult<CafrJobParams> {
        serde_json::from_value(params.clone())
            .map_err(|e| AdapterError::Config(format!("invalid CAFR job params: {e}")))
    }

    /// Extract fund balances from already-OCR'd report text. Prefers the
    /// LLM collaborator; falls back to a conservative regex scan of
    /// "Fund Name ... Total Assets $N ... Total Liabilities $N" lines when
    /// no client is configured, trading recall for availability.
    pub async fn extract_funds(&self, report_text: &str) -> AdapterResult<Vec<FundBalance>> {
        match &self.client {
            Some(client) => {
                let system = "Extract fund balance entries from this CAFR excerpt as structured data.";
                let extraction: CafrExtraction = client
                    .extract("gpt-4o", system, report_text)
                    .await
                    .map_err(|e| AdapterError::Parse(e.to_string()))?;
                Ok(extraction.funds)
            }
            None => Ok(regex_fallback(report_text)),
        }
    }
}

fn regex_fallback(report_text: &str) -> Vec<FundBalance> {
    let pattern = Regex::new(
        r"(?m)^(?P<name>[A-Za-z ]+Fund)\s+\$(?P<assets>[\d,.]+)\s+\$(?P<liabilities>[\d,.]+)$",
    )
    .expect("static fund-balance pattern is valid");

    pattern
        .captures_iter(report_text)
        .filter_map(|caps| {
            let assets: f64 = caps["assets"].replace(',', "").parse().ok()?;
            let liabilities: f64 = caps["liabilities"].replace(',', "").parse().ok()?;
            Some(FundBalance {
                fund_name: caps["name"].trim().to_string(),
                total_assets: assets,
                total_liabilities: liabilities,
                fund_balance: assets - liabilities,
            })
        })
        .collect()
}

#[async_trait]
impl SourceAdapter for CafrPdfAdapter {
    fn name(&self) -> &'static str {
        "cafr_pdf"
    }

    fn config(&self) -> AdapterConfig {
        AdapterConfig {
            max_concurrency: 1,
            max_retries: 2,
            rate_limit_interval_ms: 0,
            timeout_secs: 120,
            require_rows: false,
        }
    }

    fn schema_for(&self, _params: &JobParams) -> AdapterResult<SchemaSpec> {
        Ok(SchemaSpec::new(
            "cafr_fund_balances",
            vec!["entity_name".into(), "fiscal_year".into(), "fund_name".into()],
        )
        .with_column(ColumnSpec::new("entity_name", ColumnType::Text).not_null())
        .with_column(ColumnSpec::new("fiscal_year", ColumnType::Integer).not_null())
        .with_column(ColumnSpec::new("fund_name", ColumnType::Text).not_null())
        .with_column(ColumnSpec::new("total_assets", ColumnType::Number))
        .with_column(ColumnSpec::new("total_liabilities", ColumnType::Number))
        .with_column(ColumnSpec::new("fund_balance", ColumnType::Number)))
    }

    /// The PDF itself is fetched out of band (an attachment URL resolved by
    /// the job payload); nothing to plan as an HTTP request here.
    fn plan(&self, _params: &JobParams) -> AdapterResult<FetchPlan> {
        Ok(FetchPlan::default())
    }

    /// Rows come from `extract_funds`, not from a fetched response body —
    /// `execute_custom` drives this adapter directly instead.
    fn parse(&self, params: &JobParams, _body: &[u8]) -> AdapterResult<Vec<Row>> {
        let _ = self.parsed_params(params)?;
        Ok(Vec::new())
    }

    async fn execute_custom(&self, params: &JobParams) -> Option<AdapterResult<Vec<Row>>> {
        Some(async {
            let parsed = self.parsed_params(params)?;
            let funds = self.extract_funds(&parsed.report_text).await?;
            Ok(funds_to_rows(&parsed.entity_name, parsed.fiscal_year, funds))
        }
        .await)
    }
}

pub fn funds_to_rows(entity_name: &str, fiscal_year: i64, funds: Vec<FundBalance>) -> Vec<Row> {
    funds
        .into_iter()
        .map(|fund| {
            let mut row = Row::new();
            row.insert("entity_name".to_string(), Value::Text(entity_name.to_string()));
            row.insert("fiscal_year".to_string(), Value::Integer(fiscal_year));
            row.insert("fund_name".to_string(), Value::Text(fund.fund_name));
            row.insert("total_assets".to_string(), Value::Number(fund.total_assets));
            row.insert("total_liabilities".to_string(), Value::Number(fund.total_liabilities));
            row.insert("fund_balance".to_string(), Value::Number(fund.fund_balance));
            row
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn execute_custom_runs_the_regex_fallback_without_an_llm_client() {
        let adapter = CafrPdfAdapter::new(None);
        let params = serde_json::json!({
            "entity_name": "City of Example",
            "fiscal_year": 2024,
            "report_text": "General Fund $1,250,000.00 $900,000.00",
        });

        let rows = adapter.execute_custom(&params).await.expect("should bypass plan/parse").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("entity_name"), Some(&Value::Text("City of Example".to_string())));
        assert_eq!(rows[0].get("fiscal_year"), Some(&Value::Integer(2024)));
        assert_eq!(rows[0].get("fund_name"), Some(&Value::Text("General Fund".to_string())));
    }

    #[tokio::test]
    async fn execute_custom_rejects_params_missing_report_text() {
        let adapter = CafrPdfAdapter::new(None);
        let params = serde_json::json!({"entity_name": "City of Example", "fiscal_year": 2024});
        assert!(adapter.execute_custom(&params).await.unwrap().is_err());
    }

    #[test]
    fn regex_fallback_parses_simple_table_rows() {
        let text = "General Fund $1,250,000.00 $900,000.00\nDebt Service Fund $50,000 $10,000";
        let funds = regex_fallback(text);
        assert_eq!(funds.len(), 2);
        assert_eq!(funds[0].fund_name, "General Fund");
        assert!((funds[0].fund_balance - 350_000.0).abs() < 1.0);
    }

    #[test]
    fn schema_keys_on_entity_year_and_fund() {
        let adapter = CafrPdfAdapter::new(None);
        let spec = adapter.schema_for(&serde_json::json!({})).unwrap();
        assert_eq!(
            spec.unique_key,
            vec!["entity_name".to_string(), "fiscal_year".to_string(), "fund_name".to_string()]
        );
    }
}
