//! SEC EDGAR submissions adapter: one CIK's filing index
//! (`https://data.sec.gov/submissions/CIK{cik}.json`). SEC requires a
//! descriptive `User-Agent` identifying the requester on every request —
//! enforced here rather than left to the caller.

use async_trait::async_trait;
use serde::Deserialize;
use warehouse::{ColumnSpec, ColumnType, Row, SchemaSpec, Value};

use crate::adapter::{AdapterConfig, JobParams, SourceAdapter};
use crate::error::{AdapterError, AdapterResult};
use crate::plan::{FetchPlan, PlannedRequest};

const SEC_USER_AGENT: &str = "Minnesota Digital Aid research@mndigitalaid.org";

#[derive(Debug, Deserialize)]
struct SecJobParams {
    cik: String,
}

#[derive(Debug, Deserialize)]
struct SecSubmissions {
    name: String,
    filings: SecFilings,
}

#[derive(Debug, Deserialize)]
struct SecFilings {
    recent: SecRecentFilings,
}

#[derive(Debug, Deserialize)]
struct SecRecentFilings {
    form: Vec<String>,
    filing_date: Vec<String>,
    accession_number: Vec<String>,
    primary_document: Vec<String>,
}

pub struct SecEdgarAdapter;

impl SecEdgarAdapter {
    pub fn new() -> Self {
        Self
    }

    fn parsed_params(&self, params: &JobParams) -> AdapterResult<SecJobParams> {
        serde_json::from_value(params.clone())
            .map_err(|e| AdapterError::Config(format!("invalid SEC EDGAR job params: {e}")))
    }
}

impl Default for SecEdgarAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceAdapter for SecEdgarAdapter {
    fn name(&self) -> &'static str {
        "sec_edgar"
    }

    fn config(&self) -> AdapterConfig {
        AdapterConfig {
            max_concurrency: 5,
            max_retries: 3,
            rate_limit_interval_ms: 150,
            timeout_secs: 30,
            require_rows: false,
        }
    }

    fn schema_for(&self, _params: &JobParams) -> AdapterResult<SchemaSpec> {
        Ok(SchemaSpec::new("sec_edgar_filings", vec!["cik".into(), "accession_number".into()])
            .with_column(ColumnSpec::new("cik", ColumnType::Text).not_null())
            .with_column(ColumnSpec::new("entity_name", ColumnType::Text))
            .with_column(ColumnSpec::new("accession_number", ColumnType::Text).not_null())
            .with_column(ColumnSpec::new("form", ColumnType::Text))
            .with_column(ColumnSpec::new("filing_date", ColumnType::Text))
            .with_column(ColumnSpec::new("primary_document", ColumnType::Text))
            .with_index("sec_edgar_filings_form_idx", vec!["form".into()]))
    }

    fn plan(&self, params: &JobParams) -> AdapterResult<FetchPlan> {
        let p = self.parsed_params(params)?;
        let padded_cik = format!("{:0>10}", p.cik);
        let request = PlannedRequest::get(format!(
            "https://data.sec.gov/submissions/CIK{padded_cik}.json"
        ))
        .with_header("User-Agent", SEC_USER_AGENT);
        Ok(FetchPlan::single(request))
    }

    fn parse(&self, params: &JobParams, body: &[u8]) -> AdapterResult<Vec<Row>> {
        let p = self.parsed_params(params)?;
        let submissions: SecSubmissions =
            serde_json::from_slice(body).map_err(|e| AdapterError::Parse(e.to_string()))?;

        let recent = submissions.filings.recent;
        let rows = recent
            .form
            .iter()
            .zip(recent.filing_date.iter())
            .zip(recent.accession_number.iter())
            .zip(recent.primary_document.iter())
            .map(|(((form, filing_date), accession), primary_document)| {
                let mut row = Row::new();
                row.insert("cik".to_string(), Value::Text(p.cik.clone()));
                row.insert("entity_name".to_string(), Value::Text(submissions.name.clone()));
                row.insert("accession_number".to_string(), Value::Text(accession.clone()));
                row.insert("form".to_string(), Value::Text(form.clone()));
                row.insert("filing_date".to_string(), Value::Text(filing_date.clone()));
                row.insert("primary_document".to_string(), Value::Text(primary_document.clone()));
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
    fn cik_is_zero_padded_to_ten_digits() {
        let adapter = SecEdgarAdapter::new();
        let plan = adapter.plan(&serde_json::json!({"cik": "320193"})).unwrap();
        assert!(plan.requests[0].url.contains("CIK0000320193.json"));
    }

    #[test]
    fn every_request_carries_a_descriptive_user_agent() {
        let adapter = SecEdgarAdapter::new();
        let plan = adapter.plan(&serde_json::json!({"cik": "320193"})).unwrap();
        assert_eq!(plan.requests[0].headers.get("User-Agent"), Some(&SEC_USER_AGENT.to_string()));
    }
}
