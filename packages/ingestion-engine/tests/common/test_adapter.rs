//! A minimal REST+JSON adapter, shaped like the EIA family but pointed at
//! a mock server instead of a fixed upstream host, for exercising the
//! Job Runner's plan -> fetch -> parse -> write path end to end without
//! depending on an adapter family's specific upstream contract.

use async_trait::async_trait;
use ingestion_adapters::{AdapterConfig, AdapterError, AdapterResult, FetchPlan, JobParams, PlannedRequest, SourceAdapter};
use serde::Deserialize;
use warehouse::{ColumnSpec, ColumnType, Row, SchemaSpec, Value};

#[derive(Debug, Deserialize)]
struct RecordEnvelope {
    records: Vec<RecordDatum>,
}

#[derive(Debug, Deserialize)]
struct RecordDatum {
    id: String,
    value: f64,
}

pub struct HttpJsonTestAdapter {
    name: &'static str,
    base_url: String,
    max_retries: u32,
    require_rows: bool,
}

impl HttpJsonTestAdapter {
    pub fn new(name: &'static str, base_url: impl Into<String>) -> Self {
        Self { name, base_url: base_url.into(), max_retries: 3, require_rows: false }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn require_rows(mut self) -> Self {
        self.require_rows = true;
        self
    }
}

#[async_trait]
impl SourceAdapter for HttpJsonTestAdapter {
    fn name(&self) -> &'static str {
        self.name
    }

    fn config(&self) -> AdapterConfig {
        AdapterConfig {
            max_concurrency: 2,
            max_retries: self.max_retries,
            rate_limit_interval_ms: 0,
            timeout_secs: 5,
            require_rows: self.require_rows,
        }
    }

    fn schema_for(&self, _params: &JobParams) -> AdapterResult<SchemaSpec> {
        Ok(SchemaSpec::new(format!("{}_records", self.name), vec!["id".into()])
            .with_column(ColumnSpec::new("id", ColumnType::Text).not_null())
            .with_column(ColumnSpec::new("value", ColumnType::Number)))
    }

    fn plan(&self, _params: &JobParams) -> AdapterResult<FetchPlan> {
        Ok(FetchPlan::single(PlannedRequest::get(format!("{}/records", self.base_url))))
    }

    fn parse(&self, _params: &JobParams, body: &[u8]) -> AdapterResult<Vec<Row>> {
        let envelope: RecordEnvelope =
            serde_json::from_slice(body).map_err(|e| AdapterError::Parse(e.to_string()))?;
        Ok(envelope
            .records
            .into_iter()
            .map(|r| {
                let mut row = Row::new();
                row.insert("id".to_string(), Value::Text(r.id));
                row.insert("value".to_string(), Value::Number(r.value));
                row
            })
            .collect())
    }
}
