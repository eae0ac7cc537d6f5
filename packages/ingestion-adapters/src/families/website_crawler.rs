//! Website-crawler adapter family: drives `fetch-client`'s `Ingestor`
//! directly rather than going through `plan()`'s single-request model,
//! since a crawl is a BFS over an unbounded set of pages decided at fetch
//! time rather than a fixed request list known up front.

use async_trait::async_trait;
use fetch_client::{CrawlConfig, HttpIngestor, Ingestor, IngestorExt, RawPage, ValidatedIngestor};
use warehouse::{ColumnSpec, ColumnType, Row, SchemaSpec, Value};

use crate::adapter::{AdapterConfig, JobParams, SourceAdapter};
use crate::error::{AdapterError, AdapterResult};
use crate::plan::FetchPlan;

pub struct WebsiteCrawlerAdapter {
    name: &'static str,
}

impl WebsiteCrawlerAdapter {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }

    fn parsed_config(&self, params: &JobParams) -> AdapterResult<CrawlConfig> {
        let url = params
            .get("url")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AdapterError::Config("missing url".to_string()))?;
        let mut config = CrawlConfig::new(url);
        if let Some(max_pages) = params.get("max_pages").and_then(|v| v.as_u64()) {
            config = config.with_max_pages(max_pages as usize);
        }
        Ok(config)
    }

    /// Crawl and return pages converted to rows. Not part of `SourceAdapter`
    /// (crawling is not a single request the Job Runner can replay from a
    /// `FetchPlan`), called directly by the job that drives this adapter.
    pub async fn crawl(&self, params: &JobParams) -> AdapterResult<Vec<Row>> {
        let interval_ms = self.config().rate_limit_interval_ms.max(1);
        let requests_per_second = (1000 / interval_ms).max(1) as u32;
        let ingestor =
            ValidatedIngestor::new(HttpIngestor::new()).rate_limited(requests_per_second);
        self.crawl_via(params, &ingestor).await
    }

    /// Core of `crawl`, parameterized over the `Ingestor` so tests can
    /// substitute a `MockIngestor` instead of issuing real HTTP requests.
    async fn crawl_via(&self, params: &JobParams, ingestor: &dyn Ingestor) -> AdapterResult<Vec<Row>> {
        let config = self.parsed_config(params)?;
        let pages: Vec<RawPage> = ingestor
            .discover(&config.to_discover_config())
            .await
            .map_err(AdapterError::from)?;
        Ok(pages.into_iter().map(page_to_row).collect())
    }
}

fn page_to_row(page: RawPage) -> Row {
    let mut row = Row::new();
    row.insert("url".to_string(), Value::Text(page.url));
    row.insert("title".to_string(), page.title.map(Value::Text).unwrap_or(Value::Null));
    row.insert("content".to_string(), Value::Text(page.content));
    row.insert(
        "content_type".to_string(),
        page.content_type.map(Value::Text).unwrap_or(Value::Null),
    );
    row.insert("fetched_at".to_string(), Value::Timestamp(page.fetched_at));
    row
}

#[async_trait]
impl SourceAdapter for WebsiteCrawlerAdapter {
    fn name(&self) -> &'static str {
        self.name
    }

    fn config(&self) -> AdapterConfig {
        AdapterConfig {
            max_concurrency: 3,
            max_retries: 2,
            rate_limit_interval_ms: 500,
            timeout_secs: 20,
            require_rows: false,
        }
    }

    fn schema_for(&self, _params: &JobParams) -> AdapterResult<SchemaSpec> {
        Ok(SchemaSpec::new(format!("{}_pages", self.name), vec!["url".into()])
            .with_column(ColumnSpec::new("url", ColumnType::Text).not_null())
            .with_column(ColumnSpec::new("title", ColumnType::Text))
            .with_column(ColumnSpec::new("content", ColumnType::Text))
            .with_column(ColumnSpec::new("content_type", ColumnType::Text))
            .with_column(ColumnSpec::new("fetched_at", ColumnType::Timestamp).not_null()))
    }

    /// No single request to plan; the crawl is driven by `execute_custom`.
    fn plan(&self, _params: &JobParams) -> AdapterResult<FetchPlan> {
        Ok(FetchPlan::default())
    }

    /// Crawling doesn't go through a fetched `body`; rows come from
    /// `crawl()` instead.
    fn parse(&self, _params: &JobParams, _body: &[u8]) -> AdapterResult<Vec<Row>> {
        Ok(Vec::new())
    }

    async fn execute_custom(&self, params: &JobParams) -> Option<AdapterResult<Vec<Row>>> {
        Some(self.crawl(params).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fetch_client::MockIngestorBuilder;

    #[test]
    fn schema_is_keyed_on_url() {
        let adapter = WebsiteCrawlerAdapter::new("redcross");
        let spec = adapter.schema_for(&serde_json::json!({})).unwrap();
        assert_eq!(spec.table_name, "redcross_pages");
        assert_eq!(spec.unique_key, vec!["url".to_string()]);
    }

    #[test]
    fn rejects_missing_url() {
        let adapter = WebsiteCrawlerAdapter::new("redcross");
        assert!(adapter.parsed_config(&serde_json::json!({})).is_err());
    }

    #[tokio::test]
    async fn crawl_via_turns_discovered_pages_into_rows() {
        let adapter = WebsiteCrawlerAdapter::new("redcross");
        let mock = MockIngestorBuilder::new()
            .page_with_title("https://redcross.org/", "Home", "welcome")
            .page_with_title("https://redcross.org/donate", "Donate", "give now")
            .build();

        let params = serde_json::json!({"url": "https://redcross.org/"});
        let rows = adapter.crawl_via(&params, &mock).await.unwrap();

        assert_eq!(rows.len(), 2);
        assert!(rows.iter().any(|r| r.get("url") == Some(&Value::Text("https://redcross.org/donate".to_string()))));
    }

    #[tokio::test]
    async fn execute_custom_delegates_to_crawl() {
        let adapter = WebsiteCrawlerAdapter::new("redcross");
        let params = serde_json::json!({});
        assert!(adapter.execute_custom(&params).await.unwrap().is_err());
    }
}
