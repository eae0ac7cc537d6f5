//! A source that answers 429 with `Retry-After` once should still reach
//! SUCCESS: the fetcher's backoff honors the header rather than exhausting
//! the job on the first rate-limit response.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::test_adapter::HttpJsonTestAdapter;
use common::TestHarness;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn rate_limited_once_still_succeeds_on_retry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/records"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "1"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "records": [{"id": "a", "value": 1.0}]
        })))
        .mount(&mock_server)
        .await;

    let adapter = Arc::new(HttpJsonTestAdapter::new("rate_limited_source", mock_server.uri()));
    let harness = TestHarness::start(vec![adapter]).await;

    let response = harness
        .client
        .post(format!("{}/sources/rate_limited_source/ingest", harness.base_url))
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = response.json().await.unwrap();
    let job_id: uuid::Uuid = body["job_id"].as_str().unwrap().parse().unwrap();

    let record = harness.wait_for_terminal_status(job_id, Duration::from_secs(10)).await;
    assert_eq!(record["status"], "success");
    assert_eq!(record["rows_inserted"], 1);
}
