//! EIA-shaped happy path: submit a job against a REST+JSON source that
//! answers on the first request, and see it reach SUCCESS with the rows
//! the mock response carried.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::test_adapter::HttpJsonTestAdapter;
use common::TestHarness;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn submitted_job_reaches_success_with_parsed_rows() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "records": [
                {"id": "a", "value": 1.5},
                {"id": "b", "value": 2.5},
            ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let adapter = Arc::new(HttpJsonTestAdapter::new("eia_like", mock_server.uri()));
    let harness = TestHarness::start(vec![adapter]).await;

    let response = harness
        .client
        .post(format!("{}/sources/eia_like/ingest", harness.base_url))
        .json(&serde_json::json!({}))
        .send()
        .await
        .expect("ingest request failed");
    assert_eq!(response.status(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    let job_id: uuid::Uuid = body["job_id"].as_str().unwrap().parse().unwrap();

    let record = harness.wait_for_terminal_status(job_id, Duration::from_secs(10)).await;
    assert_eq!(record["status"], "success");
    assert_eq!(record["rows_inserted"], 2);

    let table_count: i64 = sqlx::query_scalar("SELECT count(*) FROM eia_like_records")
        .fetch_one(&harness.pool)
        .await
        .unwrap();
    assert_eq!(table_count, 2);
}

#[tokio::test]
async fn unknown_source_is_rejected_before_a_job_row_is_created() {
    let harness = TestHarness::start(vec![]).await;

    let response = harness
        .client
        .post(format!("{}/sources/does_not_exist/ingest", harness.base_url))
        .json(&serde_json::json!({}))
        .send()
        .await
        .expect("ingest request failed");
    assert_eq!(response.status(), 400);

    let count: i64 = sqlx::query_scalar("SELECT count(*) FROM ingestion_jobs").fetch_one(&harness.pool).await.unwrap();
    assert_eq!(count, 0);
}
