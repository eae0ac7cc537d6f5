//! Two independent submissions against the same source and the same
//! upstream records should not duplicate rows — the Batch Writer upserts
//! on the adapter's declared unique key, so a re-run is a no-op on the
//! target table even though it is a brand new job.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::test_adapter::HttpJsonTestAdapter;
use common::TestHarness;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn rerunning_the_same_source_does_not_duplicate_rows() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "records": [{"id": "stable-1", "value": 42.0}]
        })))
        .mount(&mock_server)
        .await;

    let adapter = Arc::new(HttpJsonTestAdapter::new("idempotent_source", mock_server.uri()));
    let harness = TestHarness::start(vec![adapter]).await;

    let submit = || async {
        let response = harness
            .client
            .post(format!("{}/sources/idempotent_source/ingest", harness.base_url))
            .json(&serde_json::json!({}))
            .send()
            .await
            .unwrap();
        let body: serde_json::Value = response.json().await.unwrap();
        let job_id: uuid::Uuid = body["job_id"].as_str().unwrap().parse().unwrap();
        let record = harness.wait_for_terminal_status(job_id, Duration::from_secs(10)).await;
        assert_eq!(record["status"], "success");
        job_id
    };

    let first_job = submit().await;
    let second_job = submit().await;
    assert_ne!(first_job, second_job, "each submission is its own job row");

    let row_count: i64 =
        sqlx::query_scalar("SELECT count(*) FROM idempotent_source_records").fetch_one(&harness.pool).await.unwrap();
    assert_eq!(row_count, 1, "upsert on the unique key should not duplicate the row across job runs");

    let value: f64 = sqlx::query_scalar("SELECT value FROM idempotent_source_records WHERE id = 'stable-1'")
        .fetch_one(&harness.pool)
        .await
        .unwrap();
    assert_eq!(value, 42.0);
}
