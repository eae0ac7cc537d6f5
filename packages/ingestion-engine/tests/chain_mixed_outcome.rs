//! A chain whose two branches resolve oppositely: an `on_success` edge
//! should only unblock its dependent when the root actually succeeds, and
//! an `on_failure` edge should only unblock its dependent when the root
//! actually fails. Both branches run in the same chain execution so the
//! Dependency Engine's per-edge condition check, not just its DAG
//! structure, is what's under test.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::test_adapter::HttpJsonTestAdapter;
use common::TestHarness;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn wait_for_status_change(pool: &sqlx::PgPool, job_id: uuid::Uuid, from: &str, timeout: Duration) -> String {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let status: String = sqlx::query_scalar("SELECT status FROM ingestion_jobs WHERE id = $1")
            .bind(job_id)
            .fetch_one(pool)
            .await
            .unwrap();
        if status != from {
            return status;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("job {job_id} did not leave status '{from}' within {timeout:?}");
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

#[tokio::test]
async fn success_and_failure_edges_unblock_their_own_branch_only() {
    let mock_ok = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "records": [{"id": "x", "value": 1.0}]
        })))
        .mount(&mock_ok)
        .await;

    let mock_fail = MockServer::start().await;
    Mock::given(method("GET")).and(path("/records")).respond_with(ResponseTemplate::new(500)).mount(&mock_fail).await;

    let adapters: Vec<Arc<dyn ingestion_adapters::SourceAdapter>> = vec![
        Arc::new(HttpJsonTestAdapter::new("chain_root_ok", mock_ok.uri())),
        Arc::new(HttpJsonTestAdapter::new("chain_root_fail", mock_fail.uri()).with_max_retries(1)),
        Arc::new(HttpJsonTestAdapter::new("chain_dep_success", mock_ok.uri())),
        Arc::new(HttpJsonTestAdapter::new("chain_dep_failure", mock_ok.uri())),
    ];
    let harness = TestHarness::start(adapters).await;

    let chain_id = uuid::Uuid::new_v4();
    let definition = serde_json::json!({
        "nodes": [
            {"node_id": "root_ok", "source": "chain_root_ok", "payload": {}},
            {"node_id": "root_fail", "source": "chain_root_fail", "payload": {}},
            {"node_id": "dep_success", "source": "chain_dep_success", "payload": {}},
            {"node_id": "dep_failure", "source": "chain_dep_failure", "payload": {}},
        ],
        "edges": [
            {"from": "root_ok", "to": "dep_success", "condition": "on_success"},
            {"from": "root_fail", "to": "dep_failure", "condition": "on_failure"},
        ]
    });

    let response = harness
        .client
        .post(format!("{}/chains/{chain_id}/execute", harness.base_url))
        .json(&definition)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    let job_ids: Vec<uuid::Uuid> =
        body["job_ids"].as_array().unwrap().iter().map(|v| v.as_str().unwrap().parse().unwrap()).collect();
    let (root_ok_id, root_fail_id, dep_success_id, dep_failure_id) =
        (job_ids[0], job_ids[1], job_ids[2], job_ids[3]);

    let dep_success_status: String =
        sqlx::query_scalar("SELECT status FROM ingestion_jobs WHERE id = $1").bind(dep_success_id).fetch_one(&harness.pool).await.unwrap();
    assert_eq!(dep_success_status, "blocked");
    let dep_failure_status: String =
        sqlx::query_scalar("SELECT status FROM ingestion_jobs WHERE id = $1").bind(dep_failure_id).fetch_one(&harness.pool).await.unwrap();
    assert_eq!(dep_failure_status, "blocked");

    let root_ok_final = wait_for_status_change(&harness.pool, root_ok_id, "pending", Duration::from_secs(10)).await;
    assert_eq!(root_ok_final, "success");
    let root_fail_final = wait_for_status_change(&harness.pool, root_fail_id, "pending", Duration::from_secs(10)).await;
    assert_eq!(root_fail_final, "failed");

    let dep_success_unblocked = wait_for_status_change(&harness.pool, dep_success_id, "blocked", Duration::from_secs(10)).await;
    assert_ne!(dep_success_unblocked, "blocked");
    let dep_failure_unblocked = wait_for_status_change(&harness.pool, dep_failure_id, "blocked", Duration::from_secs(10)).await;
    assert_ne!(dep_failure_unblocked, "blocked");

    let dep_success_record = harness.wait_for_terminal_status(dep_success_id, Duration::from_secs(10)).await;
    assert_eq!(dep_success_record["status"], "success");
    let dep_failure_record = harness.wait_for_terminal_status(dep_failure_id, Duration::from_secs(10)).await;
    assert_eq!(dep_failure_record["status"], "success");
}
