//! A full orchestrator run against two fake collectors whose items
//! overlap on the same portfolio company: the higher-confidence item
//! should win the merge, the lower-confidence item's extra fields should
//! backfill anything the winner left out, and persistence against a real
//! table should land exactly one row, not one per source.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ingestion_collection::collector::Collector;
use ingestion_collection::error::CollectOutcome;
use ingestion_collection::orchestrator::CollectionOrchestrator;
use ingestion_collection::persistence::CollectionStore;
use ingestion_collection::types::{CollectedItem, CollectionConfig, Confidence, RegistryEntry};
use sqlx::PgPool;
use testcontainers::core::{ContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{GenericImage, ImageExt};

struct FakeCollector {
    source: &'static str,
    items: Vec<CollectedItem>,
}

#[async_trait]
impl Collector for FakeCollector {
    fn source(&self) -> &'static str {
        self.source
    }

    async fn collect(&self, _target: &RegistryEntry) -> CollectOutcome<Vec<CollectedItem>> {
        Ok(self.items.clone())
    }
}

fn portfolio_item(company_name: &str, extra: &[(&str, serde_json::Value)], confidence: Confidence) -> CollectedItem {
    let mut data = HashMap::new();
    data.insert("company_name".to_string(), serde_json::json!(company_name));
    for (key, value) in extra {
        data.insert(key.to_string(), value.clone());
    }
    CollectedItem::new("portfolio_company", data).with_confidence(confidence)
}

async fn connect() -> (PgPool, testcontainers::ContainerAsync<GenericImage>) {
    let postgres = GenericImage::new("postgres", "16-alpine")
        .with_wait_for(WaitFor::message_on_stderr("database system is ready to accept connections"))
        .with_exposed_port(ContainerPort::Tcp(5432))
        .with_env_var("POSTGRES_PASSWORD", "postgres")
        .with_env_var("POSTGRES_USER", "postgres")
        .with_env_var("POSTGRES_DB", "postgres")
        .start()
        .await
        .expect("failed to start postgres container");
    let host = postgres.get_host().await.expect("container host");
    let port = postgres.get_host_port_ipv4(5432).await.expect("container port");
    let pool = PgPool::connect(&format!("postgresql://postgres:postgres@{host}:{port}/postgres"))
        .await
        .expect("failed to connect to test database");
    (pool, postgres)
}

#[tokio::test]
async fn overlapping_items_across_sources_merge_into_one_row() {
    let (pool, _postgres) = connect().await;

    let target = RegistryEntry {
        id: "target-1".into(),
        name: "Example Fund".into(),
        target_type: "venture".into(),
        region: "us".into(),
        website_url: None,
        collection_priority: 1,
        last_collection_at: None,
    };

    let website_items = vec![
        portfolio_item("Acme Holdings, LLC", &[("sector", serde_json::json!("Fintech"))], Confidence::Medium),
        portfolio_item("Distinct Co", &[("sector", serde_json::json!("Biotech"))], Confidence::Medium),
    ];
    let news_items = vec![portfolio_item(
        "Acme Corp",
        &[("sector", serde_json::json!("Unused")), ("funding_round", serde_json::json!("Series B"))],
        Confidence::High,
    )
    .with_source_url("https://news.example/acme")];

    let orchestrator = CollectionOrchestrator::new(vec![target])
        .register_collector(Arc::new(FakeCollector { source: "website", items: website_items }))
        .register_collector(Arc::new(FakeCollector { source: "news", items: news_items }))
        .with_store(CollectionStore::new(pool.clone()));

    let config = CollectionConfig {
        sources: vec!["website".to_string(), "news".to_string()],
        mode: ingestion_collection::types::CollectionMode::Full,
        ..Default::default()
    };

    let results = orchestrator.run(&config).await;
    assert_eq!(results.len(), 2, "one result per registered collector");
    assert!(results.iter().all(|r| r.success));

    let rows: Vec<(String, String)> =
        sqlx::query_as("SELECT item_type, data FROM collected_items ORDER BY data").fetch_all(&pool).await.unwrap();
    assert_eq!(rows.len(), 2, "Acme's two sources merge into one row; Distinct Co stays separate");

    let acme_data: serde_json::Value = rows
        .iter()
        .map(|(_, data)| serde_json::from_str::<serde_json::Value>(data).unwrap())
        .find(|v| v["company_name"] == "Acme Corp")
        .expect("the high-confidence Acme spelling should have won the merge");

    assert_eq!(acme_data["sector"], "Fintech", "the higher-confidence item's own field wins over the runner-up's");
    assert_eq!(
        acme_data["funding_round"], "Series B",
        "a field only the lower-confidence item has should backfill onto the merged record"
    );
    assert_eq!(acme_data["additional_sources"][0], "https://news.example/acme");

    let progress = orchestrator.progress().await;
    assert_eq!(progress.completed, 1);
    assert_eq!(progress.succeeded, 1);
}

#[tokio::test]
async fn rerunning_the_same_target_does_not_duplicate_rows() {
    let (pool, _postgres) = connect().await;

    let target = RegistryEntry {
        id: "target-2".into(),
        name: "Repeat Fund".into(),
        target_type: "venture".into(),
        region: "us".into(),
        website_url: None,
        collection_priority: 1,
        last_collection_at: None,
    };

    let items = vec![portfolio_item("Stable Co", &[("sector", serde_json::json!("Logistics"))], Confidence::Medium)];

    let orchestrator = CollectionOrchestrator::new(vec![target])
        .register_collector(Arc::new(FakeCollector { source: "website", items }))
        .with_store(CollectionStore::new(pool.clone()));

    let config = CollectionConfig {
        sources: vec!["website".to_string()],
        mode: ingestion_collection::types::CollectionMode::Full,
        ..Default::default()
    };

    orchestrator.run(&config).await;
    orchestrator.run(&config).await;

    let row_count: i64 = sqlx::query_scalar("SELECT count(*) FROM collected_items").fetch_one(&pool).await.unwrap();
    assert_eq!(row_count, 1, "re-collecting an unchanged item upserts on content hash rather than duplicating");
}
