//! Integration test harness: a real Postgres container with migrations
//! applied, a running instance of the engine's axum router, and a plain
//! `reqwest::Client` pointed at it — close to how a deployed instance is
//! actually exercised, since the router, poll loop, and Postgres access
//! layer are the parts worth testing together.

use std::sync::Arc;
use std::time::Duration;

use ingestion_adapters::SourceAdapter;
use ingestion_engine::config::Config;
use ingestion_engine::state::AppState;
use ingestion_engine::{api, build_job_runner, spawn_poll_loop};
use sqlx::PgPool;
use testcontainers::core::{ContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};

pub mod test_adapter;

pub struct TestHarness {
    pub pool: PgPool,
    pub base_url: String,
    pub client: reqwest::Client,
    _postgres: ContainerAsync<GenericImage>,
}

impl TestHarness {
    /// Starts a fresh Postgres container, runs migrations, and serves the
    /// router with `adapters` registered in its Job Runner. The poll loop
    /// ticks every 200ms so tests don't wait on the production 5-second
    /// cadence.
    pub async fn start(adapters: Vec<Arc<dyn SourceAdapter>>) -> Self {
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
        let database_url = format!("postgresql://postgres:postgres@{host}:{port}/postgres");

        let config = Config {
            database_url,
            bind_addr: "127.0.0.1:0".to_string(),
            max_concurrency_default: 4,
            rate_limit_ms_default: 0,
            batch_size: 1000,
            rule_seeder_min_rows: 50,
            lp_registry_path: None,
            fo_registry_path: None,
            eia_api_key: None,
            fred_api_key: None,
            census_api_key: None,
            bea_api_key: None,
            openai_api_key: None,
        };

        let pool = PgPool::connect(&config.database_url).await.expect("failed to connect to test database");
        sqlx::migrate!("./migrations").run(&pool).await.expect("failed to run migrations");

        let job_runner =
            build_job_runner(pool.clone(), config.batch_size, config.rule_seeder_min_rows, "test-worker", adapters);
        let state = AppState::new(pool.clone(), config, job_runner);

        spawn_poll_loop(state.clone(), Duration::from_millis(200));

        let app = api::router(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("failed to bind test listener");
        let addr = listener.local_addr().expect("listener has a local address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("test server exited unexpectedly");
        });

        Self { pool, base_url: format!("http://{addr}"), client: reqwest::Client::new(), _postgres: postgres }
    }

    /// Polls `GET /jobs/<id>` until its status leaves `pending`/`running`,
    /// or panics after `timeout` — the poll loop runs on its own schedule,
    /// so tests wait for it rather than assuming a fixed number of ticks.
    pub async fn wait_for_terminal_status(&self, job_id: uuid::Uuid, timeout: Duration) -> serde_json::Value {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let body: serde_json::Value = self
                .client
                .get(format!("{}/jobs/{job_id}", self.base_url))
                .send()
                .await
                .expect("request to /jobs/<id> failed")
                .json()
                .await
                .expect("response was not valid json");

            let status = body.get("status").and_then(|s| s.as_str()).unwrap_or("");
            if status != "pending" && status != "running" {
                return body;
            }
            if tokio::time::Instant::now() >= deadline {
                panic!("job {job_id} did not reach a terminal status within {timeout:?}, last seen: {body}");
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}
