use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use ingestion_adapters::{CafrPdfAdapter, EiaAdapter, SecEdgarAdapter, SourceAdapter, WebsiteCrawlerAdapter};
use ingestion_engine::config::Config;
use ingestion_engine::state::AppState;
use ingestion_engine::{api, build_job_runner, connect, spawn_poll_loop};
use llm_client::OpenAIClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ingestion_engine=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let _ = dotenvy::dotenv();
    let config = Config::from_env().context("failed to load configuration")?;

    tracing::info!("connecting to database");
    let pool = connect(&config).await.context("failed to connect to database or run migrations")?;

    let job_runner = build_job_runner(
        pool.clone(),
        config.batch_size,
        config.rule_seeder_min_rows,
        "ingestion-engine-poller",
        registered_adapters(&config),
    );
    let state = AppState::new(pool.clone(), config.clone(), job_runner);

    spawn_poll_loop(state.clone(), Duration::from_secs(5));

    let app = api::router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "ingestion engine listening");
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

fn registered_adapters(config: &Config) -> Vec<Arc<dyn SourceAdapter>> {
    let mut adapters: Vec<Arc<dyn SourceAdapter>> = vec![
        Arc::new(SecEdgarAdapter::new()),
        Arc::new(WebsiteCrawlerAdapter::new("website_crawler")),
        Arc::new(CafrPdfAdapter::new(config.openai_api_key.clone().map(OpenAIClient::new))),
    ];
    if let Some(eia_key) = &config.eia_api_key {
        adapters.push(Arc::new(EiaAdapter::new(eia_key.clone())));
    }
    adapters
}
