use anyhow::{Context, Result};
use std::env;

/// Everything resolved once at startup; nothing here is mutated at runtime.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub max_concurrency_default: usize,
    pub rate_limit_ms_default: u64,
    pub batch_size: usize,
    pub rule_seeder_min_rows: usize,
    pub lp_registry_path: Option<String>,
    pub fo_registry_path: Option<String>,
    pub eia_api_key: Option<String>,
    pub fred_api_key: Option<String>,
    pub census_api_key: Option<String>,
    pub bea_api_key: Option<String>,
    pub openai_api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            max_concurrency_default: parse_or_default("INGESTION_MAX_CONCURRENCY_DEFAULT", 4)?,
            rate_limit_ms_default: parse_or_default("INGESTION_RATE_LIMIT_MS_DEFAULT", 250)?,
            batch_size: parse_or_default("INGESTION_BATCH_SIZE", 1000)?,
            rule_seeder_min_rows: parse_or_default("RULE_SEEDER_MIN_ROWS", 50)?,
            lp_registry_path: env::var("LP_REGISTRY_PATH").ok(),
            fo_registry_path: env::var("FO_REGISTRY_PATH").ok(),
            eia_api_key: env::var("EIA_API_KEY").ok(),
            fred_api_key: env::var("FRED_API_KEY").ok(),
            census_api_key: env::var("CENSUS_API_KEY").ok(),
            bea_api_key: env::var("BEA_API_KEY").ok(),
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse::<T>().map_err(|e| anyhow::anyhow!("{key} must be a valid number: {e}")),
        Err(_) => Ok(default),
    }
}
