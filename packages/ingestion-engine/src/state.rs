use std::sync::Arc;

use ingestion_jobs::JobRunner;
use sqlx::PgPool;
use warehouse::{DatasetRegistry, Provisioner};

use crate::config::Config;

/// Everything a handler needs, shared behind `Arc` clones rather than a
/// singleton — the same "engine-scoped context, no module-level pool"
/// shape the Table Provisioner and Batch Writer already follow.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub job_runner: Arc<JobRunner>,
    pub registry: Arc<DatasetRegistry>,
    pub provisioner: Arc<Provisioner>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config, job_runner: JobRunner) -> Self {
        let registry = DatasetRegistry::new(pool.clone());
        let provisioner = Provisioner::new(pool.clone());
        Self {
            pool,
            config: Arc::new(config),
            job_runner: Arc::new(job_runner),
            registry: Arc::new(registry),
            provisioner: Arc::new(provisioner),
        }
    }
}
