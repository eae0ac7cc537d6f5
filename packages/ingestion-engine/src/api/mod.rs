mod chains;
mod ingest;
mod jobs;
mod monitoring;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/sources/{src}/ingest", post(ingest::submit))
        .route("/jobs/{id}", get(jobs::get))
        .route("/jobs/{id}/retry", post(jobs::retry))
        .route("/chains/{id}/execute", post(chains::execute))
        .route("/monitoring/dashboard", get(monitoring::dashboard))
        .with_state(state)
}
