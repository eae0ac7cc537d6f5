use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::jobs_repo;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub job_id: uuid::Uuid,
    pub status: &'static str,
    pub check_url: String,
}

/// `POST /sources/<src>/ingest`: creates a PENDING job and returns
/// immediately. Execution happens on the next poll cycle; this handler
/// never runs an adapter inline.
pub async fn submit(
    State(state): State<AppState>,
    Path(src): Path<String>,
    Json(payload): Json<Value>,
) -> ApiResult<(StatusCode, Json<SubmitResponse>)> {
    if !state.job_runner.has_adapter(&src) {
        return Err(ApiError::BadRequest(format!("unknown source: {src}")));
    }

    let max_retries = state.job_runner.max_retries_for(&src);
    let job_id = jobs_repo::submit_job(&state.pool, &src, &payload, "pending", None, None, max_retries)
        .await
        .map_err(ApiError::Internal)?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse { job_id, status: "pending", check_url: format!("/jobs/{job_id}") }),
    ))
}
