use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::jobs_repo;
use crate::state::AppState;

/// `GET /jobs/<id>`: the full job record, or 404.
pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<jobs_repo::JobRecord>> {
    let record = jobs_repo::get_by_id(&state.pool, id).await.map_err(ApiError::Internal)?;
    record.map(Json).ok_or_else(|| ApiError::NotFound(format!("no job with id {id}")))
}

/// `POST /jobs/<id>/retry`: the Retry Scheduler's immediate-retry path —
/// resets a FAILED job to PENDING right away, ignoring backoff.
pub async fn retry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let retried = jobs_repo::retry_immediately(&state.pool, id).await.map_err(ApiError::Internal)?;
    if !retried {
        return Err(ApiError::NotFound(format!("no failed job with id {id} to retry")));
    }
    Ok((StatusCode::OK, Json(json!({ "job_id": id, "status": "pending" }))))
}
