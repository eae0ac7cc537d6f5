use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::chains::{self, ChainDefinition, ChainError};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ExecuteResponse {
    pub chain_id: Uuid,
    pub job_ids: Vec<Uuid>,
}

/// `POST /chains/<id>/execute`: registers the chain's DAG and submits its
/// root jobs; dependents stay BLOCKED until the poll loop's advance step
/// unblocks them.
pub async fn execute(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(definition): Json<ChainDefinition>,
) -> ApiResult<(StatusCode, Json<ExecuteResponse>)> {
    let job_runner = state.job_runner.clone();
    let job_ids = chains::execute(&state.pool, id, definition, move |source| job_runner.max_retries_for(source))
        .await
        .map_err(|e| match e {
        ChainError::Cycle | ChainError::UnknownNode(_) => ApiError::BadRequest(e.to_string()),
        ChainError::Db(e) => ApiError::Internal(e.into()),
    })?;
    Ok((StatusCode::CREATED, Json(ExecuteResponse { chain_id: id, job_ids })))
}
