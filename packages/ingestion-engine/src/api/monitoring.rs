use axum::extract::State;
use axum::Json;

use crate::error::{ApiError, ApiResult};
use crate::monitoring::{self, DashboardSnapshot};
use crate::state::AppState;

/// `GET /monitoring/dashboard`: the JSON aggregate only, no HTML rendering.
pub async fn dashboard(State(state): State<AppState>) -> ApiResult<Json<DashboardSnapshot>> {
    let snapshot = monitoring::dashboard(&state.pool).await.map_err(ApiError::Internal)?;
    Ok(Json(snapshot))
}
