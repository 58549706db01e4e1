//! Job status handler.

use axum::extract::{Path, State};
use axum::Json;

use cobot_models::{JobId, JobReport};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Latest report of a recent job.
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobReport>> {
    state
        .executor
        .report(&JobId::from_string(job_id.as_str()))
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Job {} not found", job_id)))
}
