//! Upload intake handler.

use axum::extract::{Multipart, State};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};

use cobot_models::{ArtifactKind, Identifier, JobId, MediaSet};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::services::{discard_staged, multipart_error, stage_field, StagedUpload};
use crate::state::AppState;

/// Multipart field carrying the file.
pub const UPLOAD_FIELD: &str = "myFile";

/// Acknowledgement sent once the upload is staged and queued.
pub const UPLOAD_ACK: &str = "Successfully did upload the file and being processed it.";

/// Route prefix under which the destination root is served.
pub const RECORD_ROUTE: &str = "/record";

#[derive(Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub job_id: JobId,
    pub stem: String,
    /// URL paths the artifacts will be served from once the job finishes
    pub artifacts: Vec<String>,
}

/// Accept one file, stage it durably and queue the pipeline job.
///
/// Responds before any processing happens; the job outcome is only visible
/// through `GET /api/jobs/:job_id`, logs and metrics.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let limit = state.config.max_body_size;

    let staged = loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => {
                metrics::record_upload_rejected("missing_field");
                return Err(ApiError::bad_request(format!(
                    "Missing file field '{}'",
                    UPLOAD_FIELD
                )));
            }
            Err(e) => {
                metrics::record_upload_rejected("invalid_body");
                return Err(multipart_error(e, limit));
            }
        };

        if field.name() == Some(UPLOAD_FIELD) {
            break stage_field(&state.pipeline.upload_dir, field, limit)
                .await
                .inspect_err(|_| metrics::record_upload_rejected("staging_failed"))?;
        }
    };

    let StagedUpload {
        path,
        original_name,
        bytes,
    } = staged;

    let set = match describe(&state, &path) {
        Ok(set) => set,
        Err(e) => {
            error!("Cannot process {}: {}", original_name, e);
            discard_staged(&path).await;
            metrics::record_upload_rejected("staging_failed");
            return Err(e);
        }
    };
    info!("{}", set);

    let stem = set.dest_name.clone();
    let artifacts = ArtifactKind::ALL
        .iter()
        .map(|kind| format!("{}/{}", RECORD_ROUTE, set.artifact_relative_path(*kind)))
        .collect();

    let handle = match state.executor.submit(set) {
        Ok(handle) => handle,
        Err(e) => {
            // No job owns the staged file
            warn!("Refusing {}: {}", original_name, e);
            discard_staged(&path).await;
            metrics::record_upload_rejected(if e.is_backpressure() {
                "queue_full"
            } else {
                "submit_failed"
            });
            return Err(e.into());
        }
    };

    metrics::record_upload_accepted(bytes);

    Ok(Json(UploadResponse {
        message: UPLOAD_ACK.to_string(),
        job_id: handle.job_id().clone(),
        stem,
        artifacts,
    }))
}

/// Build the media descriptor for a staged file.
fn describe(state: &AppState, staged: &std::path::Path) -> ApiResult<MediaSet> {
    let identifier = Identifier::generate().map_err(|e| ApiError::internal(e.to_string()))?;
    MediaSet::new(
        staged,
        &state.pipeline.record_dir,
        Utc::now(),
        &identifier,
        state.pipeline.description.as_str(),
    )
    .map_err(|e| ApiError::internal(e.to_string()))
}
