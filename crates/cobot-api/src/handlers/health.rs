//! Health check handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use cobot_media::ExternalTool;

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub mediainfo: CheckStatus,
    pub ffmpeg: CheckStatus,
    pub queue: CheckStatus,
}

#[derive(Serialize)]
pub struct CheckStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckStatus {
    fn ok(detail: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            detail: Some(detail.into()),
            error: None,
        }
    }

    fn error(msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            detail: None,
            error: Some(msg.into()),
        }
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

fn check_tool(tool: &ExternalTool) -> CheckStatus {
    match tool.locate() {
        Ok(path) => CheckStatus::ok(path.display().to_string()),
        Err(e) => CheckStatus::error(e.to_string()),
    }
}

/// Readiness check endpoint (readiness).
/// Checks that both external tools resolve and the executor accepts work.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let mediainfo = check_tool(&state.pipeline.mediainfo);
    let ffmpeg = check_tool(&state.pipeline.ffmpeg);

    let executor = &state.executor;
    let queue = if executor.is_shutting_down() {
        CheckStatus::error("shutting down")
    } else {
        CheckStatus::ok(format!(
            "{}/{} queued",
            executor.queued(),
            executor.queue_capacity()
        ))
    };

    let all_ok = mediainfo.is_ok() && ffmpeg.is_ok() && queue.is_ok();

    let response = ReadinessResponse {
        status: if all_ok { "ready" } else { "degraded" }.to_string(),
        checks: ReadinessChecks {
            mediainfo,
            ffmpeg,
            queue,
        },
    };

    if all_ok {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
