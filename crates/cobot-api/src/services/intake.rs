//! Upload staging.
//!
//! Streams one multipart field into a uniquely named file under the staging
//! root and makes it durable before the pipeline may see it.

use std::path::{Path, PathBuf};

use axum::extract::multipart::{Field, MultipartError};
use axum::http::StatusCode;
use cobot_models::{staging_extension, STAGING_PREFIX};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};

/// A raw upload persisted in the staging root.
#[derive(Debug, Clone)]
pub struct StagedUpload {
    pub path: PathBuf,
    /// Client-supplied file name, as sent
    pub original_name: String,
    pub bytes: u64,
}

/// Map a multipart read failure to an API error.
pub fn multipart_error(err: MultipartError, limit: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge { limit }
    } else {
        ApiError::bad_request(format!("Invalid multipart body: {}", err.body_text()))
    }
}

/// Stream `field` into a fresh `cobot-*<ext>` file under `upload_dir`.
///
/// The file is flushed to disk before returning. On any failure the partial
/// file is removed.
pub async fn stage_field(
    upload_dir: &Path,
    mut field: Field<'_>,
    limit: usize,
) -> ApiResult<StagedUpload> {
    let original_name = field.file_name().unwrap_or_default().to_string();
    let extension = staging_extension(&original_name);

    let (file, path) = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .suffix(&extension)
        .tempfile_in(upload_dir)
        .and_then(|temp| temp.keep().map_err(|e| e.error))
        .map_err(|e| {
            ApiError::internal(format!(
                "Failed to create staging file in {}: {}",
                upload_dir.display(),
                e
            ))
        })?;
    let mut file = tokio::fs::File::from_std(file);

    let mut bytes = 0u64;
    loop {
        let chunk = match field.chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(e) => {
                discard_staged(&path).await;
                return Err(multipart_error(e, limit));
            }
        };
        if let Err(e) = file.write_all(&chunk).await {
            discard_staged(&path).await;
            return Err(ApiError::internal(format!(
                "Failed to write {}: {}",
                path.display(),
                e
            )));
        }
        bytes += chunk.len() as u64;
    }

    if let Err(e) = file.sync_all().await {
        discard_staged(&path).await;
        return Err(ApiError::internal(format!(
            "Failed to flush {}: {}",
            path.display(),
            e
        )));
    }

    info!("{} is stored to {} ({} bytes)", original_name, path.display(), bytes);

    Ok(StagedUpload {
        path,
        original_name,
        bytes,
    })
}

/// Remove a staged file that no job will own.
pub async fn discard_staged(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Failed to remove staged file {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_discard_missing_file_is_quiet() {
        let dir = TempDir::new().unwrap();
        discard_staged(&dir.path().join("cobot-missing.mov")).await;
    }

    #[tokio::test]
    async fn test_discard_removes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cobot-1.mov");
        std::fs::write(&path, b"x").unwrap();

        discard_staged(&path).await;

        assert!(!path.exists());
    }
}
