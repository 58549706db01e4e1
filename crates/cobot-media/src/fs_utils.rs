//! Filesystem helpers for staging and artifact directories.

use std::io;
use std::path::Path;
use tokio::fs;

use crate::error::MediaResult;

/// Mode requested for directories created on demand (umask still applies).
#[cfg(unix)]
const DIR_MODE: u32 = 0o777;

/// Create `path` and its parents if absent.
///
/// Idempotent: an existing directory is not an error.
pub async fn ensure_dir(path: impl AsRef<Path>) -> MediaResult<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(DIR_MODE);
    builder.create(path.as_ref()).await?;
    Ok(())
}

/// Remove a file, treating "already gone" as success.
///
/// Returns `true` when a file was actually removed.
pub async fn remove_if_exists(path: impl AsRef<Path>) -> MediaResult<bool> {
    match fs::remove_file(path.as_ref()).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_ensure_dir_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("record").join("20240102T030405");

        ensure_dir(&nested).await.unwrap();
        ensure_dir(&nested).await.unwrap();

        assert!(nested.is_dir());
    }

    #[tokio::test]
    async fn test_remove_if_exists() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("cobot-1.mov");
        fs::write(&file, b"data").await.unwrap();

        assert!(remove_if_exists(&file).await.unwrap());
        assert!(!file.exists());
        assert!(!remove_if_exists(&file).await.unwrap());
    }
}
