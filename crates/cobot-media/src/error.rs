//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while running external media tools.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("{tool} not found in PATH")]
    ToolNotFound { tool: String },

    #[error("{tool} failed: {message}")]
    ToolFailed {
        tool: String,
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("{tool} timed out after {secs} seconds")]
    Timeout { tool: String, secs: u64 },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Invalid subtitle template: {0}")]
    InvalidTemplate(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create a missing tool error.
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }

    /// Create a tool failure error.
    pub fn tool_failed(
        tool: impl Into<String>,
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// A required tool is missing; the environment, not the upload, is at fault.
    pub fn is_configuration(&self) -> bool {
        matches!(self, MediaError::ToolNotFound { .. })
    }

    /// Captured standard error of a failed tool, if any.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            MediaError::ToolFailed { stderr, .. } => stderr.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_errors() {
        assert!(MediaError::tool_not_found("ffmpeg").is_configuration());
        assert!(!MediaError::tool_failed("ffmpeg", "exit 1", None, Some(1)).is_configuration());
    }

    #[test]
    fn test_stderr_accessor() {
        let err = MediaError::tool_failed("mediainfo", "exit 1", Some("bad file".into()), Some(1));
        assert_eq!(err.stderr(), Some("bad file"));
        assert_eq!(err.to_string(), "mediainfo failed: exit 1");
    }
}
