//! Pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

use cobot_media::ExternalTool;
use cobot_models::DEFAULT_DESCRIPTION;

/// Pipeline and executor configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Staging root for raw uploads
    pub upload_dir: PathBuf,
    /// Destination root for artifact sets
    pub record_dir: PathBuf,
    /// Metadata inspection tool
    pub mediainfo: ExternalTool,
    /// Transcoding tool
    pub ffmpeg: ExternalTool,
    /// Maximum concurrent jobs
    pub max_concurrent_jobs: usize,
    /// Jobs allowed to wait for a free slot before uploads are refused
    pub queue_capacity: usize,
    /// Upper bound for a single external tool invocation
    pub tool_timeout: Duration,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
    /// Optional WebVTT template replacing the built-in placeholder
    pub subtitle_template: Option<PathBuf>,
    /// Encoding profile label recorded on each media set
    pub description: String,
    /// Recent job reports kept for status queries
    pub job_history: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("upload"),
            record_dir: PathBuf::from("asset/record"),
            mediainfo: ExternalTool::mediainfo(),
            ffmpeg: ExternalTool::ffmpeg(),
            max_concurrent_jobs: 2,
            queue_capacity: 64,
            tool_timeout: Duration::from_secs(3600), // 1 hour
            shutdown_timeout: Duration::from_secs(30),
            subtitle_template: None,
            description: DEFAULT_DESCRIPTION.to_string(),
            job_history: 1024,
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            upload_dir: std::env::var("COBOT_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            record_dir: std::env::var("COBOT_RECORD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.record_dir),
            mediainfo: std::env::var("COBOT_MEDIAINFO_BIN")
                .ok()
                .and_then(|s| ExternalTool::from_command_line("mediainfo", &s))
                .unwrap_or(defaults.mediainfo),
            ffmpeg: std::env::var("COBOT_FFMPEG_BIN")
                .ok()
                .and_then(|s| ExternalTool::from_command_line("ffmpeg", &s))
                .unwrap_or(defaults.ffmpeg),
            max_concurrent_jobs: std::env::var("COBOT_MAX_CONCURRENT_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_concurrent_jobs),
            queue_capacity: std::env::var("COBOT_QUEUE_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.queue_capacity),
            tool_timeout: std::env::var("COBOT_TOOL_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.tool_timeout),
            shutdown_timeout: std::env::var("COBOT_SHUTDOWN_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.shutdown_timeout),
            subtitle_template: std::env::var("COBOT_SUBTITLE_TEMPLATE")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            description: std::env::var("COBOT_PROFILE_DESCRIPTION")
                .unwrap_or(defaults.description),
            job_history: std::env::var("COBOT_JOB_HISTORY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.job_history),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.upload_dir, PathBuf::from("upload"));
        assert_eq!(config.record_dir, PathBuf::from("asset/record"));
        assert_eq!(config.ffmpeg.name(), "ffmpeg");
        assert!(config.max_concurrent_jobs > 0);
        assert!(config.queue_capacity > 0);
    }
}
