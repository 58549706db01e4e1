//! Discovery and captured invocation of external tools.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// An external program the pipeline depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalTool {
    /// Name used in logs and errors
    name: String,
    /// Program name (resolved through PATH) or explicit path
    program: PathBuf,
    /// Arguments placed before the caller's (e.g. a wrapper's own flags)
    prefix_args: Vec<String>,
}

/// Captured result of a tool run.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub success: bool,
}

impl ExternalTool {
    pub fn new(name: impl Into<String>, program: impl AsRef<Path>) -> Self {
        Self {
            name: name.into(),
            program: program.as_ref().to_path_buf(),
            prefix_args: Vec::new(),
        }
    }

    /// Parse a whitespace-separated command line such as `nice -n 10 ffmpeg`.
    ///
    /// The first word is the program, the rest become prefix arguments.
    /// Returns `None` for a blank line.
    pub fn from_command_line(name: impl Into<String>, line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let program = words.next()?;
        Some(Self::new(name, program).with_prefix_args(words))
    }

    /// Set arguments passed ahead of every invocation's own arguments.
    pub fn with_prefix_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prefix_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// The metadata inspection tool.
    pub fn mediainfo() -> Self {
        Self::new("mediainfo", "mediainfo")
    }

    /// The transcoding tool.
    pub fn ffmpeg() -> Self {
        Self::new("ffmpeg", "ffmpeg")
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn prefix_args(&self) -> &[String] {
        &self.prefix_args
    }

    /// Resolve the program to an executable path.
    pub fn locate(&self) -> MediaResult<PathBuf> {
        which::which(&self.program).map_err(|_| MediaError::tool_not_found(&self.name))
    }

    /// Run the tool to completion, capturing stdout and stderr separately.
    ///
    /// The child is killed if `timeout` elapses first.
    pub async fn run_captured<I, S>(
        &self,
        args: I,
        timeout: Option<Duration>,
    ) -> MediaResult<ToolOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let path = self.locate()?;
        let mut cmd = Command::new(&path);
        cmd.args(&self.prefix_args)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(tool = %self.name, path = %path.display(), "Running external tool");

        let output = match timeout {
            Some(limit) => match tokio::time::timeout(limit, cmd.output()).await {
                Ok(result) => result?,
                Err(_) => {
                    return Err(MediaError::Timeout {
                        tool: self.name.clone(),
                        secs: limit.as_secs(),
                    })
                }
            },
            None => cmd.output().await?,
        };

        Ok(ToolOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code(),
            success: output.status.success(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tool_is_configuration_error() {
        let tool = ExternalTool::new("mediainfo", "cobot-definitely-missing-tool");
        let err = tokio_test::assert_err!(tool.locate());
        assert!(err.is_configuration());
        assert_eq!(err.to_string(), "mediainfo not found in PATH");
    }

    #[test]
    fn test_from_command_line() {
        let tool = ExternalTool::from_command_line("ffmpeg", "  nice -n 10 ffmpeg ").unwrap();
        assert_eq!(tool.program(), Path::new("nice"));
        assert_eq!(tool.prefix_args(), ["-n", "10", "ffmpeg"]);
        assert!(ExternalTool::from_command_line("ffmpeg", "   ").is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_captured_separates_streams() {
        let tool = ExternalTool::new("sh", "sh").with_prefix_args(["-c"]);
        let output = tool
            .run_captured(["echo out; echo err >&2; exit 3"], None)
            .await
            .unwrap();

        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
        assert_eq!(output.exit_code, Some(3));
        assert!(!output.success);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_captured_timeout() {
        let tool = ExternalTool::new("sleep", "sleep");
        let err = tool
            .run_captured(["5"], Some(Duration::from_millis(100)))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Timeout { .. }));
    }
}
