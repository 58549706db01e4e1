//! FFmpeg command builder and runner.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};
use crate::progress::{is_progress_line, parse_progress_line, FfmpegProgress};
use crate::tool::ExternalTool;

/// Stderr lines kept for error reports.
const STDERR_TAIL_LINES: usize = 40;

/// Options and path of one FFmpeg output.
///
/// FFmpeg applies options to the output file that follows them, so each
/// output carries its own argument list.
#[derive(Debug, Clone)]
pub struct OutputSpec {
    args: Vec<String>,
    path: PathBuf,
}

impl OutputSpec {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            args: Vec::new(),
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Add a raw output argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Set video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.arg("-vf").arg(filter)
    }

    /// Set video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.arg("-c:v").arg(codec)
    }

    /// Set audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.arg("-c:a").arg(codec)
    }

    /// Drop audio streams.
    pub fn no_audio(self) -> Self {
        self.arg("-an")
    }

    /// Set output frame rate.
    pub fn frame_rate(self, fps: u32) -> Self {
        self.arg("-r").arg(fps.to_string())
    }

    /// Force the container format.
    pub fn format(self, format: impl Into<String>) -> Self {
        self.arg("-f").arg(format)
    }

    /// Relocate the moov atom to the file start for progressive playback.
    pub fn faststart(self) -> Self {
        self.arg("-movflags").arg("+faststart")
    }

    /// Seek the output (decode and discard up to `seconds`).
    pub fn seek(self, seconds: f64) -> Self {
        self.arg("-ss").arg(format!("{:.3}", seconds))
    }

    /// Extract a single frame.
    pub fn single_frame(self) -> Self {
        self.arg("-frames:v").arg("1")
    }
}

/// Builder for single-input, multi-output FFmpeg commands.
///
/// Outputs are always overwritten and only errors are logged.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    input: PathBuf,
    /// Outputs, in order
    outputs: Vec<OutputSpec>,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command.
    pub fn new(input: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            outputs: Vec::new(),
        }
    }

    /// Append an output.
    pub fn output(mut self, output: OutputSpec) -> Self {
        self.outputs.push(output);
        self
    }

    /// Paths of all outputs, in order.
    pub fn output_paths(&self) -> Vec<PathBuf> {
        self.outputs.iter().map(|o| o.path.clone()).collect()
    }

    /// Build the argument vector.
    pub fn build_args(&self) -> Vec<String> {
        // Machine-readable progress on stderr, no interactive stats line
        let mut args: Vec<String> = [
            "-hide_banner",
            "-y",
            "-v",
            "error",
            "-nostats",
            "-progress",
            "pipe:2",
            "-i",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        args.push(self.input.to_string_lossy().to_string());

        for output in &self.outputs {
            args.extend(output.args.iter().cloned());
            args.push(output.path.to_string_lossy().to_string());
        }

        args
    }
}

/// Runner for FFmpeg commands with progress tracking and a timeout.
#[derive(Debug, Clone)]
pub struct FfmpegRunner {
    tool: ExternalTool,
    timeout: Option<Duration>,
}

impl Default for FfmpegRunner {
    fn default() -> Self {
        Self::new(ExternalTool::ffmpeg())
    }
}

impl FfmpegRunner {
    pub fn new(tool: ExternalTool) -> Self {
        Self {
            tool,
            timeout: None,
        }
    }

    /// Set timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn tool(&self) -> &ExternalTool {
        &self.tool
    }

    /// Run an FFmpeg command.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        self.run_with_progress(cmd, |_| {}).await
    }

    /// Run an FFmpeg command with progress callback.
    ///
    /// Non-progress stderr lines are kept and attached to the error when
    /// FFmpeg fails.
    pub async fn run_with_progress<F>(
        &self,
        cmd: &FfmpegCommand,
        progress_callback: F,
    ) -> MediaResult<()>
    where
        F: Fn(FfmpegProgress) + Send + 'static,
    {
        let path = self.tool.locate()?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: {} {}", path.display(), args.join(" "));

        let mut child = Command::new(&path)
            .args(self.tool.prefix_args())
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("FFmpeg stderr not captured"))?;
        let mut reader = BufReader::new(stderr);

        // Drain until EOF so FFmpeg never writes into a closed pipe
        let stderr_handle = tokio::spawn(async move {
            let mut current = FfmpegProgress::default();
            let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
            let mut buf = Vec::new();

            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf).await {
                    Ok(0) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Failed to read FFmpeg stderr: {}", e);
                        break;
                    }
                }

                let line = String::from_utf8_lossy(&buf);
                for segment in line.split(['\r', '\n']).filter(|s| !s.trim().is_empty()) {
                    if is_progress_line(segment) {
                        if let Some(progress) = parse_progress_line(segment, &mut current) {
                            progress_callback(progress);
                        }
                    } else {
                        if tail.len() == STDERR_TAIL_LINES {
                            tail.pop_front();
                        }
                        tail.push_back(segment.to_string());
                    }
                }
            }

            Vec::from(tail).join("\n")
        });

        let status = self.wait_for_completion(&mut child).await;
        let captured = stderr_handle.await.unwrap_or_default();

        match status {
            Ok(Some(code)) if code != 0 => Err(MediaError::tool_failed(
                self.tool.name(),
                format!("exited with status {}", code),
                Some(captured),
                Some(code),
            )),
            Ok(Some(_)) => Ok(()),
            Ok(None) => Err(MediaError::tool_failed(
                self.tool.name(),
                "terminated by signal",
                Some(captured),
                None,
            )),
            Err(e) => Err(e),
        }
    }

    /// Wait for the child, killing it when the timeout elapses.
    async fn wait_for_completion(&self, child: &mut Child) -> MediaResult<Option<i32>> {
        let status = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(result) => result?,
                Err(_) => {
                    warn!(
                        "{} timed out after {} seconds, killing process",
                        self.tool.name(),
                        limit.as_secs()
                    );
                    let _ = child.kill().await;
                    return Err(MediaError::Timeout {
                        tool: self.tool.name().to_string(),
                        secs: limit.as_secs(),
                    });
                }
            },
            None => child.wait().await?,
        };

        Ok(status.code())
    }
}
