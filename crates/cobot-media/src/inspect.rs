//! Source media inspection with mediainfo.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::info;

use crate::error::{MediaError, MediaResult};
use crate::tool::ExternalTool;

/// Captured output of an inspection run.
#[derive(Debug, Clone)]
pub struct InspectionReport {
    /// Resolved path of the inspection tool
    pub tool_path: PathBuf,
    pub stdout: String,
    pub stderr: String,
}

/// Inspect a staged source file.
///
/// Diagnostic only: the output is logged, not interpreted. A missing tool
/// surfaces as a configuration error and a non-zero exit as a tool failure;
/// either way the caller must not transcode the file.
pub async fn inspect_media(
    tool: &ExternalTool,
    source: impl AsRef<Path>,
    timeout: Option<Duration>,
) -> MediaResult<InspectionReport> {
    let source = source.as_ref();

    if !source.exists() {
        return Err(MediaError::FileNotFound(source.to_path_buf()));
    }

    let tool_path = tool.locate()?;
    info!(tool = %tool.name(), path = %tool_path.display(), "Inspecting {}", source.display());

    let output = tool.run_captured([source.as_os_str()], timeout).await?;

    info!(
        tool = %tool.name(),
        stdout = %output.stdout.trim_end(),
        stderr = %output.stderr.trim_end(),
        "Inspection output for {}",
        source.display()
    );

    if !output.success {
        return Err(MediaError::tool_failed(
            tool.name(),
            match output.exit_code {
                Some(code) => format!("exited with status {}", code),
                None => "terminated by signal".to_string(),
            },
            Some(output.stderr),
            output.exit_code,
        ));
    }

    Ok(InspectionReport {
        tool_path,
        stdout: output.stdout,
        stderr: output.stderr,
    })
}
