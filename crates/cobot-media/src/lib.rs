#![deny(unreachable_patterns)]
//! External tool wrappers for the upload pipeline.
//!
//! This crate provides:
//! - Tool discovery and captured invocation (argument vectors, never a shell)
//! - Multi-output FFmpeg command building with progress parsing and timeouts
//! - The inspection, transcode and subtitle stages

pub mod command;
pub mod error;
pub mod fs_utils;
pub mod inspect;
pub mod progress;
pub mod subtitle;
pub mod tool;
pub mod transcode;

pub use command::{FfmpegCommand, FfmpegRunner, OutputSpec};
pub use error::{MediaError, MediaResult};
pub use fs_utils::{ensure_dir, remove_if_exists};
pub use inspect::{inspect_media, InspectionReport};
pub use progress::FfmpegProgress;
pub use subtitle::{write_subtitles, SubtitleTemplate, PLACEHOLDER_VTT};
pub use tool::{ExternalTool, ToolOutput};
pub use transcode::{
    build_transcode_command, sweep_partial_outputs, transcode, TranscodeProfile, TranscodeSummary,
};
