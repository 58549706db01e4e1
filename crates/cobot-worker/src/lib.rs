//! Background media pipeline.
//!
//! This crate provides:
//! - The pipeline orchestrator (inspect, transcode, subtitles, cleanup)
//! - A bounded job executor returning observable job handles
//! - A registry of recent job reports
//! - Structured job logging and job metrics

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod registry;

pub use config::PipelineConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::{JobHandle, PipelineExecutor};
pub use logging::JobLogger;
pub use pipeline::{MediaStages, Pipeline, ToolStages};
pub use registry::JobRegistry;
