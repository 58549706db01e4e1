//! Job definitions for the upload pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a pipeline job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pipeline state of one upload.
///
/// `Staged → Inspected → Transcoded → Subtitled → CleanedUp`, with `Failed`
/// absorbing any failure before `Transcoded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// Raw upload persisted, job not started yet
    #[default]
    Staged,
    /// Source metadata inspected
    Inspected,
    /// Web video, preview and thumbnail written
    Transcoded,
    /// Subtitle stage ran (successfully or not)
    Subtitled,
    /// Staged source removed; artifacts are the durable result
    CleanedUp,
    /// A gating stage failed
    Failed,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Staged => "staged",
            PipelineState::Inspected => "inspected",
            PipelineState::Transcoded => "transcoded",
            PipelineState::Subtitled => "subtitled",
            PipelineState::CleanedUp => "cleaned_up",
            PipelineState::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::CleanedUp | PipelineState::Failed)
    }

    /// State reached when the next stage completes.
    pub fn next(&self) -> Option<PipelineState> {
        match self {
            PipelineState::Staged => Some(PipelineState::Inspected),
            PipelineState::Inspected => Some(PipelineState::Transcoded),
            PipelineState::Transcoded => Some(PipelineState::Subtitled),
            PipelineState::Subtitled => Some(PipelineState::CleanedUp),
            PipelineState::CleanedUp | PipelineState::Failed => None,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Pipeline stage, used to attribute failures and warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Inspect,
    Transcode,
    Subtitle,
    Cleanup,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Inspect => "inspect",
            Stage::Transcode => "transcode",
            Stage::Subtitle => "subtitle",
            Stage::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Non-fatal problem recorded while a job ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageWarning {
    pub stage: Stage,
    pub message: String,
}

/// Outcome of one pipeline job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    /// Job identifier
    pub job_id: JobId,
    /// Destination stem of the artifact set
    pub stem: String,
    /// Latest state
    pub state: PipelineState,
    /// Stage that moved the job to `Failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<Stage>,
    /// Error text of the failing stage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Non-fatal stage failures
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<StageWarning>,
    /// When the job was submitted
    pub submitted_at: DateTime<Utc>,
    /// When the job reached a terminal state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobReport {
    /// Create a report for a freshly staged job.
    pub fn new(job_id: JobId, stem: impl Into<String>) -> Self {
        Self {
            job_id,
            stem: stem.into(),
            state: PipelineState::Staged,
            failed_stage: None,
            error: None,
            warnings: Vec::new(),
            submitted_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Advance to a new state.
    pub fn set_state(&mut self, state: PipelineState) {
        self.state = state;
        if state.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
    }

    /// Record a gating failure and move to `Failed`.
    pub fn fail(&mut self, stage: Stage, error: impl Into<String>) {
        self.failed_stage = Some(stage);
        self.error = Some(error.into());
        self.set_state(PipelineState::Failed);
    }

    /// Record a non-fatal stage failure.
    pub fn warn(&mut self, stage: Stage, message: impl Into<String>) {
        self.warnings.push(StageWarning {
            stage,
            message: message.into(),
        });
    }
}
