//! Pipeline orchestrator.
//!
//! Drives one upload through `Staged → Inspected → Transcoded → Subtitled →
//! CleanedUp`. Inspection and transcoding gate the job: a failure moves it
//! to `Failed` and keeps the staged source for a retry. Subtitle and cleanup
//! failures are recorded as warnings only.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::Instrument;

use cobot_media::{
    inspect_media, remove_if_exists, sweep_partial_outputs, transcode, write_subtitles,
    ExternalTool, FfmpegRunner, MediaError, MediaResult, SubtitleTemplate, TranscodeProfile,
};
use cobot_models::{ArtifactKind, JobReport, MediaSet, PipelineState, Stage};

use crate::config::PipelineConfig;
use crate::error::WorkerResult;
use crate::logging::JobLogger;

/// The stages the orchestrator sequences.
#[async_trait]
pub trait MediaStages: Send + Sync {
    /// Query source metadata.
    async fn inspect(&self, set: &MediaSet) -> MediaResult<()>;

    /// Produce the web video, preview and thumbnail in one pass.
    async fn transcode(&self, set: &MediaSet) -> MediaResult<()>;

    /// Remove outputs a failed transcode may have left.
    async fn sweep_partial(&self, set: &MediaSet) -> Vec<std::path::PathBuf>;

    /// Write the subtitle track.
    async fn write_subtitles(&self, set: &MediaSet) -> MediaResult<()>;

    /// Delete the staged source.
    async fn remove_source(&self, set: &MediaSet) -> MediaResult<()>;
}

/// Production stages backed by mediainfo and ffmpeg.
pub struct ToolStages {
    mediainfo: ExternalTool,
    runner: FfmpegRunner,
    profile: TranscodeProfile,
    subtitles: SubtitleTemplate,
    tool_timeout: Duration,
}

impl ToolStages {
    pub fn new(
        mediainfo: ExternalTool,
        ffmpeg: ExternalTool,
        profile: TranscodeProfile,
        subtitles: SubtitleTemplate,
        tool_timeout: Duration,
    ) -> Self {
        Self {
            mediainfo,
            runner: FfmpegRunner::new(ffmpeg).with_timeout(tool_timeout),
            profile,
            subtitles,
            tool_timeout,
        }
    }

    /// Build stages from configuration, loading the subtitle template if one is set.
    pub async fn from_config(config: &PipelineConfig) -> WorkerResult<Self> {
        let subtitles = match &config.subtitle_template {
            Some(path) => SubtitleTemplate::from_file(path).await?,
            None => SubtitleTemplate::placeholder(),
        };

        Ok(Self::new(
            config.mediainfo.clone(),
            config.ffmpeg.clone(),
            TranscodeProfile::default(),
            subtitles,
            config.tool_timeout,
        ))
    }
}

#[async_trait]
impl MediaStages for ToolStages {
    async fn inspect(&self, set: &MediaSet) -> MediaResult<()> {
        inspect_media(&self.mediainfo, set.source_path(), Some(self.tool_timeout)).await?;
        Ok(())
    }

    async fn transcode(&self, set: &MediaSet) -> MediaResult<()> {
        let summary = transcode(set, &self.profile, &self.runner).await?;
        crate::metrics::record_transcode_duration(summary.elapsed);
        Ok(())
    }

    async fn sweep_partial(&self, set: &MediaSet) -> Vec<std::path::PathBuf> {
        sweep_partial_outputs(set).await
    }

    async fn write_subtitles(&self, set: &MediaSet) -> MediaResult<()> {
        write_subtitles(
            set.artifact_path(ArtifactKind::Subtitles),
            &self.subtitles,
            &set.dest_name,
        )
        .await
    }

    async fn remove_source(&self, set: &MediaSet) -> MediaResult<()> {
        let source = set.source_path();
        if !remove_if_exists(&source).await? {
            return Err(MediaError::FileNotFound(source));
        }
        Ok(())
    }
}

/// Sequences the stages of one job.
#[derive(Clone)]
pub struct Pipeline {
    stages: Arc<dyn MediaStages>,
}

impl Pipeline {
    pub fn new(stages: Arc<dyn MediaStages>) -> Self {
        Self { stages }
    }

    /// Run one job to a terminal state.
    ///
    /// `publish` is called after every state change with the updated report.
    pub async fn run<F>(&self, set: &MediaSet, report: JobReport, publish: F) -> JobReport
    where
        F: Fn(&JobReport) + Send + Sync,
    {
        let logger = JobLogger::for_report(&report);
        let span = logger.span();
        self.run_stages(set, report, &publish, &logger)
            .instrument(span)
            .await
    }

    async fn run_stages<F>(
        &self,
        set: &MediaSet,
        mut report: JobReport,
        publish: &F,
        logger: &JobLogger,
    ) -> JobReport
    where
        F: Fn(&JobReport) + Send + Sync,
    {
        logger.log_start(set);

        // Staged -> Inspected
        if let Err(e) = self.stages.inspect(set).await {
            logger.log_stage_failed(Stage::Inspect, &set.source_name, &e);
            fail(&mut report, Stage::Inspect, &e, publish, logger);
            return report;
        }
        advance(&mut report, PipelineState::Inspected, publish, logger);

        // Inspected -> Transcoded; the staged source is kept on failure
        if let Err(e) = self.stages.transcode(set).await {
            logger.log_stage_failed(Stage::Transcode, &set.source_name, &e);
            let removed = self.stages.sweep_partial(set).await;
            logger.log_swept(&removed);
            fail(&mut report, Stage::Transcode, &e, publish, logger);
            return report;
        }
        advance(&mut report, PipelineState::Transcoded, publish, logger);

        // Transcoded -> Subtitled regardless of the outcome
        if let Err(e) = self.stages.write_subtitles(set).await {
            logger.log_stage_warning(Stage::Subtitle, &set.dest_name, &e);
            report.warn(Stage::Subtitle, e.to_string());
        }
        advance(&mut report, PipelineState::Subtitled, publish, logger);

        // Subtitled -> CleanedUp; artifacts are the durable result either way
        if let Err(e) = self.stages.remove_source(set).await {
            let source = set.source_path();
            logger.log_stage_warning(Stage::Cleanup, &source.display().to_string(), &e);
            report.warn(Stage::Cleanup, e.to_string());
        }
        advance(&mut report, PipelineState::CleanedUp, publish, logger);

        logger.log_ready(set);
        report
    }
}

fn advance<F>(report: &mut JobReport, state: PipelineState, publish: &F, logger: &JobLogger)
where
    F: Fn(&JobReport),
{
    logger.log_transition(report.state, state);
    report.set_state(state);
    publish(report);
}

fn fail<F>(report: &mut JobReport, stage: Stage, err: &MediaError, publish: &F, logger: &JobLogger)
where
    F: Fn(&JobReport),
{
    logger.log_transition(report.state, PipelineState::Failed);
    report.fail(stage, err.to_string());
    publish(report);
}
