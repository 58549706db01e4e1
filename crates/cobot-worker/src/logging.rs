//! Structured job logging.
//!
//! Every event of a job is emitted inside a `job` span carrying the job id
//! and the destination stem, so one upload can be followed through the
//! pipeline with a single filter.

use std::fmt::Display;
use std::path::PathBuf;

use cobot_media::MediaError;
use cobot_models::{JobReport, MediaSet, PipelineState, Stage};
use tracing::{debug, error, info, warn, Span};

/// Logger bound to one pipeline job.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    stem: String,
}

impl JobLogger {
    pub fn for_report(report: &JobReport) -> Self {
        Self {
            job_id: report.job_id.to_string(),
            stem: report.stem.clone(),
        }
    }

    /// Span wrapping the whole job.
    pub fn span(&self) -> Span {
        tracing::info_span!("job", job_id = %self.job_id, stem = %self.stem)
    }

    pub fn log_start(&self, set: &MediaSet) {
        info!(state = %PipelineState::Staged, "Processing {}", set);
    }

    /// Log a move between pipeline states.
    pub fn log_transition(&self, from: PipelineState, to: PipelineState) {
        if to == PipelineState::Failed {
            warn!(from = %from, to = %to, "State changed");
        } else {
            info!(from = %from, to = %to, "State changed");
        }
    }

    /// Log the failure of a gating stage, with whatever the tool wrote to stderr.
    pub fn log_stage_failed(&self, stage: Stage, subject: &str, err: &MediaError) {
        error!(stage = %stage, "{} of {}: {}", stage, subject, describe(err));
    }

    /// Log a stage failure that does not end the job.
    pub fn log_stage_warning(&self, stage: Stage, subject: &str, err: impl Display) {
        warn!(stage = %stage, "{} of {}: {}", stage, subject, err);
    }

    pub fn log_swept(&self, removed: &[PathBuf]) {
        for path in removed {
            debug!("Removed partial output {}", path.display());
        }
        if !removed.is_empty() {
            info!(stage = %Stage::Transcode, "Removed {} partial outputs", removed.len());
        }
    }

    pub fn log_ready(&self, set: &MediaSet) {
        info!(
            state = %PipelineState::CleanedUp,
            "{} ready in {}",
            set.dest_name,
            set.dest_subdir().display()
        );
    }
}

/// Describe a stage error, including captured tool output.
fn describe(err: &MediaError) -> String {
    let kind = if err.is_configuration() {
        "configuration error"
    } else {
        "stage failed"
    };
    match err.stderr().map(str::trim).filter(|s| !s.is_empty()) {
        Some(stderr) => format!("{}: {}; stderr: {}", kind, err, stderr),
        None => format!("{}: {}", kind, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cobot_models::JobId;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture(f: impl FnOnce()) -> String {
        let out = Captured::default();
        let writer = out.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = out.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    fn failure() -> MediaError {
        MediaError::tool_failed("ffmpeg", "exited with status 1", Some("boom".into()), Some(1))
    }

    #[test]
    fn test_events_carry_job_and_stem() {
        let report = JobReport::new(JobId::from_string("job-1"), "COBOT-20240102T030405-Uab");
        let logger = JobLogger::for_report(&report);

        let text = capture(|| {
            let _guard = logger.span().entered();
            logger.log_transition(PipelineState::Inspected, PipelineState::Transcoded);
            logger.log_stage_failed(Stage::Transcode, "cobot-1.mov", &failure());
        });

        assert!(text.contains("job{job_id=job-1 stem=COBOT-20240102T030405-Uab}"), "{text}");
        assert!(text.contains("from=inspected to=transcoded"), "{text}");
        assert!(text.contains("stage=transcode"), "{text}");
        assert!(text.contains("stderr: boom"), "{text}");
    }

    #[test]
    fn test_failed_transition_is_a_warning() {
        let report = JobReport::new(JobId::new(), "COBOT-x");
        let logger = JobLogger::for_report(&report);

        let text = capture(|| logger.log_transition(PipelineState::Staged, PipelineState::Failed));

        assert!(text.contains("WARN"), "{text}");
        assert!(text.contains("to=failed"), "{text}");
    }

    #[test]
    fn test_describe_includes_stderr() {
        let text = describe(&failure());
        assert!(text.starts_with("stage failed"));
        assert!(text.contains("stderr: boom"));
        assert!(describe(&MediaError::tool_not_found("ffmpeg")).starts_with("configuration error"));
    }
}
