//! Job metrics.
//!
//! Recorded through the `metrics` facade; without an installed recorder
//! these calls are no-ops.

use std::time::Duration;

use cobot_models::{JobReport, PipelineState};
use metrics::{counter, gauge, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_SUBMITTED_TOTAL: &str = "cobot_jobs_submitted_total";
    pub const JOBS_REJECTED_TOTAL: &str = "cobot_jobs_rejected_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "cobot_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "cobot_jobs_failed_total";
    pub const JOB_WARNINGS_TOTAL: &str = "cobot_job_warnings_total";
    pub const JOBS_IN_FLIGHT: &str = "cobot_jobs_in_flight";
    pub const TRANSCODE_DURATION_SECONDS: &str = "cobot_transcode_duration_seconds";
}

pub fn record_job_submitted() {
    counter!(names::JOBS_SUBMITTED_TOTAL).increment(1);
}

pub fn record_job_rejected(reason: &'static str) {
    counter!(names::JOBS_REJECTED_TOTAL, "reason" => reason).increment(1);
}

pub fn record_job_started() {
    gauge!(names::JOBS_IN_FLIGHT).increment(1.0);
}

/// Record the terminal outcome of a job.
pub fn record_job_finished(report: &JobReport) {
    gauge!(names::JOBS_IN_FLIGHT).decrement(1.0);

    match (report.state, report.failed_stage) {
        (PipelineState::Failed, Some(stage)) => {
            counter!(names::JOBS_FAILED_TOTAL, "stage" => stage.as_str()).increment(1);
        }
        _ => counter!(names::JOBS_COMPLETED_TOTAL).increment(1),
    }

    for warning in &report.warnings {
        counter!(names::JOB_WARNINGS_TOTAL, "stage" => warning.stage.as_str()).increment(1);
    }
}

pub fn record_transcode_duration(elapsed: Duration) {
    histogram!(names::TRANSCODE_DURATION_SECONDS).record(elapsed.as_secs_f64());
}
