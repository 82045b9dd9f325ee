//! Pipeline metrics.

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// Finished jobs by status (done, failed) and error kind.
    pub const JOBS_TOTAL: &str = "broll_jobs_total";

    /// Wall time of a whole job in seconds.
    pub const JOB_DURATION_SECONDS: &str = "broll_job_duration_seconds";

    /// Scenes by outcome (filled, unfillable, transcode_failed, cancelled).
    pub const SCENES_TOTAL: &str = "broll_scenes_total";

    /// Time spent in each job stage in seconds.
    pub const STAGE_DURATION_SECONDS: &str = "broll_stage_duration_seconds";

    /// Scene budget expirations by policy.
    pub const BUDGET_EXHAUSTED_TOTAL: &str = "broll_budget_exhausted_total";
}

pub fn record_scene(outcome: &'static str) {
    counter!(names::SCENES_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_scenes(outcome: &'static str, count: usize) {
    if count > 0 {
        counter!(names::SCENES_TOTAL, "outcome" => outcome).increment(count as u64);
    }
}

pub fn record_stage(stage: &'static str, secs: f64) {
    histogram!(names::STAGE_DURATION_SECONDS, "stage" => stage).record(secs);
}

pub fn record_budget_exhausted(policy: &'static str) {
    counter!(names::BUDGET_EXHAUSTED_TOTAL, "policy" => policy).increment(1);
}

pub fn record_job(status: &'static str, error_kind: Option<&'static str>, secs: f64) {
    counter!(
        names::JOBS_TOTAL,
        "status" => status,
        "error_kind" => error_kind.unwrap_or("none")
    )
    .increment(1);
    histogram!(names::JOB_DURATION_SECONDS, "status" => status).record(secs);
}
