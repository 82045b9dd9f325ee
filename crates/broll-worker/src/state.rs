//! Job stage tracking.

use std::time::Instant;

use broll_models::JobStage;

use crate::error::{PipelineError, PipelineResult};
use crate::logging::JobLogger;
use crate::metrics;

/// Tracks a job's stage and rejects out-of-order transitions.
#[derive(Debug)]
pub struct JobStateMachine {
    stage: JobStage,
    entered_at: Instant,
    logger: JobLogger,
}

impl JobStateMachine {
    /// Start in [`JobStage::Planning`].
    pub fn new(logger: JobLogger) -> Self {
        logger.log_stage(&JobStage::Planning);
        Self {
            stage: JobStage::Planning,
            entered_at: Instant::now(),
            logger,
        }
    }

    pub fn stage(&self) -> &JobStage {
        &self.stage
    }

    /// Move to `next`, recording how long the current stage took.
    pub fn advance(&mut self, next: JobStage) -> PipelineResult<()> {
        if !self.stage.can_transition_to(&next) {
            return Err(PipelineError::IllegalTransition {
                from: self.stage.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }
        metrics::record_stage(self.stage.as_str(), self.entered_at.elapsed().as_secs_f64());
        self.logger.log_stage(&next);
        self.stage = next;
        self.entered_at = Instant::now();
        Ok(())
    }

    /// Mark the job failed. Returns the stage it failed in, or `None` when
    /// the job had already finished.
    pub fn fail(&mut self, reason: impl Into<String>) -> Option<&'static str> {
        if self.stage.is_terminal() {
            return None;
        }
        let failed_in = self.stage.as_str();
        let reason = reason.into();
        self.logger
            .log_error(&format!("failed during {}: {}", failed_in, reason));
        metrics::record_stage(failed_in, self.entered_at.elapsed().as_secs_f64());
        self.stage = JobStage::Failed { reason };
        Some(failed_in)
    }
}
