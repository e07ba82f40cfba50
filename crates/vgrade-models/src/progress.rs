//! Progress polling contract.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::job::{GradingJob, JobStatus, PhaseStatus};

/// Snapshot surfaced to polling readers.
///
/// Polled, not pushed; readers tolerate the advisory fields lagging the
/// status transitions.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProgressSnapshot {
    pub progress_percentage: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_step: Option<String>,
    pub status: JobStatus,
    pub cv_status: PhaseStatus,
}

impl From<&GradingJob> for ProgressSnapshot {
    fn from(job: &GradingJob) -> Self {
        Self {
            progress_percentage: job.progress_percentage,
            progress_message: job.progress_message.clone(),
            progress_step: job.progress_step.clone(),
            status: job.status,
            cv_status: job.cv_status,
        }
    }
}

impl ProgressSnapshot {
    /// Whether polling can stop: the job reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
