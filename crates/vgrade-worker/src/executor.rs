//! Per-job executor: fans the two phases out concurrently.

use tracing::{info, warn};

use vgrade_models::{GradingJob, JobPatch};

use crate::context::GradingContext;
use crate::error::WorkerResult;
use crate::phase_one::run_phase_one;
use crate::phase_two::run_phase_two;

/// Runs one grading job to a terminal state.
///
/// Phase 1 and Phase 2 are independent concurrent flows over the same
/// record; each writes only its own fields, so there is no mutual
/// exclusion between them. Jobs are independent of each other and any
/// number may run in parallel on the runtime.
#[derive(Clone)]
pub struct GradingExecutor {
    ctx: GradingContext,
}

impl GradingExecutor {
    pub fn new(ctx: GradingContext) -> Self {
        Self { ctx }
    }

    /// Drive a job to completion or failure.
    ///
    /// Phase 2 owns the terminal status in the normal case. A Phase 1
    /// configuration failure (missing transcoder) fails the job even
    /// when the CV side produced a grade: the record then carries the
    /// error alongside whatever partial results landed.
    pub async fn run(&self, job: GradingJob) -> WorkerResult<()> {
        info!(scan_id = %job.id, video_url = %job.video_url, "executing grading job");

        let (phase_one, phase_two) = tokio::join!(
            run_phase_one(&self.ctx, &job),
            run_phase_two(&self.ctx, &job),
        );

        if let Err(e) = &phase_two {
            warn!(scan_id = %job.id, "CV pipeline failed: {}", e);
        }

        match phase_one {
            Ok(()) => {}
            Err(e) if e.is_config() => {
                warn!(scan_id = %job.id, "initial analysis hit a configuration error: {}", e);
                self.ctx
                    .store
                    .patch(&job.id, &JobPatch::failed(e.surface_message()))
                    .await?;
                return Err(e);
            }
            Err(e) => {
                // Terminal for Phase 1 only; the job carries on with the
                // degraded default AI grade.
                warn!(scan_id = %job.id, "initial analysis failed: {}", e);
            }
        }

        phase_two
    }
}
