//! Phase 1: initial vision-model grading pass.

use metrics::counter;

use vgrade_media::MediaError;
use vgrade_models::{GradingJob, JobPatch, JobStatus};
use vgrade_vision::VideoSource;

use crate::context::GradingContext;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;

/// Run the initial AI pass for a job.
///
/// Persists `ai_results` once on success. A failure here is terminal for
/// Phase 1 only: the caller logs it and Phase 2 proceeds with the
/// degraded default AI grade. The one exception is a missing transcoder
/// binary, which is surfaced as a configuration error for the executor
/// to fail the job on.
pub async fn run_phase_one(ctx: &GradingContext, job: &GradingJob) -> WorkerResult<()> {
    let log = JobLogger::new(&job.id, "initial_analysis");
    log.log_start("running initial AI analysis");

    ctx.store
        .patch(
            &job.id,
            &JobPatch {
                status: Some(JobStatus::Processing),
                ..JobPatch::progress(10, "ai", "Analyzing video with the vision model")
            },
        )
        .await?;

    let source = resolve_video_source(ctx, job, &log).await?;

    let ai_results = ctx
        .vision
        .analyze_initial(&source, job.item_type)
        .await
        .map_err(WorkerError::from)?;

    log.log_progress(&format!(
        "initial grade {} for {:?}",
        ai_results.estimated_grade, ai_results.title
    ));

    let mut patch = JobPatch::progress(35, "ai", "Initial AI analysis complete");
    patch.ai_results = Some(ai_results);
    ctx.store.patch(&job.id, &patch).await?;

    counter!("phase_one_completed_total").increment(1);
    log.log_completion("initial analysis persisted");
    Ok(())
}

/// Pick the video payload for the vision call.
///
/// Normalized bytes when the config asks for it and normalization works;
/// the raw source URL otherwise. Only a missing transcoder binary aborts,
/// since that is an operator problem rather than a bad video.
async fn resolve_video_source(
    ctx: &GradingContext,
    job: &GradingJob,
    log: &JobLogger,
) -> WorkerResult<VideoSource> {
    if !ctx.config.normalize_before_analysis {
        return Ok(VideoSource::Url(job.video_url.clone()));
    }

    match ctx.normalizer.normalize(&job.video_url).await {
        Ok(bytes) => {
            log.log_progress(&format!("normalized source to {} bytes", bytes.len()));
            Ok(VideoSource::Bytes(bytes))
        }
        Err(MediaError::FfmpegNotFound) => Err(MediaError::FfmpegNotFound.into()),
        Err(e) => {
            log.log_warning(&format!(
                "normalization failed ({}); sending source URL instead",
                e
            ));
            Ok(VideoSource::Url(job.video_url.clone()))
        }
    }
}
