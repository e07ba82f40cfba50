//! Phase 2: CV pipeline and grade fusion.
//!
//! Drives the remote CV worker, the multi-frame re-verification pass and
//! the fusion engine, persisting every state transition before the remote
//! call it precedes so a crash mid-call still reads as "processing".

use chrono::Utc;
use metrics::counter;

use vgrade_media::fetch_bytes;
use vgrade_models::{
    fuse, DetailedAnalysis, GradingJob, ItemType, JobPatch, JobStatus, PhaseStatus,
};

use crate::context::GradingContext;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;

/// Golden frames below which re-verification cannot compare anything.
const MIN_REVERIFY_FRAMES: usize = 2;

/// Run the CV pipeline for a job through to fusion.
///
/// Terminal either way: success persists the fused grade and `complete`,
/// failure persists the error and `failed`. There is no automatic retry
/// of the whole job; retry is a caller-initiated resubmission.
pub async fn run_phase_two(ctx: &GradingContext, job: &GradingJob) -> WorkerResult<()> {
    let log = JobLogger::new(&job.id, "cv_pipeline");
    log.log_start("starting CV analysis pipeline");

    // Persist the transition before the remote call.
    ctx.store
        .patch(
            &job.id,
            &JobPatch {
                status: Some(JobStatus::Processing),
                frames_status: Some(PhaseStatus::Processing),
                ..JobPatch::progress(20, "frames", "Extracting golden frames")
            },
        )
        .await?;

    let cv_response = match ctx
        .cv
        .analyze_video(&job.video_url, &job.id, job.item_type)
        .await
    {
        Ok(response) => response,
        Err(e) => {
            let err = WorkerError::from(e);
            log.log_error(&format!("golden frame extraction failed: {}", err));
            let mut patch =
                JobPatch::failed(format!("golden frame extraction: {}", err.surface_message()));
            patch.frames_status = Some(PhaseStatus::Failed);
            patch.cv_status = Some(PhaseStatus::Failed);
            ctx.store.patch(&job.id, &patch).await?;
            counter!("phase_two_failed_total").increment(1);
            return Err(err);
        }
    };

    let golden_frames = cv_response.golden_frames.clone();
    let frame_timestamps = cv_response.frame_timestamps.clone();
    let cv_results = cv_response.into_results();

    log.log_progress(&format!(
        "{} golden frames, damage score {:.1}",
        golden_frames.len(),
        cv_results.damage_score
    ));

    // Golden frames land before any CV results do.
    ctx.store
        .patch(
            &job.id,
            &JobPatch {
                frames_status: Some(PhaseStatus::Complete),
                golden_frames: Some(golden_frames.clone()),
                frame_timestamps: Some(frame_timestamps),
                frames_completed_at: Some(Utc::now()),
                ..JobPatch::progress(55, "frames", "Golden frames extracted")
            },
        )
        .await?;

    ctx.store
        .patch(
            &job.id,
            &JobPatch {
                cv_status: Some(PhaseStatus::Processing),
                cv_results: Some(cv_results.clone()),
                ..JobPatch::progress(65, "cv", "Verifying defects across frames")
            },
        )
        .await?;

    // Multi-frame re-verification needs at least two frames to compare;
    // with fewer it is skipped outright, never retried.
    let detailed = if golden_frames.len() >= MIN_REVERIFY_FRAMES {
        run_reverification(ctx, &log, &golden_frames, job.item_type).await
    } else {
        log.log_progress("fewer than two golden frames; skipping re-verification");
        None
    };

    // Fusion reads the freshest AI results; Phase 1 may have finished
    // while the CV worker was running.
    let ai_grade = ctx
        .store
        .get(&job.id)
        .await?
        .and_then(|j| j.ai_results)
        .map(|a| a.estimated_grade)
        .unwrap_or_default();

    let outcome = fuse(&ai_grade, Some(&cv_results), detailed.as_ref());

    log.log_completion(&format!("final grade {}", outcome.final_grade));
    ctx.store
        .patch(
            &job.id,
            &JobPatch {
                status: Some(JobStatus::Complete),
                cv_status: Some(PhaseStatus::Complete),
                hybrid_grade: outcome.hybrid,
                final_grade: Some(outcome.final_grade),
                cv_completed_at: Some(Utc::now()),
                ..JobPatch::progress(100, "done", "Grading complete")
            },
        )
        .await?;

    counter!("phase_two_completed_total").increment(1);
    Ok(())
}

/// Download the golden frames and run the multi-frame comparison.
///
/// Non-fatal to the job by design: every failure path logs and returns
/// `None`, and fusion proceeds on the scalar CV signal alone.
async fn run_reverification(
    ctx: &GradingContext,
    log: &JobLogger,
    golden_frames: &[String],
    item_type: ItemType,
) -> Option<DetailedAnalysis> {
    let mut frames = Vec::new();

    for url in golden_frames.iter().take(ctx.config.max_reverify_frames) {
        match fetch_bytes(&ctx.http, url, ctx.config.frame_download_timeout).await {
            Ok(bytes) => frames.push(bytes),
            Err(e) => log.log_warning(&format!("golden frame download failed ({}): {}", url, e)),
        }
    }

    if frames.len() < MIN_REVERIFY_FRAMES {
        log.log_warning("not enough downloadable frames for re-verification");
        return None;
    }

    match ctx.vision.reverify_frames(&frames, item_type).await {
        Ok(detailed) => {
            log.log_progress(&format!(
                "re-verification: {} consensus defects, {} artifacts",
                detailed.consensus_defects.len(),
                detailed.single_frame_artifacts.len()
            ));
            Some(detailed)
        }
        Err(e) => {
            log.log_warning(&format!("re-verification failed, continuing without: {}", e));
            None
        }
    }
}
