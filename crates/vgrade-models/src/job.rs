//! Grading job record and field-scoped patches.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::analysis::{AiResults, CvResults};
use crate::fusion::HybridGrade;
use crate::scan::{ItemType, ScanId};

/// Overall job lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job created, no phase has started yet
    #[default]
    Pending,
    /// At least one phase is running
    Processing,
    /// Terminal: final grade surfaced
    Complete,
    /// Terminal: fatal error recorded
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Complete => "complete",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of one Phase 2 sub-phase (golden frames, CV analysis).
///
/// Sub-phase statuses are monotonic: `pending -> processing ->
/// {complete, failed}`. Nothing regresses a sub-phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    #[default]
    Pending,
    Processing,
    Complete,
    Failed,
}

impl PhaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseStatus::Pending => "pending",
            PhaseStatus::Processing => "processing",
            PhaseStatus::Complete => "complete",
            PhaseStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PhaseStatus::Complete | PhaseStatus::Failed)
    }

    /// Whether moving to `next` respects the monotonic ordering.
    pub fn can_advance_to(&self, next: PhaseStatus) -> bool {
        use PhaseStatus::*;
        match (self, next) {
            (Pending, Processing) | (Pending, Failed) => true,
            (Processing, Complete) | (Processing, Failed) => true,
            (a, b) => *a == b,
        }
    }
}

impl std::fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One grading job: a single record per submitted video.
///
/// Mutated exclusively by the Phase 1 and Phase 2 flows through
/// [`JobPatch`]; progress readers never write. The record is never deleted
/// by the core.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GradingJob {
    /// Unique scan ID (caller-supplied or generated); immutable
    pub id: ScanId,

    /// Source video location; the object itself is owned by external storage
    pub video_url: String,

    /// Kind of collectible
    #[serde(default)]
    pub item_type: ItemType,

    /// Overall lifecycle state
    #[serde(default)]
    pub status: JobStatus,

    /// Phase 1 output; written once, then read-only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_results: Option<AiResults>,

    /// Golden-frame extraction sub-status
    #[serde(default)]
    pub frames_status: PhaseStatus,

    /// CV analysis sub-status
    #[serde(default)]
    pub cv_status: PhaseStatus,

    /// Still-image references picked by the CV worker; immutable once set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub golden_frames: Option<Vec<String>>,

    /// Timestamps (seconds) parallel to `golden_frames`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_timestamps: Option<Vec<f64>>,

    /// Structured CV output; never set before `golden_frames`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cv_results: Option<CvResults>,

    /// Fusion output; computed at most once per job
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hybrid_grade: Option<HybridGrade>,

    /// The single scalar grade surfaced to the caller
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_grade: Option<f64>,

    /// Advisory progress, 0-100, monotonically non-decreasing
    #[serde(default)]
    pub progress_percentage: u8,

    /// Human-readable progress line for UI polling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_message: Option<String>,

    /// Machine-readable step tag for UI polling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_step: Option<String>,

    /// Last fatal error; set only on terminal failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,

    /// When golden-frame extraction finished
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frames_completed_at: Option<DateTime<Utc>>,

    /// When CV analysis (and fusion) finished
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cv_completed_at: Option<DateTime<Utc>>,
}

impl GradingJob {
    /// Create a new pending job for a submitted video.
    pub fn new(id: ScanId, video_url: impl Into<String>, item_type: ItemType) -> Self {
        let now = Utc::now();
        Self {
            id,
            video_url: video_url.into(),
            item_type,
            status: JobStatus::Pending,
            ai_results: None,
            frames_status: PhaseStatus::Pending,
            cv_status: PhaseStatus::Pending,
            golden_frames: None,
            frame_timestamps: None,
            cv_results: None,
            hybrid_grade: None,
            final_grade: None,
            progress_percentage: 0,
            progress_message: None,
            progress_step: None,
            error: None,
            created_at: now,
            updated_at: now,
            frames_completed_at: None,
            cv_completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Apply a field-scoped patch in place.
    ///
    /// Only the fields the patch carries are touched, so two concurrent
    /// writers updating disjoint field sets cannot lose each other's work.
    /// Progress percentage never moves backwards.
    pub fn apply_patch(&mut self, patch: &JobPatch) {
        if let Some(status) = patch.status {
            // A terminal status never regresses to a live one; a late
            // "processing" write from the other phase must not resurrect
            // a job the CV pipeline already finished or failed.
            if !(self.status.is_terminal() && !status.is_terminal()) {
                self.status = status;
            }
        }
        if let Some(ref ai) = patch.ai_results {
            self.ai_results = Some(ai.clone());
        }
        if let Some(frames_status) = patch.frames_status {
            if self.frames_status.can_advance_to(frames_status) {
                self.frames_status = frames_status;
            }
        }
        if let Some(cv_status) = patch.cv_status {
            if self.cv_status.can_advance_to(cv_status) {
                self.cv_status = cv_status;
            }
        }
        if let Some(ref frames) = patch.golden_frames {
            self.golden_frames = Some(frames.clone());
        }
        if let Some(ref timestamps) = patch.frame_timestamps {
            self.frame_timestamps = Some(timestamps.clone());
        }
        if let Some(ref cv) = patch.cv_results {
            self.cv_results = Some(cv.clone());
        }
        if let Some(ref hybrid) = patch.hybrid_grade {
            // Computed at most once; repeated fusion attempts are no-ops.
            if self.hybrid_grade.is_none() {
                self.hybrid_grade = Some(hybrid.clone());
            }
        }
        if let Some(grade) = patch.final_grade {
            self.final_grade = Some(grade);
        }
        if let Some(pct) = patch.progress_percentage {
            self.progress_percentage = self.progress_percentage.max(pct.min(100));
        }
        if let Some(ref msg) = patch.progress_message {
            self.progress_message = Some(msg.clone());
        }
        if let Some(ref step) = patch.progress_step {
            self.progress_step = Some(step.clone());
        }
        if let Some(ref error) = patch.error {
            self.error = Some(error.clone());
        }
        if let Some(at) = patch.frames_completed_at {
            self.frames_completed_at = Some(at);
        }
        if let Some(at) = patch.cv_completed_at {
            self.cv_completed_at = Some(at);
        }
        self.updated_at = Utc::now();
    }
}

/// Field-scoped partial update for a [`GradingJob`].
///
/// Every mutation in the pipeline goes through a patch; fields left `None`
/// are not written. Serializes to exactly the set fields, which is what a
/// PATCH against the record store sends.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_results: Option<AiResults>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frames_status: Option<PhaseStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cv_status: Option<PhaseStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub golden_frames: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_timestamps: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cv_results: Option<CvResults>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hybrid_grade: Option<HybridGrade>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_grade: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_percentage: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_step: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frames_completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cv_completed_at: Option<DateTime<Utc>>,
}

impl JobPatch {
    /// Patch with only a status change.
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Patch recording a terminal failure.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Failed),
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Progress-only patch.
    pub fn progress(pct: u8, step: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            progress_percentage: Some(pct),
            progress_step: Some(step.into()),
            progress_message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Whether the patch carries no fields at all.
    pub fn is_empty(&self) -> bool {
        serde_json::to_value(self)
            .map(|v| v.as_object().map(|o| o.is_empty()).unwrap_or(true))
            .unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_job_defaults() {
        let job = GradingJob::new(ScanId::new(), "https://example.com/v.mp4", ItemType::Comic);
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.frames_status, PhaseStatus::Pending);
        assert_eq!(job.cv_status, PhaseStatus::Pending);
        assert!(job.final_grade.is_none());
        assert!(!job.is_terminal());
    }

    #[test]
    fn test_patch_touches_only_set_fields() {
        let mut job = GradingJob::new(ScanId::new(), "https://example.com/v.mp4", ItemType::Card);
        job.progress_message = Some("downloading".into());

        job.apply_patch(&JobPatch::status(JobStatus::Processing));

        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.progress_message.as_deref(), Some("downloading"));
    }

    #[test]
    fn test_patch_serializes_only_set_fields() {
        let patch = JobPatch::status(JobStatus::Processing);
        let value = serde_json::to_value(&patch).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 1);
        assert_eq!(obj["status"], "processing");
    }

    #[test]
    fn test_progress_never_regresses() {
        let mut job = GradingJob::new(ScanId::new(), "https://example.com/v.mp4", ItemType::Card);
        job.apply_patch(&JobPatch::progress(60, "cv", "analyzing"));
        job.apply_patch(&JobPatch::progress(40, "ai", "still thinking"));
        assert_eq!(job.progress_percentage, 60);
    }

    #[test]
    fn test_sub_phase_status_monotonic() {
        let mut job = GradingJob::new(ScanId::new(), "https://example.com/v.mp4", ItemType::Card);

        let mut patch = JobPatch::default();
        patch.frames_status = Some(PhaseStatus::Complete);
        // Pending cannot jump straight to Complete
        job.apply_patch(&patch);
        assert_eq!(job.frames_status, PhaseStatus::Pending);

        patch.frames_status = Some(PhaseStatus::Processing);
        job.apply_patch(&patch);
        patch.frames_status = Some(PhaseStatus::Complete);
        job.apply_patch(&patch);
        assert_eq!(job.frames_status, PhaseStatus::Complete);

        // Terminal sub-status never regresses
        patch.frames_status = Some(PhaseStatus::Processing);
        job.apply_patch(&patch);
        assert_eq!(job.frames_status, PhaseStatus::Complete);
    }

    #[test]
    fn test_terminal_status_not_resurrected() {
        let mut job = GradingJob::new(ScanId::new(), "https://example.com/v.mp4", ItemType::Card);
        job.apply_patch(&JobPatch::failed("CV worker unreachable"));

        // A straggling processing write from the other phase is ignored.
        job.apply_patch(&JobPatch::status(JobStatus::Processing));
        assert_eq!(job.status, JobStatus::Failed);

        // Terminal-to-terminal is allowed (failure overriding a
        // completed record keeps its partial results).
        job.apply_patch(&JobPatch::status(JobStatus::Complete));
        assert_eq!(job.status, JobStatus::Complete);
    }

    #[test]
    fn test_hybrid_grade_written_at_most_once() {
        use crate::fusion::{Agreement, Confidence, FusionMethod, HybridGrade};

        let mut job = GradingJob::new(ScanId::new(), "https://example.com/v.mp4", ItemType::Card);
        let first = HybridGrade {
            final_grade: 8.0,
            ai_grade: 9.0,
            cv_grade: Some(8.0),
            agreement: Agreement::Strong,
            overall_confidence: Confidence::Medium,
            method: FusionMethod::DamageDeduction,
        };
        let mut patch = JobPatch::default();
        patch.hybrid_grade = Some(first.clone());
        job.apply_patch(&patch);

        patch.hybrid_grade = Some(HybridGrade {
            final_grade: 2.0,
            ..first
        });
        job.apply_patch(&patch);

        assert_eq!(job.hybrid_grade.as_ref().unwrap().final_grade, 8.0);
    }
}
