//! Shared data models for the VGrade backend.
//!
//! This crate provides Serde-serializable types for:
//! - Grading jobs, phase statuses and field-scoped job patches
//! - Structured AI / CV analysis results
//! - The grade tier scale and the grade fusion engine
//! - The progress polling contract

pub mod analysis;
pub mod fusion;
pub mod grade;
pub mod job;
pub mod progress;
pub mod scan;

// Re-export common types
pub use analysis::{AiResults, CvResults, DetailedAnalysis};
pub use fusion::{fuse, Agreement, Confidence, FusionMethod, FusionOutcome, HybridGrade};
pub use grade::{round_to_tier, GRADE_MAX, GRADE_MIN, GRADE_NEUTRAL};
pub use job::{GradingJob, JobPatch, JobStatus, PhaseStatus};
pub use progress::ProgressSnapshot;
pub use scan::{ItemType, ScanId};
