//! Structured analysis results from the remote graders.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Output of the initial vision-model pass.
///
/// Written once by Phase 1, then read-only for the rest of the job.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AiResults {
    /// Identified title of the collectible
    pub title: Option<String>,

    /// Issue / set identifier, when the model can read one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_id: Option<String>,

    /// Estimated grade as returned by the model.
    ///
    /// Kept as the raw string; normalization happens in the fusion engine
    /// so a malformed answer never poisons the stored record.
    pub estimated_grade: String,

    /// Free-text reasoning behind the estimate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// Structured CV output from the remote worker.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CvResults {
    /// Overall visible defect severity, 0-100
    pub damage_score: f64,

    /// Raw per-region defect scores (0-100), keyed by region name
    /// (`spine`, `corner_tl`, `corner_tr`, `corner_bl`, `corner_br`,
    /// `surface`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_scores: Option<BTreeMap<String, f64>>,

    /// Per-region grades from the trained classifier, when available.
    /// Same region keys as `region_scores`, values on the grade scale.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_grades: Option<BTreeMap<String, f64>>,

    /// Which analysis produced this payload (e.g. "glint", "glint+classifier")
    pub analysis_type: String,
}

impl CvResults {
    /// Mean of the classifier region grades, if any were returned.
    pub fn average_region_grade(&self) -> Option<f64> {
        let grades = self.region_grades.as_ref()?;
        if grades.is_empty() {
            return None;
        }
        let sum: f64 = grades.values().sum();
        Some(sum / grades.len() as f64)
    }
}

/// Output of the multi-frame re-verification pass.
///
/// Defects seen across several golden frames are treated as real damage;
/// features visible in a single frame only are likely reflections or glare.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DetailedAnalysis {
    /// Defects confirmed across multiple frames
    #[serde(default)]
    pub consensus_defects: Vec<String>,

    /// Features dismissed as single-frame artifacts
    #[serde(default)]
    pub single_frame_artifacts: Vec<String>,

    /// Grade suggested after cross-frame comparison
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_grade: Option<f64>,

    /// Free-text comparison notes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}
