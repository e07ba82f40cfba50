//! Grade fusion engine.
//!
//! Pure function combining the AI estimate, the CV damage signal, and the
//! optional classifier region grades into one final grade. No I/O, no
//! failure path: malformed numeric inputs are substituted with defaults so
//! grading always terminates with an answer.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::analysis::{CvResults, DetailedAnalysis};
use crate::grade::{round_to_tier, GRADE_MIN, GRADE_NEUTRAL};

/// Maximum grade deduction the scalar damage signal can contribute.
const MAX_DAMAGE_DEDUCTION: f64 = 2.0;

/// Deduction at or below which AI and CV are considered in strong agreement.
const STRONG_DEDUCTION_LIMIT: f64 = 0.5;

/// Grade-point difference under which AI and classifier agree strongly.
const STRONG_DIFF_LIMIT: f64 = 1.0;

/// How closely independent grade sources concur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Agreement {
    Strong,
    Moderate,
}

/// Confidence in the fused grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
}

/// Which fusion branch produced the hybrid grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FusionMethod {
    /// Classifier region grades averaged (treated as ground truth)
    ClassifierRegions,
    /// Scalar damage percentage deducted from the AI grade
    DamageDeduction,
}

/// Fused result combining AI, CV and optional classifier signals.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HybridGrade {
    /// Final grade, always on a tier
    pub final_grade: f64,
    /// Normalized AI grade that entered fusion
    pub ai_grade: f64,
    /// CV-side source grade (classifier mean, or damage-adjusted AI grade)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cv_grade: Option<f64>,
    /// How closely the sources concurred
    pub agreement: Agreement,
    /// Confidence in the fused result
    pub overall_confidence: Confidence,
    /// Which branch produced this grade
    pub method: FusionMethod,
}

/// Outcome of a fusion run.
///
/// `hybrid` is `None` when no CV signal was available; `final_grade` is
/// then the normalized AI grade alone.
#[derive(Debug, Clone)]
pub struct FusionOutcome {
    pub hybrid: Option<HybridGrade>,
    pub final_grade: f64,
}

/// Normalize the AI grade string.
///
/// Unparsable or non-finite input falls back to the neutral default, as
/// does exactly `0.0` (the broken-fallback sentinel of the AI pass; a
/// legitimately computed zero cannot be expressed, which is a known
/// ambiguity kept as-is). The multi-frame consensus grade, when present
/// and non-zero, wins over the single-pass estimate.
fn normalize_ai_grade(ai_grade: &str, detailed: Option<&DetailedAnalysis>) -> f64 {
    let parsed = ai_grade.trim().parse::<f64>().ok();
    let mut grade = match parsed {
        Some(g) if g.is_finite() && g != 0.0 => g,
        _ => GRADE_NEUTRAL,
    };

    if let Some(suggested) = detailed.and_then(|d| d.suggested_grade) {
        if suggested.is_finite() && suggested != 0.0 {
            grade = suggested;
        }
    }

    grade
}

/// Fuse the available grading signals into a final grade.
pub fn fuse(
    ai_grade: &str,
    cv: Option<&CvResults>,
    detailed: Option<&DetailedAnalysis>,
) -> FusionOutcome {
    let ai = normalize_ai_grade(ai_grade, detailed);

    // Branch A: region-level classifier grades are treated as ground truth.
    if let Some(avg) = cv.and_then(CvResults::average_region_grade) {
        let final_grade = round_to_tier(avg);
        let agreement = if (ai - avg).abs() < STRONG_DIFF_LIMIT {
            Agreement::Strong
        } else {
            Agreement::Moderate
        };
        return FusionOutcome {
            final_grade,
            hybrid: Some(HybridGrade {
                final_grade,
                ai_grade: ai,
                cv_grade: Some(avg),
                agreement,
                overall_confidence: Confidence::High,
                method: FusionMethod::ClassifierRegions,
            }),
        };
    }

    // Branch B: only the scalar damage percentage is available.
    if let Some(cv) = cv {
        let damage = cv.damage_score.clamp(0.0, 100.0);
        let deduction = (damage / 100.0 * MAX_DAMAGE_DEDUCTION).min(MAX_DAMAGE_DEDUCTION);
        let adjusted = (ai - deduction).max(GRADE_MIN);
        let final_grade = round_to_tier(adjusted);
        let agreement = if deduction <= STRONG_DEDUCTION_LIMIT {
            Agreement::Strong
        } else {
            Agreement::Moderate
        };
        return FusionOutcome {
            final_grade,
            hybrid: Some(HybridGrade {
                final_grade,
                ai_grade: ai,
                cv_grade: Some(adjusted),
                agreement,
                overall_confidence: Confidence::Medium,
                method: FusionMethod::DamageDeduction,
            }),
        };
    }

    // Branch C: no CV signal at all; the normalized AI grade stands alone.
    FusionOutcome {
        final_grade: round_to_tier(ai),
        hybrid: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grade::{GRADE_MAX, GRADE_MIN};
    use std::collections::BTreeMap;

    fn cv_with_damage(damage: f64) -> CvResults {
        CvResults {
            damage_score: damage,
            region_scores: None,
            region_grades: None,
            analysis_type: "glint".to_string(),
        }
    }

    fn cv_with_region_grades(grades: &[(&str, f64)]) -> CvResults {
        let mut map = BTreeMap::new();
        for (region, grade) in grades {
            map.insert(region.to_string(), *grade);
        }
        CvResults {
            damage_score: 10.0,
            region_scores: None,
            region_grades: Some(map),
            analysis_type: "glint+classifier".to_string(),
        }
    }

    #[test]
    fn test_final_grade_within_scale_bounds() {
        for ai in ["0.5", "3.3", "9.9", "10.0", "15.0", "-4.0"] {
            for damage in [0.0, 25.0, 50.0, 100.0, 250.0] {
                let outcome = fuse(ai, Some(&cv_with_damage(damage)), None);
                assert!(
                    (GRADE_MIN..=GRADE_MAX).contains(&outcome.final_grade),
                    "ai={} damage={} produced {}",
                    ai,
                    damage,
                    outcome.final_grade
                );
            }
        }
    }

    #[test]
    fn test_malformed_ai_grade_substitutes_default() {
        for bad in ["0.0", "NaN", "", "ten", "  "] {
            let outcome = fuse(bad, None, None);
            assert_eq!(outcome.final_grade, GRADE_NEUTRAL, "input {:?}", bad);
            assert!(outcome.hybrid.is_none());
        }
    }

    #[test]
    fn test_multi_frame_grade_preferred() {
        let detailed = DetailedAnalysis {
            consensus_defects: vec!["corner crease".into()],
            single_frame_artifacts: vec![],
            suggested_grade: Some(7.5),
            notes: None,
        };
        let outcome = fuse("9.0", None, Some(&detailed));
        assert_eq!(outcome.final_grade, 7.5);
    }

    #[test]
    fn test_multi_frame_zero_grade_ignored() {
        let detailed = DetailedAnalysis {
            consensus_defects: vec![],
            single_frame_artifacts: vec![],
            suggested_grade: Some(0.0),
            notes: None,
        };
        let outcome = fuse("9.0", None, Some(&detailed));
        assert_eq!(outcome.final_grade, 9.0);
    }

    #[test]
    fn test_branch_a_classifier_wins() {
        let cv = cv_with_region_grades(&[
            ("corner_tl", 9.0),
            ("corner_tr", 8.5),
            ("surface", 8.6),
        ]);
        // mean = 8.7, AI = 8.0 -> diff 0.7 < 1.0 -> strong
        let outcome = fuse("8.0", Some(&cv), None);
        let hybrid = outcome.hybrid.unwrap();

        assert_eq!(hybrid.method, FusionMethod::ClassifierRegions);
        assert_eq!(hybrid.final_grade, 8.5);
        assert_eq!(hybrid.agreement, Agreement::Strong);
        assert_eq!(hybrid.overall_confidence, Confidence::High);
    }

    #[test]
    fn test_branch_a_moderate_agreement() {
        let cv = cv_with_region_grades(&[("surface", 6.0), ("spine", 6.0)]);
        let outcome = fuse("8.0", Some(&cv), None);
        assert_eq!(outcome.hybrid.unwrap().agreement, Agreement::Moderate);
    }

    #[test]
    fn test_branch_b_deduction() {
        // damage 50 -> deduction 1.0 -> 9.0 - 1.0 = 8.0
        let outcome = fuse("9.0", Some(&cv_with_damage(50.0)), None);
        let hybrid = outcome.hybrid.unwrap();

        assert_eq!(hybrid.method, FusionMethod::DamageDeduction);
        assert_eq!(hybrid.final_grade, 8.0);
        assert_eq!(hybrid.overall_confidence, Confidence::Medium);
    }

    #[test]
    fn test_branch_b_strong_agreement_boundary() {
        // damage 25 -> deduction exactly 0.5: still strong
        let at_boundary = fuse("9.0", Some(&cv_with_damage(25.0)), None);
        assert_eq!(at_boundary.hybrid.unwrap().agreement, Agreement::Strong);

        // one step past the boundary flips to moderate
        let past_boundary = fuse("9.0", Some(&cv_with_damage(26.0)), None);
        assert_eq!(past_boundary.hybrid.unwrap().agreement, Agreement::Moderate);
    }

    #[test]
    fn test_branch_b_floors_at_scale_minimum() {
        let outcome = fuse("1.0", Some(&cv_with_damage(100.0)), None);
        assert_eq!(outcome.final_grade, GRADE_MIN);
    }

    #[test]
    fn test_branch_c_no_cv_signal() {
        let outcome = fuse("8.5", None, None);
        assert!(outcome.hybrid.is_none());
        assert_eq!(outcome.final_grade, 8.5);
    }

    #[test]
    fn test_fusion_never_panics_on_garbage() {
        let cv = cv_with_damage(f64::NAN);
        let outcome = fuse("NaN", Some(&cv), Some(&DetailedAnalysis {
            consensus_defects: vec![],
            single_frame_artifacts: vec![],
            suggested_grade: Some(f64::NAN),
            notes: None,
        }));
        assert!((GRADE_MIN..=GRADE_MAX).contains(&outcome.final_grade));
    }
}
