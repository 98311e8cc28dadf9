//! Candidate-level scoring (spec §4.6 step 7): mechanistic confidence,
//! novelty, and feasibility for a single repurposing candidate.

use crate::model::Feasibility;
use crate::mre::safety::SafetyAssessment;

/// `target_score` is the target's own composite discovery score (already in
/// [0,1] by construction in `targets::discovery::score_and_filter`), `moa_known`
/// is whether a non-empty mechanism-of-action string was available.
pub fn mechanistic_confidence(pathway_overlap: f64, target_score: f64, phase: u8, moa_known: bool) -> f64 {
    let phase_term = f64::from(phase) / 4.0;
    let moa_term = if moa_known { 0.1 } else { 0.05 };
    0.4 * pathway_overlap + 0.3 * target_score.min(1.0) + 0.2 * phase_term + moa_term
}

/// Fixed by construction: every MRE candidate targets a new indication.
pub const NOVELTY_SCORE: f64 = 100.0;

/// Safety contribution to the feasibility weighted score: starts at 1.0 and
/// is penalized per concern/contraindication raised in step 6, floored at 0.
fn safety_component(safety: &SafetyAssessment) -> f64 {
    let penalty = 0.25 * safety.concerns.len() as f64 + 0.5 * safety.contraindications.len() as f64;
    (1.0 - penalty).max(0.0)
}

/// Weighted score over {phase: 40, pathway: 40, safety: 20} maps to HIGH/MEDIUM/LOW
/// at thresholds 70/40.
pub fn feasibility(phase: u8, pathway_overlap: f64, safety: &SafetyAssessment) -> Feasibility {
    let phase_term = 40.0 * (f64::from(phase) / 4.0);
    let pathway_term = 40.0 * pathway_overlap.clamp(0.0, 1.0);
    let safety_term = 20.0 * safety_component(safety);
    let weighted = phase_term + pathway_term + safety_term;

    if weighted >= 70.0 {
        Feasibility::High
    } else if weighted >= 40.0 {
        Feasibility::Medium
    } else {
        Feasibility::Low
    }
}

/// Overall cross-target ranking key (spec §4.6 final paragraph).
pub fn ranking_key(mechanistic_confidence: f64, pathway_overlap: f64, opentargets_score: f64, phase: u8) -> f64 {
    0.35 * mechanistic_confidence + 0.2 * pathway_overlap + 0.35 * opentargets_score + 0.1 * (f64::from(phase) / 4.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mechanistic_confidence_with_known_moa_adds_full_term() {
        let with_moa = mechanistic_confidence(0.5, 0.8, 4, true);
        let without_moa = mechanistic_confidence(0.5, 0.8, 4, false);
        assert!((with_moa - without_moa - 0.05).abs() < 1e-9);
    }

    #[test]
    fn feasibility_high_for_late_phase_strong_overlap_clean_safety() {
        let safety = SafetyAssessment::default();
        assert_eq!(feasibility(4, 0.8, &safety), Feasibility::High);
    }

    #[test]
    fn feasibility_low_for_early_phase_weak_overlap() {
        let safety = SafetyAssessment {
            concerns: vec!["x".to_string(), "y".to_string()],
            contraindications: vec!["z".to_string()],
            pk_considerations: vec![],
        };
        assert_eq!(feasibility(0, 0.05, &safety), Feasibility::Low);
    }

    #[test]
    fn ranking_key_weights_opentargets_and_confidence_equally() {
        let key = ranking_key(0.5, 0.5, 0.5, 4);
        assert!((key - (0.35 * 0.5 + 0.2 * 0.5 + 0.35 * 0.5 + 0.1)).abs() < 1e-9);
    }
}
