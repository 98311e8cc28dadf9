//! Scoring Engine (spec §4.8): five weighted sub-scorers, each bounded to
//! [0,100], summed into a transparent composite with a data-completeness
//! confidence.

use crate::error::RepurposeError;
use crate::model::ScoreBreakdown;

#[derive(Debug, Clone, Copy)]
pub struct Weights {
    pub clinical_phase: f64,
    pub evidence: f64,
    pub mechanism: f64,
    pub safety: f64,
    pub novelty: f64,
}

impl Weights {
    /// spec §4.8: "must sum to 1.0, validated at construction".
    pub fn new(clinical_phase: f64, evidence: f64, mechanism: f64, safety: f64, novelty: f64) -> Result<Self, RepurposeError> {
        let sum = clinical_phase + evidence + mechanism + safety + novelty;
        if (sum - 1.0).abs() > 1e-9 {
            return Err(RepurposeError::Config(format!("scoring weights must sum to 1.0, got {sum}")));
        }
        Ok(Self { clinical_phase, evidence, mechanism, safety, novelty })
    }

    pub fn balanced() -> Self {
        Self::new(0.35, 0.25, 0.20, 0.10, 0.10).expect("balanced weights sum to 1.0")
    }
}

/// Every field the five sub-scorers and the confidence calculation read.
/// Optional fields track which evidence streams were available for a given
/// candidate, feeding `data_completeness`.
#[derive(Debug, Clone, Default)]
pub struct ScoreInputs {
    pub phase: u8,
    pub has_clinical_evidence: bool,
    pub opentargets_score: f64,
    pub evidence_count: usize,
    pub literature_count: Option<usize>,
    pub pathway_overlap: Option<f64>,
    pub mechanism_known: bool,
    pub druggability: Option<f64>,
    pub black_box_warning: bool,
    pub serious_adverse_events: bool,
    pub market_withdrawal: bool,
    pub years_on_market: Option<f64>,
    pub repurposing_novelty: Option<f64>,
    pub has_known_original_indication: bool,
}

fn clinical_phase_score(phase: u8) -> f64 {
    match phase {
        0 => 10.0,
        1 => 30.0,
        2 => 50.0,
        3 => 70.0,
        _ => 100.0,
    }
}

fn literature_bucket(count: Option<usize>) -> f64 {
    count.map(|c| (c as f64 * 2.0).min(10.0)).unwrap_or(0.0)
}

fn evidence_score(inputs: &ScoreInputs) -> f64 {
    let clinical_term = if inputs.has_clinical_evidence { 40.0 } else { 0.0 };
    let opentargets_term = 30.0 * inputs.opentargets_score;
    let evidence_term = (5.0 * inputs.evidence_count as f64).min(20.0);
    let literature_term = literature_bucket(inputs.literature_count);
    (clinical_term + opentargets_term + evidence_term + literature_term).clamp(0.0, 100.0)
}

fn druggability_bucket(druggability: Option<f64>) -> f64 {
    druggability.unwrap_or(0.0).clamp(0.0, 1.0) * 15.0
}

fn mechanism_score(inputs: &ScoreInputs) -> f64 {
    let opentargets_term = 40.0 * inputs.opentargets_score;
    let pathway_term = match inputs.pathway_overlap {
        Some(overlap) if overlap >= 0.15 => 30.0 * overlap.min(1.0),
        _ => 5.0,
    };
    let mechanism_term = if inputs.mechanism_known { 15.0 } else { 0.0 };
    let druggability_term = druggability_bucket(inputs.druggability);
    (opentargets_term + pathway_term + mechanism_term + druggability_term).clamp(0.0, 100.0)
}

fn safety_score(inputs: &ScoreInputs) -> f64 {
    let mut score = 100.0;
    if inputs.black_box_warning {
        score -= 30.0;
    }
    if inputs.serious_adverse_events {
        score -= 20.0;
    }
    if inputs.market_withdrawal {
        score -= 40.0;
    }
    if inputs.years_on_market.is_some_and(|years| years >= 10.0) {
        score += 10.0;
    }
    score.clamp(0.0, 100.0)
}

fn novelty_score(inputs: &ScoreInputs) -> f64 {
    inputs
        .repurposing_novelty
        .unwrap_or(if inputs.has_known_original_indication { 70.0 } else { 50.0 })
        .clamp(0.0, 100.0)
}

fn data_completeness(inputs: &ScoreInputs) -> f64 {
    let fields: [bool; 5] = [
        inputs.has_clinical_evidence,
        inputs.pathway_overlap.is_some(),
        inputs.literature_count.is_some(),
        inputs.druggability.is_some(),
        inputs.repurposing_novelty.is_some(),
    ];
    fields.iter().filter(|present| **present).count() as f64 / fields.len() as f64
}

pub fn score(weights: &Weights, inputs: &ScoreInputs) -> ScoreBreakdown {
    let clinical_phase_score = clinical_phase_score(inputs.phase);
    let evidence_score = evidence_score(inputs);
    let mechanism_score = mechanism_score(inputs);
    let safety_score = safety_score(inputs);
    let novelty_score = novelty_score(inputs);

    let composite_score = weights.clinical_phase * clinical_phase_score
        + weights.evidence * evidence_score
        + weights.mechanism * mechanism_score
        + weights.safety * safety_score
        + weights.novelty * novelty_score;

    let confidence = 0.5 + 0.5 * data_completeness(inputs);

    let mut reasoning = vec![
        format!("clinical phase {} contributes {clinical_phase_score:.1}", inputs.phase),
        format!("evidence sub-score {evidence_score:.1}"),
        format!("mechanism sub-score {mechanism_score:.1}"),
        format!("safety sub-score {safety_score:.1}"),
        format!("novelty sub-score {novelty_score:.1}"),
    ];
    let mut flags = Vec::new();
    if inputs.black_box_warning {
        flags.push("black_box_warning".to_string());
    }
    if inputs.serious_adverse_events {
        flags.push("serious_adverse_events".to_string());
    }
    if inputs.market_withdrawal {
        flags.push("market_withdrawal".to_string());
    }
    if data_completeness(inputs) < 1.0 {
        reasoning.push("some evidence streams were unavailable for this candidate".to_string());
    }

    ScoreBreakdown {
        composite_score,
        novelty_score,
        clinical_phase_score,
        evidence_score,
        mechanism_score,
        safety_score,
        confidence,
        reasoning,
        flags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_must_sum_to_one() {
        assert!(Weights::new(0.5, 0.5, 0.5, 0.0, 0.0).is_err());
        assert!(Weights::new(0.35, 0.25, 0.20, 0.10, 0.10).is_ok());
    }

    #[test]
    fn clinical_phase_table_matches_spec() {
        assert_eq!(clinical_phase_score(0), 10.0);
        assert_eq!(clinical_phase_score(4), 100.0);
    }

    #[test]
    fn safety_score_clamps_at_zero_for_multiple_penalties() {
        let inputs = ScoreInputs {
            black_box_warning: true,
            serious_adverse_events: true,
            market_withdrawal: true,
            ..Default::default()
        };
        assert_eq!(safety_score(&inputs), 0.0);
    }

    #[test]
    fn confidence_rises_with_data_completeness() {
        let sparse = ScoreInputs::default();
        let rich = ScoreInputs {
            has_clinical_evidence: true,
            pathway_overlap: Some(0.4),
            literature_count: Some(5),
            druggability: Some(0.8),
            repurposing_novelty: Some(90.0),
            ..Default::default()
        };
        let weights = Weights::balanced();
        let sparse_breakdown = score(&weights, &sparse);
        let rich_breakdown = score(&weights, &rich);
        assert!(rich_breakdown.confidence > sparse_breakdown.confidence);
        assert!((sparse_breakdown.confidence - 0.5).abs() < 1e-9);
        assert!((rich_breakdown.confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn composite_score_weights_sub_scores_per_spec() {
        let weights = Weights::balanced();
        let inputs = ScoreInputs { phase: 4, opentargets_score: 1.0, has_clinical_evidence: true, mechanism_known: true, ..Default::default() };
        let breakdown = score(&weights, &inputs);
        assert!(breakdown.composite_score > 0.0);
    }
}
