//! Ranker (spec §4.8 final paragraph): mixes composite/novelty/feasibility
//! into a final score under one of four strategies, assigns tiers, and
//! produces a sequential 1-based rank.

use crate::model::{RankedCandidate, RepurposingCandidate, ScoreBreakdown, Tier};

/// Only "balanced" is named explicitly in spec §4.8; the other three trade
/// off composite evidence strength against novelty/feasibility emphasis
/// (see DESIGN.md open question on the unnamed strategies).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Balanced,
    Conservative,
    Aggressive,
    FeasibilityFirst,
}

impl Strategy {
    fn weights(self) -> (f64, f64, f64) {
        match self {
            Strategy::Balanced => (0.6, 0.2, 0.2),
            Strategy::Conservative => (0.8, 0.1, 0.1),
            Strategy::Aggressive => (0.4, 0.4, 0.2),
            Strategy::FeasibilityFirst => (0.4, 0.2, 0.4),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NoveltyInputs {
    pub different_therapeutic_area: bool,
    pub no_prior_trials_for_disease: bool,
    pub not_in_known_repurposing_set: bool,
    pub unexpected_mechanism: bool,
    pub years_on_market: Option<f64>,
}

fn novelty_mix(inputs: &NoveltyInputs) -> f64 {
    let mut score = 0.0;
    if inputs.different_therapeutic_area {
        score += 40.0;
    }
    if inputs.no_prior_trials_for_disease {
        score += 30.0;
    }
    if inputs.not_in_known_repurposing_set {
        score += 20.0;
    }
    if inputs.unexpected_mechanism {
        score += 20.0;
    }
    if inputs.years_on_market.is_some_and(|y| y < 5.0) {
        score += 10.0;
    }
    score.min(100.0)
}

#[derive(Debug, Clone, Default)]
pub struct FeasibilityInputs {
    pub phase: u8,
    pub oral: bool,
    pub safety_score: f64,
    pub patent_expired: bool,
    pub dosing_known: bool,
}

fn phase_bucket(phase: u8) -> f64 {
    if phase >= 3 {
        40.0
    } else if phase == 2 {
        30.0
    } else {
        20.0
    }
}

fn safety_bucket(safety_score: f64) -> f64 {
    if safety_score >= 80.0 {
        20.0
    } else if safety_score >= 50.0 {
        15.0
    } else {
        10.0
    }
}

fn feasibility_mix(inputs: &FeasibilityInputs) -> f64 {
    let mut score = phase_bucket(inputs.phase) + safety_bucket(inputs.safety_score);
    if inputs.oral {
        score += 20.0;
    }
    if inputs.patent_expired {
        score += 10.0;
    }
    if inputs.dosing_known {
        score += 10.0;
    }
    score.min(100.0)
}

fn tier_for(final_score: f64, phase: u8, has_clinical_evidence: bool) -> Tier {
    if final_score >= 70.0 || (phase == 4 && has_clinical_evidence) {
        Tier::HighPriority
    } else if final_score >= 50.0 || phase >= 3 {
        Tier::MediumPriority
    } else {
        Tier::LowPriority
    }
}

fn recommendation_for(tier: Tier, candidate: &RepurposingCandidate) -> String {
    match tier {
        Tier::HighPriority => format!(
            "{} is a high-priority repurposing candidate for {}; advance to experimental validation.",
            candidate.drug_name, candidate.proposed_indication
        ),
        Tier::MediumPriority => format!(
            "{} shows moderate repurposing potential for {}; further evidence gathering recommended before validation.",
            candidate.drug_name, candidate.proposed_indication
        ),
        Tier::LowPriority => format!(
            "{} is a low-priority candidate for {} given current evidence.",
            candidate.drug_name, candidate.proposed_indication
        ),
    }
}

pub struct RankInput {
    pub candidate: RepurposingCandidate,
    pub breakdown: ScoreBreakdown,
    pub novelty_inputs: NoveltyInputs,
    pub feasibility_inputs: FeasibilityInputs,
    pub has_clinical_evidence: bool,
}

/// Sequential, 1-based ranks: every candidate gets a distinct rank equal to
/// its position in the sorted order (spec.md §3, §8 — ranks are the
/// integers 1..N without gaps or duplicates, ties broken by sort order only).
pub fn rank(strategy: Strategy, inputs: Vec<RankInput>) -> Vec<RankedCandidate> {
    let (composite_weight, novelty_weight, feasibility_weight) = strategy.weights();

    let mut scored: Vec<(RankInput, f64, f64, f64)> = inputs
        .into_iter()
        .map(|input| {
            let novelty_score = novelty_mix(&input.novelty_inputs);
            let feasibility_score = feasibility_mix(&input.feasibility_inputs);
            let final_score = composite_weight * input.breakdown.composite_score
                + novelty_weight * novelty_score
                + feasibility_weight * feasibility_score;
            (input, novelty_score, feasibility_score, final_score)
        })
        .collect();

    scored.sort_by(|a, b| b.3.partial_cmp(&a.3).unwrap_or(std::cmp::Ordering::Equal));

    scored
        .into_iter()
        .enumerate()
        .map(|(index, (input, novelty_score, feasibility_score, final_score))| {
            let tier = tier_for(final_score, input.candidate.phase, input.has_clinical_evidence);
            let recommendation = recommendation_for(tier, &input.candidate);

            RankedCandidate {
                candidate: input.candidate,
                rank: index + 1,
                composite_score: input.breakdown.composite_score,
                novelty_score,
                feasibility_score,
                final_score,
                tier,
                recommendation,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Feasibility;

    fn candidate(drug_id: &str) -> RepurposingCandidate {
        RepurposingCandidate::new(
            drug_id.into(),
            "Drug".into(),
            4,
            "small molecule".into(),
            "BRAF".into(),
            String::new(),
            "melanoma".into(),
            "kinase inhibition".into(),
            0.6,
            0.3,
            vec![],
            0.7,
            4,
            vec![],
            vec![],
            vec![],
            vec![],
            vec![],
            vec![],
            100.0,
            Feasibility::High,
        )
        .unwrap()
    }

    fn breakdown(composite: f64) -> ScoreBreakdown {
        ScoreBreakdown {
            composite_score: composite,
            novelty_score: 70.0,
            clinical_phase_score: 100.0,
            evidence_score: 80.0,
            mechanism_score: 80.0,
            safety_score: 90.0,
            confidence: 0.9,
            reasoning: vec![],
            flags: vec![],
        }
    }

    #[test]
    fn tied_scores_still_get_distinct_sequential_ranks() {
        let inputs = vec![
            RankInput {
                candidate: candidate("A"),
                breakdown: breakdown(80.0),
                novelty_inputs: NoveltyInputs::default(),
                feasibility_inputs: FeasibilityInputs::default(),
                has_clinical_evidence: true,
            },
            RankInput {
                candidate: candidate("B"),
                breakdown: breakdown(80.0),
                novelty_inputs: NoveltyInputs::default(),
                feasibility_inputs: FeasibilityInputs::default(),
                has_clinical_evidence: true,
            },
            RankInput {
                candidate: candidate("C"),
                breakdown: breakdown(10.0),
                novelty_inputs: NoveltyInputs::default(),
                feasibility_inputs: FeasibilityInputs::default(),
                has_clinical_evidence: false,
            },
        ];
        let ranked = rank(Strategy::Balanced, inputs);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[1].rank, 2);
        assert_eq!(ranked[2].rank, 3);
    }

    #[test]
    fn high_tier_requires_high_final_or_approved_with_clinical_evidence() {
        assert_eq!(tier_for(75.0, 2, false), Tier::HighPriority);
        assert_eq!(tier_for(40.0, 4, true), Tier::HighPriority);
        assert_eq!(tier_for(40.0, 4, false), Tier::MediumPriority);
    }

    #[test]
    fn novelty_mix_caps_at_100() {
        let inputs = NoveltyInputs {
            different_therapeutic_area: true,
            no_prior_trials_for_disease: true,
            not_in_known_repurposing_set: true,
            unexpected_mechanism: true,
            years_on_market: Some(2.0),
        };
        assert_eq!(novelty_mix(&inputs), 100.0);
    }
}
