//! Repurposing candidates and their scores (spec §3 `RepurposingCandidate`,
//! `ScoreBreakdown`, `RankedCandidate`).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Feasibility {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    #[serde(rename = "High Priority")]
    HighPriority,
    #[serde(rename = "Medium Priority")]
    MediumPriority,
    #[serde(rename = "Low Priority")]
    LowPriority,
}

/// The repurposing filter's core rule (spec §4.6 step 3, §8): substring
/// containment of the (lowercased) query disease name, or ≥2 overlapping
/// word tokens longer than 3 characters. Shared by `RepurposingCandidate`'s
/// construction guard and `mre::filters`, which layers disease-synonym
/// awareness on top (spec §9 open question on "lung cancer" vs "small cell
/// lung cancer").
pub fn indication_overlaps(original_indication: &str, query_disease: &str) -> bool {
    let original = original_indication.trim().to_ascii_lowercase();
    let query = query_disease.trim().to_ascii_lowercase();
    if original.is_empty() || query.is_empty() {
        return false;
    }
    if original.contains(&query) {
        return true;
    }

    let query_tokens: std::collections::HashSet<&str> =
        query.split_whitespace().filter(|t| t.len() > 3).collect();
    let overlap = original
        .split_whitespace()
        .filter(|t| t.len() > 3 && query_tokens.contains(t))
        .count();
    overlap >= 2
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepurposingCandidate {
    pub drug_id: String,
    pub drug_name: String,
    pub phase: u8,
    pub drug_type: String,
    pub molecular_target: String,
    pub original_indication: String,
    pub proposed_indication: String,
    pub mechanism_of_action: String,
    pub mechanistic_confidence: f64,
    pub pathway_overlap_score: f64,
    pub shared_pathways: Vec<String>,
    pub opentargets_score: f64,
    pub clinical_phase_original: u8,
    pub in_vitro_experiments: Vec<String>,
    pub in_vivo_experiments: Vec<String>,
    pub biomarkers: Vec<String>,
    pub safety_concerns: Vec<String>,
    pub contraindications: Vec<String>,
    pub pk_considerations: Vec<String>,
    pub novelty_score: f64,
    pub repurposing_feasibility: Feasibility,
}

impl RepurposingCandidate {
    /// Returns `None` (caller must drop the drug) if `original_indication`
    /// overlaps `proposed_indication` under the repurposing filter rule —
    /// the spec §3 invariant enforced at construction, not just by the
    /// upstream filter having already run.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        drug_id: String,
        drug_name: String,
        phase: u8,
        drug_type: String,
        molecular_target: String,
        original_indication: String,
        proposed_indication: String,
        mechanism_of_action: String,
        mechanistic_confidence: f64,
        pathway_overlap_score: f64,
        shared_pathways: Vec<String>,
        opentargets_score: f64,
        clinical_phase_original: u8,
        in_vitro_experiments: Vec<String>,
        in_vivo_experiments: Vec<String>,
        biomarkers: Vec<String>,
        safety_concerns: Vec<String>,
        contraindications: Vec<String>,
        pk_considerations: Vec<String>,
        novelty_score: f64,
        repurposing_feasibility: Feasibility,
    ) -> Option<Self> {
        if !original_indication.trim().is_empty()
            && indication_overlaps(&original_indication, &proposed_indication)
        {
            return None;
        }
        Some(Self {
            drug_id,
            drug_name,
            phase,
            drug_type,
            molecular_target,
            original_indication,
            proposed_indication,
            mechanism_of_action,
            mechanistic_confidence,
            pathway_overlap_score,
            shared_pathways,
            opentargets_score,
            clinical_phase_original,
            in_vitro_experiments,
            in_vivo_experiments,
            biomarkers,
            safety_concerns,
            contraindications,
            pk_considerations,
            novelty_score,
            repurposing_feasibility,
        })
    }

    /// spec §4.6 step 8 / overall ranking key.
    pub fn ranking_key(&self) -> f64 {
        0.35 * self.mechanistic_confidence
            + 0.2 * self.pathway_overlap_score
            + 0.35 * self.opentargets_score
            + 0.1 * (f64::from(self.phase) / 4.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub composite_score: f64,
    pub novelty_score: f64,
    pub clinical_phase_score: f64,
    pub evidence_score: f64,
    pub mechanism_score: f64,
    pub safety_score: f64,
    pub confidence: f64,
    pub reasoning: Vec<String>,
    pub flags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedCandidate {
    #[serde(flatten)]
    pub candidate: RepurposingCandidate,
    pub rank: usize,
    pub composite_score: f64,
    pub novelty_score: f64,
    pub feasibility_score: f64,
    pub final_score: f64,
    pub tier: Tier,
    pub recommendation: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder(original: &str, proposed: &str) -> Option<RepurposingCandidate> {
        RepurposingCandidate::new(
            "CHEMBL1".into(),
            "Exampleumab".into(),
            4,
            "antibody".into(),
            "BRAF".into(),
            original.into(),
            proposed.into(),
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
    }

    #[test]
    fn construction_rejects_matching_indication_by_substring() {
        assert!(builder("metastatic melanoma", "melanoma").is_none());
    }

    #[test]
    fn construction_rejects_matching_indication_by_token_overlap() {
        assert!(builder("chronic kidney disease", "kidney disease stage 3").is_none());
    }

    #[test]
    fn construction_keeps_unrelated_indication() {
        assert!(builder("rheumatoid arthritis", "melanoma").is_some());
    }

    #[test]
    fn construction_keeps_drug_with_no_known_indication() {
        assert!(builder("", "melanoma").is_some());
    }

    #[test]
    fn single_token_overlap_is_not_enough() {
        assert!(!indication_overlaps("lung fibrosis", "lung cancer"));
    }
}
