//! Validated disease target (spec §3 `Target`, §4.5).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub symbol: String,
    pub ensembl_id: String,
    pub uniprot_accession: Option<String>,
    pub biotype: String,
    /// Row score from the target-association DB, pre-normalization.
    pub opentargets_score: f64,
    /// 0.7·base + 0.2·evidence_diversity + 0.1·tractability, each
    /// min-max normalized over the fetched set (spec §4.5 step 2).
    pub composite_score: f64,
    /// Independent gene–disease + UniProt + characterization composite
    /// (spec §4.5 step 5). `None` until evidence validation runs.
    pub validation_score: Option<f64>,
    /// Pathway-Jaccard-derived confidence that this target's mechanism is
    /// relevant to the disease (spec §4.5 step 4). `None` until mechanism
    /// validation runs.
    pub mechanism_score: Option<f64>,
    pub pathway_jaccard: Option<f64>,
    pub reactome_pathway_ids: Vec<String>,
    pub evidence_count: usize,
    /// Set when this target only survived because the "keep top half,
    /// minimum 5" safety net fired (spec §4.5 steps 4/5, §9 open question).
    pub safety_net: bool,
}

impl Target {
    /// Protein-coding with a nonzero base score — the only eligibility gate
    /// before scoring/filtering runs (spec §3 invariant).
    pub fn is_eligible(biotype: &str, opentargets_score: f64) -> bool {
        biotype == "protein_coding" && opentargets_score > 0.0
    }

    /// Spec §3: "after pathway validation a Target carries at least one of
    /// the validation signals" — mechanism score, validation score, or the
    /// explicit safety-net flag.
    pub fn has_validation_signal(&self) -> bool {
        self.mechanism_score.is_some() || self.validation_score.is_some() || self.safety_net
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eligibility_requires_protein_coding_and_positive_score() {
        assert!(Target::is_eligible("protein_coding", 0.1));
        assert!(!Target::is_eligible("protein_coding", 0.0));
        assert!(!Target::is_eligible("lncRNA", 0.9));
    }

    fn sample() -> Target {
        Target {
            symbol: "BRAF".into(),
            ensembl_id: "ENSG00000157764".into(),
            uniprot_accession: Some("P15056".into()),
            biotype: "protein_coding".into(),
            opentargets_score: 0.8,
            composite_score: 0.7,
            validation_score: None,
            mechanism_score: None,
            pathway_jaccard: None,
            reactome_pathway_ids: vec![],
            evidence_count: 3,
            safety_net: false,
        }
    }

    #[test]
    fn validation_signal_requires_some_evidence_or_explicit_safety_net() {
        let mut t = sample();
        assert!(!t.has_validation_signal());
        t.mechanism_score = Some(0.4);
        assert!(t.has_validation_signal());

        let mut t2 = sample();
        t2.safety_net = true;
        assert!(t2.has_validation_signal());
    }
}
