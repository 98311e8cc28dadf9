//! Independent evidence validation (spec §4.5 step 5): a composite of
//! gene–disease association, UniProt entry quality, and gene
//! characterization, each contributing its own accept path.

use crate::sources::uniprot::UniProtRecord;

#[derive(Debug, Clone, Copy)]
pub struct EvidenceValidation {
    pub association_score: f64,
    pub uniprot_quality: f64,
    pub characterization: f64,
    pub composite: f64,
    pub accept: bool,
}

/// spec §4.5 step 5b: reviewed + function + disease-involvement, capped 1.0.
pub fn uniprot_quality_score(record: Option<&UniProtRecord>) -> f64 {
    let Some(record) = record else {
        return 0.0;
    };
    let mut score = 0.0;
    if record.is_reviewed() {
        score += 0.4;
    }
    if record.function_summary().is_some() {
        score += 0.3;
    }
    if record.has_disease_comment() {
        score += 0.3;
    }
    score.min(1.0)
}

/// spec §4.5 step 5c: identifier + summary, capped 1.0.
pub fn characterization_score(record: Option<&UniProtRecord>) -> f64 {
    let Some(record) = record else {
        return 0.0;
    };
    let mut score = 0.0;
    if record.primary_gene_symbol().is_some() || !record.primary_accession.is_empty() {
        score += 0.5;
    }
    if record.function_summary().is_some() {
        score += 0.5;
    }
    score.min(1.0)
}

/// spec §4.5 step 5: composite = 0.40a + 0.30b + 0.30c; accept if a > 0 OR
/// composite ≥ 0.20 OR (b ≥ 0.30 AND c ≥ 0.30).
pub fn validate(association_score: f64, uniprot_quality: f64, characterization: f64) -> EvidenceValidation {
    let composite = 0.40 * association_score + 0.30 * uniprot_quality + 0.30 * characterization;
    let accept = association_score > 0.0 || composite >= 0.20 || (uniprot_quality >= 0.30 && characterization >= 0.30);
    EvidenceValidation {
        association_score,
        uniprot_quality,
        characterization,
        composite,
        accept,
    }
}

/// spec §4.5 steps 4/5, §9 open question: "keep the top half by
/// composite/validation score, minimum of 5 (or all, if fewer than 5 were
/// fetched)". Shared by both safety-net points in `targets::mod`.
pub fn safety_net_count(total: usize) -> usize {
    if total <= 5 {
        total
    } else {
        (total / 2).max(5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_when_association_score_positive_even_if_composite_low() {
        let v = validate(0.05, 0.0, 0.0);
        assert!(v.accept);
    }

    #[test]
    fn accept_when_composite_crosses_020_threshold() {
        let v = validate(0.0, 0.5, 0.2);
        assert!(v.composite >= 0.20);
        assert!(v.accept);
    }

    #[test]
    fn accept_via_quality_and_characterization_both_above_030() {
        let v = validate(0.0, 0.35, 0.35);
        assert!(v.accept);
    }

    #[test]
    fn reject_when_all_terms_weak() {
        let v = validate(0.0, 0.1, 0.1);
        assert!(!v.accept);
    }

    #[test]
    fn safety_net_count_keeps_minimum_five() {
        assert_eq!(safety_net_count(4), 4);
        assert_eq!(safety_net_count(6), 5);
        assert_eq!(safety_net_count(40), 20);
    }
}
