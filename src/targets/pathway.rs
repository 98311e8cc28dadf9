//! Mechanism validation and disease-pathway inference (spec §4.5 step 4,
//! §4.5.1). Gene symbol → UniProt accession (reviewed preferred) → Reactome
//! pathway set, compared to the disease's pathway set via Jaccard.

use std::collections::BTreeSet;

use crate::sources::reactome::ReactomeClient;
use crate::sources::uniprot::UniProtClient;

/// spec §4.5 step 4: keep threshold and the higher "high confidence" bar.
pub const KEEP_THRESHOLD: f64 = 0.15;
pub const HIGH_CONFIDENCE_THRESHOLD: f64 = 0.30;

/// How many targets by composite score contribute to the disease pathway
/// union (spec §4.5.1).
pub const DISEASE_PATHWAY_TOP_N: usize = 20;

#[derive(Debug, Clone, Copy)]
pub struct MechanismValidation {
    pub jaccard: f64,
    pub keep: bool,
    pub high_confidence: bool,
}

pub fn validate_mechanism(target_pathways: &BTreeSet<String>, disease_pathways: &BTreeSet<String>) -> MechanismValidation {
    let jaccard = jaccard_index(target_pathways, disease_pathways);
    MechanismValidation {
        jaccard,
        keep: jaccard >= KEEP_THRESHOLD,
        high_confidence: jaccard >= HIGH_CONFIDENCE_THRESHOLD,
    }
}

pub fn jaccard_index(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// spec §4.5 step 4: "resolving gene symbol → UniProt preferring reviewed
/// entries". Returns `None` when the search turns up nothing.
pub async fn resolve_uniprot_accession(uniprot: &UniProtClient, gene_symbol: &str) -> Option<String> {
    let query = format!("gene:{gene_symbol} AND organism_id:9606");
    let page = uniprot.search(&query, 25, 0, None).await.ok()?;
    page.results
        .iter()
        .find(|r| r.is_reviewed())
        .or_else(|| page.results.first())
        .map(|r| r.primary_accession.clone())
}

pub async fn pathway_ids_for_accession(reactome: &ReactomeClient, uniprot_accession: &str) -> BTreeSet<String> {
    reactome
        .pathways_for_protein(uniprot_accession)
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|h| h.stable_id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn jaccard_of_disjoint_sets_is_zero() {
        assert_eq!(jaccard_index(&set(&["A"]), &set(&["B"])), 0.0);
    }

    #[test]
    fn jaccard_of_identical_sets_is_one() {
        assert_eq!(jaccard_index(&set(&["A", "B"]), &set(&["A", "B"])), 1.0);
    }

    #[test]
    fn validate_mechanism_flags_high_confidence_above_030() {
        let target = set(&["A", "B", "C"]);
        let disease = set(&["A", "B", "C", "D"]);
        let validation = validate_mechanism(&target, &disease);
        assert!(validation.jaccard >= HIGH_CONFIDENCE_THRESHOLD);
        assert!(validation.keep);
        assert!(validation.high_confidence);
    }

    #[test]
    fn validate_mechanism_rejects_below_keep_threshold() {
        let target = set(&["A"]);
        let disease = set(&["A", "B", "C", "D", "E", "F", "G", "H"]);
        let validation = validate_mechanism(&target, &disease);
        assert!(!validation.keep);
        assert!(!validation.high_confidence);
    }
}
