//! Mechanistic Repurposing Engine (spec §4.6): for each validated target,
//! fetch known drugs, filter out drugs whose original indication already is
//! the query disease, and emit a scored `RepurposingCandidate` per survivor.

pub mod filters;
pub mod rationale;
pub mod safety;
pub mod scoring;
pub mod validation_plan;

use std::collections::BTreeSet;

use tokio::sync::Semaphore;

use crate::model::{DiseaseContext, RepurposingCandidate, Target};
use crate::sources::opentargets::{KnownDrugRow, OpenTargetsClient};
use crate::sources::reactome::ReactomeClient;

/// Per-target cap on emitted candidates (spec §4.6 step 8).
const MAX_CANDIDATES_PER_TARGET: usize = 15;
/// Overall cap across all targets (spec §4.6 final paragraph default top-N).
const DEFAULT_TOP_N: usize = 50;
const MAX_CONCURRENT_TARGET_LOOKUPS: usize = 8;

pub struct MreClients<'a> {
    pub opentargets: &'a OpenTargetsClient,
    pub reactome: &'a ReactomeClient,
}

/// Runs the full engine over every validated target concurrently (bounded),
/// then applies the cross-target ranking key and truncates to `top_n`.
pub async fn generate_candidates(
    clients: &MreClients<'_>,
    disease: &DiseaseContext,
    targets: &[Target],
    disease_pathway_ids: &BTreeSet<String>,
    min_phase: u8,
    top_n: usize,
) -> Vec<RepurposingCandidate> {
    let semaphore = Semaphore::new(MAX_CONCURRENT_TARGET_LOOKUPS);
    let futures = targets.iter().map(|target| {
        let semaphore = &semaphore;
        async move {
            let _permit = semaphore.acquire().await.expect("semaphore never closed");
            candidates_for_target(clients, disease, target, disease_pathway_ids, min_phase).await
        }
    });
    let mut all: Vec<RepurposingCandidate> = futures::future::join_all(futures)
        .await
        .into_iter()
        .flatten()
        .collect();

    all.sort_by(|a, b| {
        b.ranking_key()
            .partial_cmp(&a.ranking_key())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let cap = if top_n == 0 { DEFAULT_TOP_N } else { top_n };
    all.truncate(cap);
    all
}

async fn candidates_for_target(
    clients: &MreClients<'_>,
    disease: &DiseaseContext,
    target: &Target,
    disease_pathway_ids: &BTreeSet<String>,
    min_phase: u8,
) -> Vec<RepurposingCandidate> {
    let rows = clients
        .opentargets
        .known_drugs_for_target(&target.ensembl_id)
        .await
        .unwrap_or_default();

    let target_pathway_ids: BTreeSet<String> = target.reactome_pathway_ids.iter().cloned().collect();
    let shared_ids: BTreeSet<String> = target_pathway_ids.intersection(disease_pathway_ids).cloned().collect();
    let pathway_overlap = super::targets::pathway::jaccard_index(&target_pathway_ids, disease_pathway_ids);
    let shared_pathway_names = shared_pathway_names(clients.reactome, target, &shared_ids).await;

    let target_score = target.composite_score.clamp(0.0, 1.0);

    let mut built: Vec<RepurposingCandidate> = rows
        .into_iter()
        .filter_map(|row| build_candidate(row, disease, target, min_phase, pathway_overlap, target_score, &shared_pathway_names))
        .collect();

    built.sort_by(|a, b| {
        b.mechanistic_confidence
            .partial_cmp(&a.mechanistic_confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    built.truncate(MAX_CANDIDATES_PER_TARGET);
    built
}

fn build_candidate(
    row: KnownDrugRow,
    disease: &DiseaseContext,
    target: &Target,
    min_phase: u8,
    pathway_overlap: f64,
    target_score: f64,
    shared_pathway_names: &[String],
) -> Option<RepurposingCandidate> {
    let phase = row
        .maximum_clinical_trial_phase
        .max(row.phase)
        .unwrap_or(0)
        .clamp(0, 4);
    if phase < min_phase {
        return None;
    }

    let original_indication = row.disease_name.clone().unwrap_or_default();
    if !filters::passes_repurposing_filter(&original_indication, disease) {
        return None;
    }

    let moa = row.mechanism_of_action.clone().unwrap_or_default();
    let moa_known = !moa.trim().is_empty();
    let confidence = scoring::mechanistic_confidence(pathway_overlap, target_score, phase, moa_known);

    let plan = validation_plan::build(phase);
    let original_area = crate::resolver::therapeutic_area::classify(&[], &[], &original_indication);
    let safety = safety::assess(phase, &row.drug_type, disease, original_area);
    let feasibility = scoring::feasibility(phase, pathway_overlap, &safety);

    let rationale_moa = if moa_known { moa.as_str() } else { "an undetermined mechanism of action" };
    let mechanism_of_action = rationale::render(
        &row.drug_name,
        &target.symbol,
        rationale_moa,
        &disease.canonical_label,
        shared_pathway_names,
        pathway_overlap,
    );

    RepurposingCandidate::new(
        row.drug_id,
        row.drug_name,
        phase,
        row.drug_type,
        target.symbol.clone(),
        original_indication,
        disease.canonical_label.clone(),
        mechanism_of_action,
        confidence,
        pathway_overlap,
        shared_pathway_names.to_vec(),
        target.opentargets_score,
        phase,
        plan.in_vitro,
        plan.in_vivo,
        plan.biomarkers,
        safety.concerns,
        safety.contraindications,
        safety.pk_considerations,
        scoring::NOVELTY_SCORE,
        feasibility,
    )
}

async fn shared_pathway_names(reactome: &ReactomeClient, target: &Target, shared_ids: &BTreeSet<String>) -> Vec<String> {
    if shared_ids.is_empty() {
        return Vec::new();
    }
    let Some(accession) = target.uniprot_accession.as_deref() else {
        return Vec::new();
    };
    reactome
        .pathways_for_protein(accession)
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|hit| shared_ids.contains(&hit.stable_id))
        .map(|hit| hit.name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DiseaseFlags, TherapeuticArea};

    fn disease() -> DiseaseContext {
        DiseaseContext::new(
            "melanoma".into(),
            Some("EFO_0000756".into()),
            None,
            None,
            TherapeuticArea::Oncology,
            DiseaseFlags { is_cancer: true, ..Default::default() },
            vec![],
            vec![],
            1.0,
            1.0,
        )
        .unwrap()
    }

    fn target() -> Target {
        Target {
            symbol: "BRAF".into(),
            ensembl_id: "ENSG00000157764".into(),
            uniprot_accession: Some("P15056".into()),
            biotype: "protein_coding".into(),
            opentargets_score: 0.8,
            composite_score: 0.7,
            validation_score: Some(0.6),
            mechanism_score: Some(0.4),
            pathway_jaccard: Some(0.4),
            reactome_pathway_ids: vec!["R-HSA-1".into(), "R-HSA-2".into()],
            evidence_count: 3,
            safety_net: false,
        }
    }

    fn row(disease_name: Option<&str>, phase: Option<f64>) -> KnownDrugRow {
        KnownDrugRow {
            drug_id: "CHEMBL1".into(),
            drug_name: "Vemurafenib".into(),
            drug_type: "small molecule".into(),
            phase: phase.map(|p| p as u8),
            maximum_clinical_trial_phase: phase.map(|p| p as u8),
            mechanism_of_action: Some("BRAF inhibition".into()),
            disease_name: disease_name.map(str::to_string),
        }
    }

    #[test]
    fn build_candidate_drops_low_phase_below_min_phase() {
        let d = disease();
        let t = target();
        let out = build_candidate(row(None, Some(1.0)), &d, &t, 2, 0.2, 0.7, &[]);
        assert!(out.is_none());
    }

    #[test]
    fn build_candidate_drops_matching_original_indication() {
        let d = disease();
        let t = target();
        let out = build_candidate(row(Some("metastatic melanoma"), Some(4.0)), &d, &t, 0, 0.2, 0.7, &[]);
        assert!(out.is_none());
    }

    #[test]
    fn build_candidate_keeps_unrelated_indication_above_min_phase() {
        let d = disease();
        let t = target();
        let out = build_candidate(row(Some("psoriasis"), Some(4.0)), &d, &t, 0, 0.2, 0.7, &[]);
        assert!(out.is_some());
        let candidate = out.unwrap();
        assert_eq!(candidate.phase, 4);
        assert!(candidate.mechanism_of_action.contains("Vemurafenib modulates BRAF"));
    }

    #[test]
    fn build_candidate_keeps_drug_with_no_recorded_indication() {
        let d = disease();
        let t = target();
        let out = build_candidate(row(None, Some(2.0)), &d, &t, 0, 0.2, 0.7, &[]);
        assert!(out.is_some());
    }

    #[test]
    fn build_candidate_flags_cardiotoxicity_for_cardiovascular_original_indication() {
        let d = disease();
        let t = target();
        let out = build_candidate(row(Some("chronic heart failure"), Some(4.0)), &d, &t, 0, 0.2, 0.7, &[]);
        let candidate = out.unwrap();
        assert!(candidate.safety_concerns.iter().any(|s| s.contains("cardiotoxicity")));
    }
}
