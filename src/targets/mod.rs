//! Target discovery and validation pipeline (spec §4.5, §4.5.1): pages
//! disease-associated targets, scores and filters them, validates mechanism
//! via pathway Jaccard, validates independent evidence, and persists
//! survivors to the graph database.

pub mod discovery;
pub mod pathway;
pub mod validation;

use std::collections::BTreeSet;

use tokio::sync::Semaphore;

use crate::error::RepurposeError;
use crate::model::Target;
use crate::sources::genetics::GeneticsClient;
use crate::sources::graphdb::GraphDbClient;
use crate::sources::opentargets::OpenTargetsClient;
use crate::sources::reactome::ReactomeClient;
use crate::sources::uniprot::UniProtClient;

const MAX_CONCURRENT_PATHWAY_LOOKUPS: usize = 8;

pub struct TargetDiscoveryClients<'a> {
    pub opentargets: &'a OpenTargetsClient,
    pub uniprot: &'a UniProtClient,
    pub reactome: &'a ReactomeClient,
    pub genetics: &'a GeneticsClient,
    pub graphdb: Option<&'a GraphDbClient>,
}

/// Output of the full discovery + validation pipeline: survivors plus the
/// disease pathway set (spec §4.5.1), reused downstream by the mechanistic
/// repurposing engine.
pub struct DiscoveryOutput {
    pub targets: Vec<Target>,
    pub disease_pathway_ids: BTreeSet<String>,
}

#[allow(clippy::too_many_arguments)]
pub async fn discover_and_validate(
    clients: &TargetDiscoveryClients<'_>,
    efo_id: &str,
    min_targets: usize,
    max_targets: usize,
    top_percent: f64,
) -> Result<DiscoveryOutput, RepurposeError> {
    let rows = discovery::fetch_all_pages(clients.opentargets, efo_id).await?;
    let scored = discovery::score_and_filter(rows, min_targets, max_targets, top_percent);

    let with_pathways = fetch_pathways(clients, scored).await;

    // spec §4.5.1: disease pathway set = union over the top-N (by composite,
    // the order `score_and_filter` already sorted into) targets' own pathway
    // sets. Computed before mechanism validation runs so validation has
    // something to Jaccard against — "validated" here means "survived
    // discovery scoring", not "already mechanism-validated" (see DESIGN.md).
    let disease_pathway_ids: BTreeSet<String> = with_pathways
        .iter()
        .take(pathway::DISEASE_PATHWAY_TOP_N)
        .flat_map(|(_, _, pathways)| pathways.iter().cloned())
        .collect();

    let mechanism_survivors = apply_mechanism_validation(with_pathways, &disease_pathway_ids);
    let evidence_validated = apply_evidence_validation(clients, mechanism_survivors, efo_id).await;

    if let Some(graphdb) = clients.graphdb {
        let batch: Vec<(String, String, String)> = evidence_validated
            .iter()
            .map(|t| (t.ensembl_id.clone(), t.symbol.clone(), t.biotype.clone()))
            .collect();
        graphdb.merge_targets_batch(&batch).await;
        for target in &evidence_validated {
            let score = target.validation_score.unwrap_or(0.0) + target.mechanism_score.unwrap_or(0.0);
            if let Err(err) = graphdb
                .merge_target_disease_edge(&target.ensembl_id, efo_id, score)
                .await
            {
                tracing::warn!(target = %target.symbol, error = %err, "failed to write target-disease edge");
            }
        }
    }

    Ok(DiscoveryOutput {
        targets: evidence_validated,
        disease_pathway_ids,
    })
}

type ScoredWithPathways = (discovery::ScoredRow, Option<String>, BTreeSet<String>);

async fn fetch_pathways(
    clients: &TargetDiscoveryClients<'_>,
    scored: Vec<discovery::ScoredRow>,
) -> Vec<ScoredWithPathways> {
    let semaphore = Semaphore::new(MAX_CONCURRENT_PATHWAY_LOOKUPS);
    let futures = scored.into_iter().map(|row| {
        let semaphore = &semaphore;
        async move {
            let _permit = semaphore.acquire().await.expect("semaphore never closed");
            let accession = pathway::resolve_uniprot_accession(clients.uniprot, &row.row.approved_symbol).await;
            let pathways = match accession.as_deref() {
                Some(acc) => pathway::pathway_ids_for_accession(clients.reactome, acc).await,
                None => BTreeSet::new(),
            };
            (row, accession, pathways)
        }
    });
    futures::future::join_all(futures).await
}

fn apply_mechanism_validation(
    rows: Vec<ScoredWithPathways>,
    disease_pathway_ids: &BTreeSet<String>,
) -> Vec<(discovery::ScoredRow, Option<String>, BTreeSet<String>, pathway::MechanismValidation)> {
    let validated: Vec<_> = rows
        .into_iter()
        .map(|(row, accession, pathways)| {
            let validation = pathway::validate_mechanism(&pathways, disease_pathway_ids);
            (row, accession, pathways, validation)
        })
        .collect();

    let kept_count = validated.iter().filter(|(.., v)| v.keep).count();
    if kept_count > 0 {
        return validated.into_iter().filter(|(.., v)| v.keep).collect();
    }

    // Safety net (spec §4.5 step 4, §9 open question #2): zero survivors ⇒
    // keep the top half by composite score.
    let mut ordered = validated;
    ordered.sort_by(|a, b| {
        b.0.composite_score
            .partial_cmp(&a.0.composite_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let keep_n = validation::safety_net_count(ordered.len());
    ordered.truncate(keep_n);
    ordered
}

async fn apply_evidence_validation(
    clients: &TargetDiscoveryClients<'_>,
    rows: Vec<(discovery::ScoredRow, Option<String>, BTreeSet<String>, pathway::MechanismValidation)>,
    efo_id: &str,
) -> Vec<Target> {
    let mut candidates = Vec::with_capacity(rows.len());
    for (row, accession, pathways, mechanism) in rows {
        let record = match accession.as_deref() {
            Some(acc) => clients.uniprot.get_record(acc).await.ok(),
            None => None,
        };
        let association_score = clients
            .genetics
            .association_score(&row.row.target_id, efo_id)
            .await
            .unwrap_or(0.0);
        let uniprot_quality = validation::uniprot_quality_score(record.as_ref());
        let characterization = validation::characterization_score(record.as_ref());
        let evidence = validation::validate(association_score, uniprot_quality, characterization);

        let target = Target {
            symbol: row.row.approved_symbol.clone(),
            ensembl_id: row.row.target_id.clone(),
            uniprot_accession: accession,
            biotype: row.row.biotype.clone(),
            opentargets_score: row.row.score,
            composite_score: row.composite_score,
            validation_score: Some(evidence.composite),
            mechanism_score: Some(mechanism.jaccard),
            pathway_jaccard: Some(mechanism.jaccard),
            reactome_pathway_ids: pathways.into_iter().collect(),
            evidence_count: row.evidence_diversity,
            safety_net: false,
        };
        candidates.push((target, evidence.accept));
    }

    let accepted_count = candidates.iter().filter(|(_, accept)| *accept).count();
    if accepted_count > 0 {
        return candidates
            .into_iter()
            .filter(|(_, accept)| *accept)
            .map(|(t, _)| t)
            .collect();
    }

    // Safety net: zero survivors ⇒ keep the top half by composite score,
    // flagged so downstream reporting can disclose the fallback.
    let mut ordered = candidates;
    ordered.sort_by(|a, b| {
        b.0.composite_score
            .partial_cmp(&a.0.composite_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let keep_n = validation::safety_net_count(ordered.len());
    ordered.truncate(keep_n);
    ordered
        .into_iter()
        .map(|(mut t, _)| {
            t.safety_net = true;
            t
        })
        .collect()
}
