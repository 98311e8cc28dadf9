//! Orchestrator (spec §4.10): the one DAG runner that owns `RouteAState` for
//! the lifetime of a run.
//!
//! `normalize_input -> web_intel -> literature -> kg -> [expand_search?] ->
//! clinical_trials -> patents -> exim -> rank_and_select -> generate_report`.
//! Disease-resolution failure aborts the run (status `Failed`, no partial
//! report); every other stage catches its own errors and substitutes a
//! structured-empty output so one collaborator's failure never crashes the
//! run (spec §7).

use chrono::Datelike;
use uuid::Uuid;

use crate::cache::ContentAddressedCache;
use crate::config::Config;
use crate::error::RepurposeError;
use crate::evidence;
use crate::mre::{self, MreClients};
use crate::model::{
    RankedCandidate, RepurposingCandidate, RunMetadata, RunRequest, ScoreBreakdown, Tier, RouteAState,
};
use crate::resolver::DiseaseResolver;
use crate::scoring::engine::{self, ScoreInputs, Weights};
use crate::scoring::ranker::{self, FeasibilityInputs, NoveltyInputs, RankInput, Strategy};
use crate::scoring::validator::{self, Decision};
use crate::sources::clinical_trials::ClinicalTrialsClient;
use crate::sources::genetics::GeneticsClient;
use crate::sources::graphdb::GraphDbClient;
use crate::sources::literature::LiteratureClient;
use crate::sources::llm::LlmClient;
use crate::sources::opentargets::OpenTargetsClient;
use crate::sources::reactome::ReactomeClient;
use crate::sources::uniprot::UniProtClient;
use crate::sources::web_search::WebSearchClient;
use crate::store::RunStore;
use crate::targets::{self, TargetDiscoveryClients};

/// Re-run threshold and widened parameters for the one-shot `expand_search`
/// branch (spec §4.10): min_phase dropped to 0, top_n raised, target-discovery
/// percentile widened so a thin first pass has more room to surface targets.
const EXPAND_SEARCH_MIN_PHASE: u8 = 0;
const EXPAND_SEARCH_TOP_PERCENT: f64 = 0.25;

/// Owns every collaborator client for one process lifetime; a run borrows
/// them, never owns them, matching the teacher's one-client-per-collaborator
/// convention (spec §9).
pub struct Orchestrator {
    store: RunStore,
    cache: ContentAddressedCache,
    max_candidates: usize,

    resolver: DiseaseResolver,
    opentargets: OpenTargetsClient,
    uniprot: UniProtClient,
    reactome: ReactomeClient,
    genetics: GeneticsClient,
    clinical_trials: ClinicalTrialsClient,
    web_search: WebSearchClient,
    llm: LlmClient,
    literature: LiteratureClient,
    graphdb: Option<GraphDbClient>,
}

impl Orchestrator {
    pub async fn new(config: &Config) -> Result<Self, RepurposeError> {
        crate::sources::rate_limit::set_call_budget(config.max_external_calls_per_run);

        let graphdb = match GraphDbClient::connect(&config.graph_uri, &config.graph_user, &config.graph_password).await {
            Ok(client) => Some(client),
            Err(err) => {
                tracing::warn!(error = %err, "graph database unavailable, target/candidate writes will be skipped");
                None
            }
        };

        Ok(Self {
            store: RunStore::new(config.data_dir.clone()),
            cache: ContentAddressedCache::new(config.cache_dir.clone()),
            max_candidates: config.max_candidates,
            resolver: DiseaseResolver::new()?,
            opentargets: OpenTargetsClient::new()?,
            uniprot: UniProtClient::new()?,
            reactome: ReactomeClient::new()?,
            genetics: GeneticsClient::new()?,
            clinical_trials: ClinicalTrialsClient::new()?,
            web_search: WebSearchClient::new()?,
            llm: LlmClient::new()?,
            literature: LiteratureClient::new()?,
            graphdb,
        })
    }

    pub fn store(&self) -> &RunStore {
        &self.store
    }

    /// Creates the run's durable record and kicks off the DAG. Returns the
    /// `run_id` immediately after `metadata.json` is persisted; the caller
    /// (the `run` CLI command) then awaits `drive` to completion.
    pub async fn start(&self, request: RunRequest) -> Result<Uuid, RepurposeError> {
        let metadata = RunMetadata::new(request.indication.clone(), request.geography.clone());
        let run_id = metadata.run_id;
        let state = RouteAState::new(metadata.clone(), request.min_phase, request.oral_only, request.exclude_biologics, request.strict_fto);
        self.store.create_run(&metadata).await?;
        self.store.save_state(run_id, &state).await?;
        Ok(run_id)
    }

    /// Runs every DAG stage to completion against a freshly-created run,
    /// persisting `state.json` after each stage (spec §4.9, §4.10). Disease
    /// resolution failure marks the run `Failed` and returns early; all
    /// other per-stage failures are caught inside the stage helpers and
    /// degrade to structured-empty outputs.
    pub async fn drive(&self, run_id: Uuid) -> Result<(), RepurposeError> {
        let mut state = self.store.load_state(run_id).await?;
        state.metadata.mark_running();
        self.store.update_metadata(&state.metadata).await?;

        match self.run_stages(&mut state).await {
            Ok(()) => {
                let report_path = self.store.save_report(run_id, "md", render_report(&state).as_bytes()).await?;
                state.metadata.mark_succeeded(Some(report_path.display().to_string()));
            }
            Err(err) => {
                tracing::error!(run_id = %run_id, error = %err, "run failed");
                state.metadata.mark_failed(err.to_string());
            }
        }

        self.store.save_state(run_id, &state).await?;
        self.store.update_metadata(&state.metadata).await
    }

    async fn run_stages(&self, state: &mut RouteAState) -> Result<(), RepurposeError> {
        tracing::info!(indication = %state.metadata.indication, "normalize_input");
        let disease = match self.resolver.resolve(&state.metadata.indication).await? {
            Some(disease) => disease,
            None => {
                return Err(RepurposeError::NotFound {
                    entity: "disease".to_string(),
                    id: state.metadata.indication.clone(),
                    suggestion: Some("try a more specific or differently spelled indication".to_string()),
                });
            }
        };
        state.disease = Some(disease);

        tracing::info!("web_intel");
        state.web_intel = Some(
            evidence::web_intel::aggregate(&self.web_search, &self.cache, &state.metadata.indication, &state.metadata.geography).await,
        );

        tracing::info!("literature");
        state.literature = Some(
            evidence::literature::aggregate(&self.literature, &self.llm, &self.cache, &state.metadata.indication).await,
        );

        tracing::info!("kg");
        self.run_kg_stage(state, false).await;

        if state.needs_expand_search() {
            tracing::info!("expand_search");
            state.expand_search_used = true;
            self.run_kg_stage(state, true).await;
        }

        tracing::info!("clinical_trials");
        state.trials = Some(
            evidence::clinical_trials::aggregate(&self.clinical_trials, &self.cache, &state.metadata.indication, &state.candidates).await,
        );

        tracing::info!("patents");
        let current_year = chrono::Utc::now().year();
        state.patents = Some(evidence::patents::aggregate(&self.web_search, &self.cache, &state.candidates, current_year).await);

        tracing::info!("exim");
        state.exim = Some(evidence::exim::aggregate(&self.web_search, &self.cache, &state.candidates).await);

        tracing::info!("rank_and_select");
        state.ranked = self.rank_and_select(state);

        Ok(())
    }

    /// Runs target discovery + the mechanistic engine once. `expand` widens
    /// discovery's min_phase/top_percent and tolerates an empty result
    /// (spec §4.10: `expand_search` "re-runs target discovery ... tolerates
    /// empty results" rather than failing the run a second time).
    async fn run_kg_stage(&self, state: &mut RouteAState, expand: bool) {
        let Some(disease) = state.disease.clone() else { return };
        let Some(efo_id) = disease.efo_id.as_deref() else {
            tracing::warn!("disease has no EFO id, skipping target discovery");
            return;
        };

        let clients = TargetDiscoveryClients {
            opentargets: &self.opentargets,
            uniprot: &self.uniprot,
            reactome: &self.reactome,
            genetics: &self.genetics,
            graphdb: self.graphdb.as_ref(),
        };

        let (min_targets, max_targets, top_percent) = if expand {
            (targets::discovery::DEFAULT_MIN_TARGETS, targets::discovery::DEFAULT_MAX_TARGETS * 2, EXPAND_SEARCH_TOP_PERCENT)
        } else {
            (targets::discovery::DEFAULT_MIN_TARGETS, targets::discovery::DEFAULT_MAX_TARGETS, targets::discovery::DEFAULT_TOP_PERCENT)
        };

        let discovery = match targets::discover_and_validate(&clients, efo_id, min_targets, max_targets, top_percent).await {
            Ok(discovery) => discovery,
            Err(err) => {
                tracing::warn!(error = %err, "target discovery failed, treating as empty");
                return;
            }
        };
        state.targets = discovery.targets;
        state.disease_pathway_ids = discovery.disease_pathway_ids;

        let min_phase = if expand { EXPAND_SEARCH_MIN_PHASE } else { state.min_phase };
        let mre_clients = MreClients { opentargets: &self.opentargets, reactome: &self.reactome };
        let mut candidates = mre::generate_candidates(
            &mre_clients,
            &disease,
            &state.targets,
            &state.disease_pathway_ids,
            min_phase,
            self.max_candidates,
        )
        .await;

        if state.exclude_biologics {
            candidates.retain(|c| !is_biologic_drug_type(&c.drug_type));
        }
        if state.oral_only {
            candidates.retain(|c| !is_biologic_drug_type(&c.drug_type));
        }

        if let Some(graphdb) = &self.graphdb {
            for candidate in &candidates {
                let Some(target) = state.targets.iter().find(|t| t.symbol == candidate.molecular_target) else {
                    continue;
                };
                if let Err(err) = graphdb
                    .merge_candidate(&candidate.drug_id, &candidate.drug_name, &target.ensembl_id, &candidate.proposed_indication)
                    .await
                {
                    tracing::warn!(drug = %candidate.drug_name, error = %err, "failed to write candidate node");
                }
            }
        }

        state.candidates = candidates;
    }

    /// Scores every surviving candidate against the accumulated evidence
    /// streams and produces the final dense-ranked list (spec §4.8).
    fn rank_and_select(&self, state: &RouteAState) -> Vec<RankedCandidate> {
        if state.candidates.is_empty() {
            return Vec::new();
        }
        let weights = Weights::balanced();
        let trials = state.trials.clone().unwrap_or_default();
        let patents = state.patents.clone().unwrap_or_default();
        let exim = state.exim.clone().unwrap_or_default();
        let literature = state.literature.clone().unwrap_or_default();

        let _ = &exim; // supply-chain risk surfaces in the report, not yet in the scoring formula (see DESIGN.md)

        let candidates: Vec<RepurposingCandidate> = state
            .candidates
            .iter()
            .cloned()
            .filter(|c| {
                // spec §4.10: strict_fto converts a HIGH patent-risk signal
                // into exclusion from ranking entirely.
                !state.strict_fto
                    || patents
                        .per_candidate
                        .get(&c.drug_id)
                        .map(|p| p.risk_tier != crate::model::PatentRiskTier::High)
                        .unwrap_or(true)
            })
            .filter(|c| {
                // spec §4.8: the drug-level Evidence Validator's REJECT
                // verdict drops a candidate before it ever reaches scoring;
                // REVIEW is a flag for a human, not an automatic exclusion.
                let has_clinical_evidence = trials.trial_count_for(&c.drug_id) > 0;
                let mechanism_known = c.pathway_overlap_score > 0.0;
                let verdict = validator::validate_drug(c.phase, has_clinical_evidence, mechanism_known, &c.safety_concerns);
                verdict.decision != Decision::Reject
            })
            .collect();

        let inputs: Vec<RankInput> = candidates
            .into_iter()
            .map(|candidate| build_rank_input(candidate, &trials, &patents, &literature, &weights))
            .collect();

        ranker::rank(Strategy::Balanced, inputs)
    }
}

/// `oral_only`/`exclude_biologics` (spec §6 run request) both ultimately mean
/// "no injectable/biologic modality"; `KnownDrugRow::drug_type` doesn't
/// distinguish oral from non-oral small molecules, so both flags resolve to
/// the same biologic-exclusion rule here (see DESIGN.md).
fn is_biologic_drug_type(drug_type: &str) -> bool {
    let lower = drug_type.to_ascii_lowercase();
    ["antibody", "biologic", "protein", "peptide", "enzyme"].iter().any(|k| lower.contains(k))
}

fn derive_safety_flags(candidate: &RepurposingCandidate) -> (bool, bool, bool) {
    let joined = candidate.safety_concerns.join(" ").to_ascii_lowercase();
    let black_box_warning = joined.contains("black box");
    let serious_adverse_events = !candidate.safety_concerns.is_empty();
    let market_withdrawal = joined.contains("withdrawal") || joined.contains("withdrawn");
    (black_box_warning, serious_adverse_events, market_withdrawal)
}

fn build_rank_input(
    candidate: RepurposingCandidate,
    trials: &crate::model::TrialsOutput,
    patents: &crate::model::PatentOutput,
    literature: &crate::model::LiteratureOutput,
    weights: &Weights,
) -> RankInput {
    let has_clinical_evidence = trials.trial_count_for(&candidate.drug_id) > 0;
    let (black_box_warning, serious_adverse_events, market_withdrawal) = derive_safety_flags(&candidate);
    let mechanism_known = candidate.pathway_overlap_score > 0.0;

    let score_inputs = ScoreInputs {
        phase: candidate.phase,
        has_clinical_evidence,
        opentargets_score: candidate.opentargets_score,
        evidence_count: trials.trial_count_for(&candidate.drug_id),
        literature_count: Some(literature.articles.len()),
        pathway_overlap: Some(candidate.pathway_overlap_score),
        mechanism_known,
        druggability: None,
        black_box_warning,
        serious_adverse_events,
        market_withdrawal,
        years_on_market: None,
        repurposing_novelty: Some(candidate.novelty_score),
        has_known_original_indication: !candidate.original_indication.trim().is_empty(),
    };
    let breakdown: ScoreBreakdown = engine::score(weights, &score_inputs);

    let patent_expired = patents
        .per_candidate
        .get(&candidate.drug_id)
        .is_some_and(|p| p.risk_tier == crate::model::PatentRiskTier::Low);
    let novelty_inputs = NoveltyInputs {
        different_therapeutic_area: !candidate.original_indication.trim().is_empty(),
        no_prior_trials_for_disease: !has_clinical_evidence,
        not_in_known_repurposing_set: true,
        unexpected_mechanism: candidate.pathway_overlap_score < 0.15,
        years_on_market: None,
    };
    let feasibility_inputs = FeasibilityInputs {
        phase: candidate.phase,
        oral: candidate.drug_type.eq_ignore_ascii_case("small molecule"),
        safety_score: breakdown.safety_score,
        patent_expired,
        dosing_known: candidate.phase >= 2,
    };

    RankInput { candidate, breakdown, novelty_inputs, feasibility_inputs, has_clinical_evidence }
}

/// Stub Markdown renderer (spec §4.12): a real templated report layout is
/// explicitly out of scope, this just makes the run's outcome inspectable.
fn render_report(state: &RouteAState) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Repurposing Report: {}\n\n", state.metadata.indication));
    out.push_str(&format!("Geography: {}\n\n", state.metadata.geography));
    if let Some(disease) = &state.disease {
        out.push_str(&format!(
            "Resolved disease: {} ({})\n\n",
            disease.canonical_label,
            disease.therapeutic_area.as_str()
        ));
    }
    out.push_str(&format!("Targets discovered: {}\n", state.targets.len()));
    out.push_str(&format!("Candidates generated: {}\n\n", state.candidates.len()));

    out.push_str("## Ranked Candidates\n\n");
    out.push_str("| Rank | Drug | Tier | Final Score | Recommendation |\n");
    out.push_str("|------|------|------|-------------|-----------------|\n");
    for ranked in &state.ranked {
        out.push_str(&format!(
            "| {} | {} | {} | {:.1} | {} |\n",
            ranked.rank,
            ranked.candidate.drug_name,
            tier_label(ranked.tier),
            ranked.final_score,
            ranked.recommendation
        ));
    }
    out
}

fn tier_label(tier: Tier) -> &'static str {
    match tier {
        Tier::HighPriority => "High Priority",
        Tier::MediumPriority => "Medium Priority",
        Tier::LowPriority => "Low Priority",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Feasibility, RunMetadata};

    fn sample_candidate(drug_id: &str, drug_type: &str, phase: u8) -> RepurposingCandidate {
        RepurposingCandidate::new(
            drug_id.to_string(),
            format!("{drug_id}-name"),
            phase,
            drug_type.to_string(),
            "BRAF".to_string(),
            "rheumatoid arthritis".to_string(),
            "melanoma".to_string(),
            "kinase inhibition".to_string(),
            0.7,
            0.4,
            vec!["R-HSA-1".to_string()],
            0.6,
            phase,
            vec![],
            vec![],
            vec![],
            vec!["monitor liver enzymes".to_string()],
            vec![],
            vec![],
            0.5,
            Feasibility::Medium,
        )
        .unwrap()
    }

    #[test]
    fn is_biologic_drug_type_matches_known_modalities() {
        assert!(is_biologic_drug_type("Monoclonal Antibody"));
        assert!(is_biologic_drug_type("therapeutic peptide"));
        assert!(!is_biologic_drug_type("small molecule"));
    }

    #[test]
    fn derive_safety_flags_reads_free_text_concerns() {
        let mut candidate = sample_candidate("CHEMBL1", "small molecule", 3);
        candidate.safety_concerns = vec!["black box warning for hepatotoxicity".to_string()];
        let (black_box, serious, withdrawn) = derive_safety_flags(&candidate);
        assert!(black_box);
        assert!(serious);
        assert!(!withdrawn);
    }

    #[test]
    fn derive_safety_flags_false_when_no_concerns_listed() {
        let mut candidate = sample_candidate("CHEMBL2", "small molecule", 3);
        candidate.safety_concerns = vec![];
        let (black_box, serious, withdrawn) = derive_safety_flags(&candidate);
        assert!(!black_box);
        assert!(!serious);
        assert!(!withdrawn);
    }

    #[test]
    fn build_rank_input_carries_candidate_through_to_score_breakdown() {
        let candidate = sample_candidate("CHEMBL3", "small molecule", 4);
        let trials = crate::model::TrialsOutput::default();
        let patents = crate::model::PatentOutput::default();
        let literature = crate::model::LiteratureOutput::default();
        let weights = Weights::balanced();
        let input = build_rank_input(candidate, &trials, &patents, &literature, &weights);
        assert_eq!(input.candidate.drug_id, "CHEMBL3");
        assert!(input.breakdown.composite_score >= 0.0);
    }

    #[test]
    fn tier_label_covers_every_tier() {
        assert_eq!(tier_label(Tier::HighPriority), "High Priority");
        assert_eq!(tier_label(Tier::MediumPriority), "Medium Priority");
        assert_eq!(tier_label(Tier::LowPriority), "Low Priority");
    }

    #[test]
    fn render_report_lists_ranked_candidates_in_rank_order() {
        let metadata = RunMetadata::new("melanoma".into(), "US".into());
        let mut state = RouteAState::new(metadata, 1, false, false, false);
        let candidate = sample_candidate("CHEMBL4", "small molecule", 4);
        state.ranked = vec![RankedCandidate {
            candidate,
            rank: 1,
            composite_score: 70.0,
            novelty_score: 60.0,
            feasibility_score: 65.0,
            final_score: 72.5,
            tier: Tier::HighPriority,
            recommendation: "advance to validation".to_string(),
        }];
        let report = render_report(&state);
        assert!(report.contains("melanoma"));
        assert!(report.contains("CHEMBL4-name"));
        assert!(report.contains("High Priority"));
    }
}

