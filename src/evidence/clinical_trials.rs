//! Clinical trials aggregator (spec §4.7): one registry query per disease,
//! per-candidate hits detected by substring match against title/interventions.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::cache::ContentAddressedCache;
use crate::model::{RepurposingCandidate, TrialHit, TrialsOutput};
use crate::sources::clinical_trials::{ClinicalTrialsClient, CtGovSearchParams, CtGovStudy};

const CACHE_ENDPOINT: &str = "clinical_trials.search";
const ACTIVE_STATUSES: &str = "RECRUITING,ACTIVE_NOT_RECRUITING,ENROLLING_BY_INVITATION";
const HIGH_COMPETITION_THRESHOLD: usize = 50;
const TOP_SPONSOR_COUNT: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NormalizedTrial {
    nct_id: String,
    phase: Option<u8>,
    status: String,
    lead_sponsor: Option<String>,
    title: String,
    intervention_names: Vec<String>,
}

fn phase_digit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d)").expect("valid regex"))
}

fn normalize_phase(phases: &Option<Vec<String>>) -> Option<u8> {
    phases
        .as_ref()?
        .iter()
        .filter_map(|p| phase_digit_re().captures(p))
        .filter_map(|c| c.get(1)?.as_str().parse::<u8>().ok())
        .max()
        .map(|p| p.clamp(0, 4))
}

fn normalize_study(study: &CtGovStudy) -> Option<NormalizedTrial> {
    let protocol = study.protocol_section.as_ref()?;
    let nct_id = protocol.identification_module.as_ref()?.nct_id.clone()?;
    let title = protocol
        .identification_module
        .as_ref()
        .and_then(|m| m.brief_title.clone())
        .unwrap_or_default();
    let status = protocol
        .status_module
        .as_ref()
        .and_then(|m| m.overall_status.clone())
        .unwrap_or_else(|| "UNKNOWN".to_string());
    let lead_sponsor = protocol
        .sponsor_collaborators_module
        .as_ref()
        .and_then(|m| m.lead_sponsor.as_ref())
        .and_then(|s| s.name.clone());
    let phase = protocol.design_module.as_ref().and_then(|m| normalize_phase(&m.phases));
    let intervention_names = protocol
        .arms_interventions_module
        .as_ref()
        .map(|m| m.interventions.iter().filter_map(|i| i.name.clone()).collect())
        .unwrap_or_default();

    Some(NormalizedTrial { nct_id, phase, status, lead_sponsor, title, intervention_names })
}

async fn fetch_trials(
    client: &ClinicalTrialsClient,
    cache: &ContentAddressedCache,
    disease_label: &str,
) -> Vec<NormalizedTrial> {
    let params_json = json!({ "condition": disease_label, "status": ACTIVE_STATUSES });
    if let Some(cached) = cache.get(CACHE_ENDPOINT, &params_json).await {
        if let Ok(trials) = serde_json::from_value::<Vec<NormalizedTrial>>(cached) {
            return trials;
        }
    }

    let params = CtGovSearchParams {
        condition: Some(disease_label.to_string()),
        intervention: None,
        facility: None,
        status: Some(ACTIVE_STATUSES.to_string()),
        agg_filters: None,
        query_term: None,
        count_total: true,
        page_token: None,
        page_size: 100,
        lat: None,
        lon: None,
        distance_miles: None,
    };

    let trials = match client.search(&params).await {
        Ok(response) => response.studies.iter().filter_map(normalize_study).collect(),
        Err(err) => {
            tracing::warn!(error = %err, "clinical trials search failed, returning empty result");
            Vec::new()
        }
    };

    if let Ok(value) = serde_json::to_value(&trials) {
        cache.put(CACHE_ENDPOINT, &params_json, value).await;
    }
    trials
}

pub async fn aggregate(
    client: &ClinicalTrialsClient,
    cache: &ContentAddressedCache,
    disease_label: &str,
    candidates: &[RepurposingCandidate],
) -> TrialsOutput {
    let trials = fetch_trials(client, cache, disease_label).await;

    let mut phase_breakdown: BTreeMap<u8, usize> = BTreeMap::new();
    let mut sponsor_counts: BTreeMap<String, usize> = BTreeMap::new();
    for trial in &trials {
        *phase_breakdown.entry(trial.phase.unwrap_or(0)).or_insert(0) += 1;
        if let Some(sponsor) = &trial.lead_sponsor {
            *sponsor_counts.entry(sponsor.clone()).or_insert(0) += 1;
        }
    }

    let mut sponsors: Vec<(String, usize)> = sponsor_counts.into_iter().collect();
    sponsors.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let top_sponsors = sponsors.into_iter().take(TOP_SPONSOR_COUNT).map(|(name, _)| name).collect();

    let mut per_candidate: BTreeMap<String, Vec<TrialHit>> = BTreeMap::new();
    for candidate in candidates {
        let name = candidate.drug_name.to_ascii_lowercase();
        if name.trim().is_empty() {
            continue;
        }
        let hits: Vec<TrialHit> = trials
            .iter()
            .filter(|t| {
                t.title.to_ascii_lowercase().contains(&name)
                    || t.intervention_names.iter().any(|i| i.to_ascii_lowercase().contains(&name))
            })
            .map(|t| TrialHit {
                nct_id: t.nct_id.clone(),
                phase: t.phase,
                status: t.status.clone(),
                lead_sponsor: t.lead_sponsor.clone(),
                title: t.title.clone(),
            })
            .collect();
        if !hits.is_empty() {
            per_candidate.insert(candidate.drug_id.clone(), hits);
        }
    }

    TrialsOutput {
        total_trials: trials.len(),
        phase_breakdown,
        top_sponsors,
        high_competition: trials.len() > HIGH_COMPETITION_THRESHOLD,
        per_candidate,
        citations: trials.iter().map(|t| t.nct_id.clone()).collect(),
    }
}
