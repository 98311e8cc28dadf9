//! Evidence containers with explicit provenance (spec §3). Each aggregator
//! in `evidence::*` produces one of these; every candidate's evidence
//! references cross these by `drug_id`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialHit {
    pub nct_id: String,
    pub phase: Option<u8>,
    pub status: String,
    pub lead_sponsor: Option<String>,
    pub title: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrialsOutput {
    pub total_trials: usize,
    /// Phase -> count, keyed by integer phase for deterministic ordering.
    pub phase_breakdown: BTreeMap<u8, usize>,
    pub top_sponsors: Vec<String>,
    pub high_competition: bool,
    pub per_candidate: BTreeMap<String, Vec<TrialHit>>,
    pub citations: Vec<String>,
}

impl TrialsOutput {
    pub fn trial_count_for(&self, drug_id: &str) -> usize {
        self.per_candidate.get(drug_id).map(Vec::len).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PatentRiskTier {
    Low,
    Medium,
    High,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatentAssessment {
    pub risk_tier: PatentRiskTier,
    pub citations: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatentOutput {
    pub per_candidate: BTreeMap<String, PatentAssessment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SupplySignal {
    Strong,
    Moderate,
    Weak,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EximAssessment {
    pub signal: SupplySignal,
    pub manufacturing_countries: Vec<String>,
    pub citations: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EximOutput {
    pub per_candidate: BTreeMap<String, EximAssessment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiteratureTier {
    MetaAnalysis,
    RecentReview,
    Mechanism,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiteratureArticle {
    pub pmid: String,
    pub title: String,
    pub citation_count: u32,
    pub tier: LiteratureTier,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LiteratureOutput {
    pub articles: Vec<LiteratureArticle>,
    pub pathophysiology_synthesis: Option<String>,
    pub target_symbols: Vec<String>,
    pub citations: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebIntelOutput {
    pub summary: Option<String>,
    pub citations: Vec<String>,
}
