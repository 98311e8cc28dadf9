//! `RouteAState` (spec §3): the single typed snapshot owned exclusively by
//! the Orchestrator for the lifetime of a run. Agent nodes receive read-only
//! views and return a patch the Orchestrator applies into the one write
//! slot per field (spec §4.10) — there is no shared mutable access.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::candidate::{RankedCandidate, RepurposingCandidate};
use super::disease::DiseaseContext;
use super::evidence::{EximOutput, LiteratureOutput, PatentOutput, TrialsOutput, WebIntelOutput};
use super::run::RunMetadata;
use super::target::Target;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteAState {
    pub metadata: RunMetadata,
    pub min_phase: u8,
    pub oral_only: bool,
    pub exclude_biologics: bool,
    pub strict_fto: bool,

    pub disease: Option<DiseaseContext>,
    pub targets: Vec<Target>,
    pub disease_pathway_ids: BTreeSet<String>,

    pub candidates: Vec<RepurposingCandidate>,
    pub ranked: Vec<RankedCandidate>,

    pub web_intel: Option<WebIntelOutput>,
    pub literature: Option<LiteratureOutput>,
    pub trials: Option<TrialsOutput>,
    pub patents: Option<PatentOutput>,
    pub exim: Option<EximOutput>,

    /// Set once `expand_search` has run (spec §4.10: at most once per run).
    pub expand_search_used: bool,
}

impl RouteAState {
    pub fn new(metadata: RunMetadata, min_phase: u8, oral_only: bool, exclude_biologics: bool, strict_fto: bool) -> Self {
        Self {
            metadata,
            min_phase,
            oral_only,
            exclude_biologics,
            strict_fto,
            disease: None,
            targets: Vec::new(),
            disease_pathway_ids: BTreeSet::new(),
            candidates: Vec::new(),
            ranked: Vec::new(),
            web_intel: None,
            literature: None,
            trials: None,
            patents: None,
            exim: None,
            expand_search_used: false,
        }
    }

    /// spec §4.10: after the knowledge-graph stage, fewer than 3 surviving
    /// candidates triggers `expand_search` exactly once.
    pub fn needs_expand_search(&self) -> bool {
        !self.expand_search_used && self.candidates.len() < 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> RouteAState {
        RouteAState::new(
            RunMetadata::new("melanoma".into(), "US".into()),
            1,
            false,
            false,
            false,
        )
    }

    #[test]
    fn needs_expand_search_fires_once_under_three_candidates() {
        let mut state = fresh();
        assert!(state.needs_expand_search());
        state.expand_search_used = true;
        assert!(!state.needs_expand_search());
    }

    #[test]
    fn needs_expand_search_false_once_three_or_more_candidates() {
        let mut state = fresh();
        for i in 0..3 {
            state.candidates.push(
                RepurposingCandidate::new(
                    format!("CHEMBL{i}"),
                    "Drug".into(),
                    4,
                    "small molecule".into(),
                    "BRAF".into(),
                    String::new(),
                    "melanoma".into(),
                    "kinase inhibition".into(),
                    0.5,
                    0.5,
                    vec![],
                    0.5,
                    4,
                    vec![],
                    vec![],
                    vec![],
                    vec![],
                    vec![],
                    vec![],
                    50.0,
                    super::super::candidate::Feasibility::Medium,
                )
                .unwrap(),
            );
        }
        assert!(!state.needs_expand_search());
    }
}
