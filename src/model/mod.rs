//! Typed domain model shared by every pipeline stage (spec §3).

pub mod candidate;
pub mod disease;
pub mod evidence;
pub mod run;
pub mod state;
pub mod target;

pub use candidate::{Feasibility, RankedCandidate, RepurposingCandidate, ScoreBreakdown, Tier};
pub use disease::{DiseaseContext, DiseaseFlags, TherapeuticArea};
pub use evidence::{
    EximAssessment, EximOutput, LiteratureArticle, LiteratureOutput, LiteratureTier,
    PatentAssessment, PatentOutput, PatentRiskTier, SupplySignal, TrialHit, TrialsOutput,
    WebIntelOutput,
};
pub use run::{RunMetadata, RunRequest, RunStatus};
pub use state::RouteAState;
pub use target::Target;
