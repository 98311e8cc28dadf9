//! Disease identity (spec §3 `DiseaseContext`, §4.4 therapeutic-area tags).

use serde::{Deserialize, Serialize};

/// Closed tag set from spec §4.4. `Unknown` is the explicit fallback, not a
/// missing value — every disease gets *some* tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TherapeuticArea {
    Oncology,
    Immunological,
    Neurological,
    Cardiovascular,
    Metabolic,
    Infectious,
    Respiratory,
    Gastrointestinal,
    Dermatological,
    RareDiseases,
    Hematological,
    Urological,
    Musculoskeletal,
    Ophthalmology,
    Psychiatric,
    Endocrinology,
    RenalNephrology,
    Hepatology,
    WomenHealthObgyn,
    Pediatrics,
    Geriatrics,
    PainPalliative,
    Allergy,
    AddictionSubstanceUse,
    TransplantationImmunosuppression,
    DentalOralHealth,
    OncologySupportiveCare,
    ToxicologyOverdose,
    Unknown,
}

impl TherapeuticArea {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Oncology => "oncology",
            Self::Immunological => "immunological",
            Self::Neurological => "neurological",
            Self::Cardiovascular => "cardiovascular",
            Self::Metabolic => "metabolic",
            Self::Infectious => "infectious",
            Self::Respiratory => "respiratory",
            Self::Gastrointestinal => "gastrointestinal",
            Self::Dermatological => "dermatological",
            Self::RareDiseases => "rare_diseases",
            Self::Hematological => "hematological",
            Self::Urological => "urological",
            Self::Musculoskeletal => "musculoskeletal",
            Self::Ophthalmology => "ophthalmology",
            Self::Psychiatric => "psychiatric",
            Self::Endocrinology => "endocrinology",
            Self::RenalNephrology => "renal_nephrology",
            Self::Hepatology => "hepatology",
            Self::WomenHealthObgyn => "women_health_obgyn",
            Self::Pediatrics => "pediatrics",
            Self::Geriatrics => "geriatrics",
            Self::PainPalliative => "pain_palliative",
            Self::Allergy => "allergy",
            Self::AddictionSubstanceUse => "addiction_substance_use",
            Self::TransplantationImmunosuppression => "transplantation_immunosuppression",
            Self::DentalOralHealth => "dental_oral_health",
            Self::OncologySupportiveCare => "oncology_supportive_care",
            Self::ToxicologyOverdose => "toxicology_overdose",
            Self::Unknown => "unknown",
        }
    }
}

/// Resolved disease identity, produced once by the Disease Resolver and
/// immutable thereafter (spec §3). At least one ontology ID must be present
/// on a successfully resolved context — enforced in `new`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiseaseContext {
    pub canonical_label: String,
    pub efo_id: Option<String>,
    pub mondo_id: Option<String>,
    pub mesh_id: Option<String>,
    pub therapeutic_area: TherapeuticArea,
    pub is_cancer: bool,
    pub is_autoimmune: bool,
    pub is_infectious: bool,
    pub is_rare: bool,
    pub is_genetic: bool,
    pub synonyms: Vec<String>,
    pub parent_terms: Vec<String>,
    pub confidence: f64,
    pub ontology_match_score: f64,
}

impl DiseaseContext {
    /// Fails (returns `None`) when none of EFO/MONDO/MeSH is present,
    /// enforcing the spec §3 invariant at construction.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        canonical_label: String,
        efo_id: Option<String>,
        mondo_id: Option<String>,
        mesh_id: Option<String>,
        therapeutic_area: TherapeuticArea,
        flags: DiseaseFlags,
        synonyms: Vec<String>,
        parent_terms: Vec<String>,
        confidence: f64,
        ontology_match_score: f64,
    ) -> Option<Self> {
        if efo_id.is_none() && mondo_id.is_none() && mesh_id.is_none() {
            return None;
        }
        Some(Self {
            canonical_label,
            efo_id,
            mondo_id,
            mesh_id,
            therapeutic_area,
            is_cancer: flags.is_cancer,
            is_autoimmune: flags.is_autoimmune,
            is_infectious: flags.is_infectious,
            is_rare: flags.is_rare,
            is_genetic: flags.is_genetic,
            synonyms,
            parent_terms,
            confidence,
            ontology_match_score,
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DiseaseFlags {
    pub is_cancer: bool,
    pub is_autoimmune: bool,
    pub is_infectious: bool,
    pub is_rare: bool,
    pub is_genetic: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_disease_with_no_ontology_id() {
        let ctx = DiseaseContext::new(
            "Mystery disease".into(),
            None,
            None,
            None,
            TherapeuticArea::Unknown,
            DiseaseFlags::default(),
            vec![],
            vec![],
            1.0,
            0.0,
        );
        assert!(ctx.is_none());
    }

    #[test]
    fn new_accepts_disease_with_only_mesh_id() {
        let ctx = DiseaseContext::new(
            "Some disease".into(),
            None,
            None,
            Some("D000001".into()),
            TherapeuticArea::Unknown,
            DiseaseFlags::default(),
            vec![],
            vec![],
            1.0,
            0.5,
        );
        assert!(ctx.is_some());
    }
}
