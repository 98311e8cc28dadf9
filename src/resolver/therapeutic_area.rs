//! Therapeutic-Area Mapper (spec §4.4). First non-empty rule wins: MeSH
//! tree prefix table, then ontology ancestor IRI membership, then keyword
//! count. Grounded on the teacher's `entities/pathway.rs` match-table idiom
//! (ordered candidate list, first satisfied wins).

use crate::model::TherapeuticArea;

/// MeSH tree top-level prefix → area, in priority order so that a
/// multi-prefix descriptor resolves to the higher-priority tag first (spec
/// §9 open question: "oncology outranks most; hematological outranks
/// metabolic; infectious outranks immunological").
const MESH_TREE_PRIORITY: &[(&str, TherapeuticArea)] = &[
    ("C04", TherapeuticArea::Oncology),
    ("C15", TherapeuticArea::Hematological),
    ("C01", TherapeuticArea::Infectious),
    ("C02", TherapeuticArea::Infectious),
    ("C20", TherapeuticArea::Immunological),
    ("C10", TherapeuticArea::Neurological),
    ("C14", TherapeuticArea::Cardiovascular),
    ("C18", TherapeuticArea::Metabolic),
    ("C08", TherapeuticArea::Respiratory),
    ("C06", TherapeuticArea::Gastrointestinal),
    ("C17", TherapeuticArea::Dermatological),
    ("C16", TherapeuticArea::RareDiseases),
    ("C12", TherapeuticArea::Urological),
    ("C13", TherapeuticArea::WomenHealthObgyn),
    ("C05", TherapeuticArea::Musculoskeletal),
    ("C11", TherapeuticArea::Ophthalmology),
    ("F03", TherapeuticArea::Psychiatric),
    ("C19", TherapeuticArea::Endocrinology),
    ("C07", TherapeuticArea::DentalOralHealth),
];

/// Ontology ancestor IRIs (fragment match, case-insensitive) that settle
/// classification when no MeSH tree match exists.
const ONTOLOGY_ANCESTOR_KEYWORDS: &[(&str, TherapeuticArea)] = &[
    ("neoplasm", TherapeuticArea::Oncology),
    ("cancer", TherapeuticArea::Oncology),
    ("immune_system_disease", TherapeuticArea::Immunological),
    ("nervous_system_disease", TherapeuticArea::Neurological),
    ("cardiovascular_disease", TherapeuticArea::Cardiovascular),
    ("metabolic_disease", TherapeuticArea::Metabolic),
    ("infectious_disease", TherapeuticArea::Infectious),
    ("respiratory_system_disease", TherapeuticArea::Respiratory),
    ("gastrointestinal_disease", TherapeuticArea::Gastrointestinal),
    ("skin_disease", TherapeuticArea::Dermatological),
    ("rare_genetic_disease", TherapeuticArea::RareDiseases),
    ("hematologic_disease", TherapeuticArea::Hematological),
    ("urinary_system_disease", TherapeuticArea::Urological),
    ("musculoskeletal_disease", TherapeuticArea::Musculoskeletal),
    ("eye_disease", TherapeuticArea::Ophthalmology),
    ("mental_health", TherapeuticArea::Psychiatric),
    ("endocrine_system_disease", TherapeuticArea::Endocrinology),
    ("kidney_disease", TherapeuticArea::RenalNephrology),
    ("liver_disease", TherapeuticArea::Hepatology),
    ("reproductive_system_disease", TherapeuticArea::WomenHealthObgyn),
];

/// Keyword fallback: normalized-name substring match, highest count wins.
const KEYWORD_TABLE: &[(TherapeuticArea, &[&str])] = &[
    (TherapeuticArea::Oncology, &["cancer", "carcinoma", "tumor", "tumour", "neoplasm", "leukemia", "lymphoma", "melanoma", "sarcoma"]),
    (TherapeuticArea::Immunological, &["autoimmune", "lupus", "arthritis", "psoriasis", "immune"]),
    (TherapeuticArea::Neurological, &["alzheimer", "parkinson", "epilepsy", "neuro", "dementia", "stroke", "multiple sclerosis"]),
    (TherapeuticArea::Cardiovascular, &["cardiac", "heart", "cardio", "atherosclerosis", "hypertension"]),
    (TherapeuticArea::Metabolic, &["diabetes", "obesity", "metabolic", "dyslipidemia"]),
    (TherapeuticArea::Infectious, &["infection", "viral", "bacterial", "sepsis", "tuberculosis", "hiv", "malaria"]),
    (TherapeuticArea::Respiratory, &["asthma", "copd", "pulmonary", "respiratory"]),
    (TherapeuticArea::Gastrointestinal, &["crohn", "colitis", "ibs", "gastro", "hepatic"]),
    (TherapeuticArea::Dermatological, &["eczema", "dermatitis", "psoriasis", "skin"]),
    (TherapeuticArea::RareDiseases, &["rare disease", "orphan"]),
    (TherapeuticArea::Hematological, &["anemia", "hemophilia", "thrombocytopenia", "sickle cell"]),
    (TherapeuticArea::Urological, &["bladder", "urinary", "prostate"]),
    (TherapeuticArea::Musculoskeletal, &["osteoporosis", "osteoarthritis", "muscular dystrophy"]),
    (TherapeuticArea::Ophthalmology, &["macular degeneration", "glaucoma", "retinopathy"]),
    (TherapeuticArea::Psychiatric, &["depression", "schizophrenia", "bipolar", "anxiety"]),
    (TherapeuticArea::Endocrinology, &["thyroid", "hormone", "endocrine"]),
    (TherapeuticArea::RenalNephrology, &["renal", "kidney", "nephropathy"]),
    (TherapeuticArea::Hepatology, &["liver", "hepatitis", "cirrhosis"]),
    (TherapeuticArea::WomenHealthObgyn, &["pregnancy", "endometriosis", "ovarian"]),
    (TherapeuticArea::Pediatrics, &["pediatric", "childhood"]),
    (TherapeuticArea::Geriatrics, &["geriatric", "frailty"]),
    (TherapeuticArea::PainPalliative, &["chronic pain", "palliative"]),
    (TherapeuticArea::Allergy, &["allergy", "allergic"]),
    (TherapeuticArea::AddictionSubstanceUse, &["addiction", "substance use", "opioid use disorder"]),
    (TherapeuticArea::TransplantationImmunosuppression, &["transplant", "graft"]),
    (TherapeuticArea::DentalOralHealth, &["dental", "periodontal"]),
    (TherapeuticArea::OncologySupportiveCare, &["chemotherapy-induced", "cancer-related fatigue"]),
    (TherapeuticArea::ToxicologyOverdose, &["overdose", "poisoning", "toxicity"]),
];

pub fn classify(
    mesh_tree_numbers: &[String],
    ontology_parent_terms: &[String],
    disease_name: &str,
) -> TherapeuticArea {
    if let Some(area) = classify_by_mesh_tree(mesh_tree_numbers) {
        return area;
    }
    if let Some(area) = classify_by_ontology_ancestors(ontology_parent_terms) {
        return area;
    }
    classify_by_keywords(disease_name)
}

fn classify_by_mesh_tree(tree_numbers: &[String]) -> Option<TherapeuticArea> {
    for (prefix, area) in MESH_TREE_PRIORITY {
        if tree_numbers.iter().any(|t| t.starts_with(prefix)) {
            return Some(*area);
        }
    }
    None
}

fn classify_by_ontology_ancestors(parent_terms: &[String]) -> Option<TherapeuticArea> {
    let normalized: Vec<String> = parent_terms
        .iter()
        .map(|t| t.to_ascii_lowercase().replace(' ', "_"))
        .collect();
    for (keyword, area) in ONTOLOGY_ANCESTOR_KEYWORDS {
        if normalized.iter().any(|t| t.contains(keyword)) {
            return Some(*area);
        }
    }
    None
}

fn classify_by_keywords(disease_name: &str) -> TherapeuticArea {
    let normalized = disease_name.to_ascii_lowercase();
    let mut best: Option<(TherapeuticArea, usize)> = None;
    for (area, keywords) in KEYWORD_TABLE {
        let count = keywords.iter().filter(|k| normalized.contains(*k)).count();
        if count == 0 {
            continue;
        }
        if best.map(|(_, best_count)| count > best_count).unwrap_or(true) {
            best = Some((*area, count));
        }
    }
    best.map(|(area, _)| area).unwrap_or(TherapeuticArea::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mesh_tree_oncology_outranks_generic_keyword_match() {
        let area = classify(&["C04.557".to_string()], &[], "rare blood cancer");
        assert_eq!(area, TherapeuticArea::Oncology);
    }

    #[test]
    fn hematological_outranks_metabolic_on_mesh_collision() {
        let area = classify(&["C15.378".to_string(), "C18.452".to_string()], &[], "");
        assert_eq!(area, TherapeuticArea::Hematological);
    }

    #[test]
    fn falls_back_to_keyword_when_no_mesh_or_ontology_hit() {
        assert_eq!(classify(&[], &[], "type 2 diabetes"), TherapeuticArea::Metabolic);
    }

    #[test]
    fn unknown_when_nothing_matches() {
        assert_eq!(classify(&[], &[], "xyzzy syndrome"), TherapeuticArea::Unknown);
    }
}
