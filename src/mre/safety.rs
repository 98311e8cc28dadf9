//! Safety assessment (spec §4.6 step 6): phase- and context-derived
//! concerns, contraindications, and PK considerations.

use crate::model::{DiseaseContext, TherapeuticArea};

#[derive(Debug, Clone, Default)]
pub struct SafetyAssessment {
    pub concerns: Vec<String>,
    pub contraindications: Vec<String>,
    pub pk_considerations: Vec<String>,
}

/// `original_area` is the therapeutic area the drug was originally
/// indicated for (used to flag an additive-cardiotoxicity warning when
/// repurposing a cardiovascular-area drug into an oncology context).
pub fn assess(
    phase: u8,
    drug_type: &str,
    disease: &DiseaseContext,
    original_area: TherapeuticArea,
) -> SafetyAssessment {
    let mut out = SafetyAssessment::default();

    if phase < 2 {
        out.concerns.push("Limited human safety data at this clinical phase.".to_string());
    }
    if phase == 4 {
        out.pk_considerations
            .push("Approved PK profile; dose may need adjustment for the new indication.".to_string());
    }
    if disease.is_cancer && original_area == TherapeuticArea::Cardiovascular {
        out.concerns
            .push("Additive cardiotoxicity risk: repurposing a cardiovascular-area drug into an oncology context.".to_string());
    }
    if disease.is_infectious && is_immunosuppressant(drug_type) {
        out.contraindications
            .push("Immunosuppression may worsen an active infection.".to_string());
    }
    if is_biologic(drug_type) {
        out.concerns.push("Immunogenicity risk typical of biologic therapeutics.".to_string());
    } else {
        out.pk_considerations
            .push("Small molecule: existing oral/formulation data may be directly reusable.".to_string());
    }

    out
}

fn is_biologic(drug_type: &str) -> bool {
    let normalized = drug_type.to_ascii_lowercase();
    ["antibody", "protein", "biologic", "enzyme", "peptide"]
        .iter()
        .any(|k| normalized.contains(k))
}

fn is_immunosuppressant(drug_type: &str) -> bool {
    drug_type.to_ascii_lowercase().contains("immunosuppress")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DiseaseFlags;

    fn disease(flags: DiseaseFlags) -> DiseaseContext {
        DiseaseContext::new(
            "test disease".into(),
            Some("EFO_1".into()),
            None,
            None,
            TherapeuticArea::Oncology,
            flags,
            vec![],
            vec![],
            1.0,
            1.0,
        )
        .unwrap()
    }

    #[test]
    fn phase_four_small_molecule_gets_pk_and_reuse_notes() {
        let flags = DiseaseFlags::default();
        let assessment = assess(4, "small molecule", &disease(flags), TherapeuticArea::Metabolic);
        assert!(assessment.pk_considerations.iter().any(|s| s.contains("Approved PK profile")));
        assert!(assessment.pk_considerations.iter().any(|s| s.contains("reusable")));
        assert!(assessment.concerns.is_empty());
    }

    #[test]
    fn cancer_context_with_cardiovascular_origin_flags_cardiotoxicity() {
        let flags = DiseaseFlags { is_cancer: true, ..Default::default() };
        let assessment = assess(3, "small molecule", &disease(flags), TherapeuticArea::Cardiovascular);
        assert!(assessment.concerns.iter().any(|s| s.contains("cardiotoxicity")));
    }

    #[test]
    fn infectious_context_with_immunosuppressant_is_contraindicated() {
        let flags = DiseaseFlags { is_infectious: true, ..Default::default() };
        let assessment = assess(3, "immunosuppressant", &disease(flags), TherapeuticArea::Immunological);
        assert!(!assessment.contraindications.is_empty());
    }

    #[test]
    fn biologic_drug_gets_immunogenicity_note() {
        let assessment = assess(3, "monoclonal antibody", &disease(DiseaseFlags::default()), TherapeuticArea::Oncology);
        assert!(assessment.concerns.iter().any(|s| s.contains("Immunogenicity")));
    }
}
