//! Repurposing filter (spec §4.6 step 3, §9 open question #4): drop a known
//! drug whose original indication is the query disease itself, with
//! synonym awareness layered on top of the literal substring/token rule in
//! `model::candidate::indication_overlaps`.

use crate::model::{candidate::indication_overlaps, DiseaseContext};

/// `true` when the drug should be kept as a repurposing candidate. A drug
/// with no recorded original indication is always kept (spec §4.6 step 3:
/// "potential repurposing").
pub fn passes_repurposing_filter(original_indication: &str, disease: &DiseaseContext) -> bool {
    if original_indication.trim().is_empty() {
        return true;
    }
    if indication_overlaps(original_indication, &disease.canonical_label) {
        return false;
    }
    !disease
        .synonyms
        .iter()
        .any(|synonym| indication_overlaps(original_indication, synonym))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DiseaseFlags, TherapeuticArea};

    fn disease(label: &str, synonyms: Vec<&str>) -> DiseaseContext {
        DiseaseContext::new(
            label.to_string(),
            Some("EFO_0000001".to_string()),
            None,
            None,
            TherapeuticArea::Oncology,
            DiseaseFlags::default(),
            synonyms.into_iter().map(str::to_string).collect(),
            vec![],
            1.0,
            1.0,
        )
        .unwrap()
    }

    #[test]
    fn drug_with_no_indication_always_passes() {
        let d = disease("lung cancer", vec![]);
        assert!(passes_repurposing_filter("", &d));
    }

    #[test]
    fn drug_matching_canonical_label_is_dropped() {
        let d = disease("melanoma", vec![]);
        assert!(!passes_repurposing_filter("metastatic melanoma", &d));
    }

    #[test]
    fn drug_matching_only_a_synonym_is_dropped() {
        let d = disease("lung cancer", vec!["small cell lung cancer"]);
        assert!(!passes_repurposing_filter("small cell lung cancer", &d));
    }

    #[test]
    fn unrelated_indication_passes() {
        let d = disease("melanoma", vec!["malignant melanoma"]);
        assert!(passes_repurposing_filter("rheumatoid arthritis", &d));
    }
}
