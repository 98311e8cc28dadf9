//! Evidence Validator (spec §4.8): two independent KEEP/REJECT/REVIEW calls,
//! one for targets and one for drugs, each with a transparent confidence and
//! reasoning trail.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Keep,
    Reject,
    Review,
}

#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub decision: Decision,
    pub confidence: f64,
    pub reasoning: Vec<String>,
    pub flags: Vec<String>,
}

pub fn validate_target(
    opentargets_score: f64,
    evidence_count: usize,
    pathway_overlap: Option<f64>,
    literature_count: Option<usize>,
) -> ValidationResult {
    let mut reasoning = Vec::new();
    let mut flags = Vec::new();

    let hard_reject = opentargets_score < 0.2;
    if hard_reject {
        reasoning.push(format!("opentargets_score {opentargets_score:.2} below the 0.2 floor"));
    }
    if evidence_count < 1 {
        flags.push("single_source".to_string());
    }
    if pathway_overlap.is_some_and(|p| p < 0.05) {
        flags.push("low_pathway_overlap".to_string());
    }
    if literature_count == Some(0) {
        flags.push("no_literature_support".to_string());
    }

    let mut confidence = (1.2 * opentargets_score).min(1.0);
    if evidence_count >= 3 {
        confidence += 0.1;
        reasoning.push("3 or more independent evidence sources".to_string());
    }
    if pathway_overlap.is_some_and(|p| p > 0.1) {
        confidence += 0.1;
        reasoning.push("pathway overlap above 0.1".to_string());
    }
    confidence = confidence.clamp(0.0, 1.0);

    let decision = if hard_reject {
        Decision::Reject
    } else if confidence < 0.5 {
        Decision::Review
    } else {
        Decision::Keep
    };

    ValidationResult { decision, confidence, reasoning, flags }
}

pub fn validate_drug(
    phase: u8,
    has_clinical_evidence: bool,
    mechanism_known: bool,
    safety_flags: &[String],
) -> ValidationResult {
    let mut reasoning = Vec::new();
    let flags = safety_flags.to_vec();

    let hard_reject = phase < 1 && !has_clinical_evidence;
    if hard_reject {
        reasoning.push("preclinical with no clinical evidence".to_string());
    }

    let mut confidence = 0.5 + 0.1 * f64::from(phase) + if has_clinical_evidence { 0.2 } else { 0.0 } + if mechanism_known { 0.1 } else { 0.0 };
    confidence = confidence.min(1.0);

    let decision = if hard_reject || confidence < 0.3 {
        Decision::Reject
    } else if confidence < 0.6 {
        Decision::Review
    } else {
        Decision::Keep
    };

    if decision == Decision::Keep {
        reasoning.push(format!("confidence {confidence:.2} at or above the keep threshold"));
    }

    ValidationResult { decision, confidence, reasoning, flags }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_below_score_floor_is_rejected_regardless_of_confidence() {
        let result = validate_target(0.1, 5, Some(0.5), Some(3));
        assert_eq!(result.decision, Decision::Reject);
    }

    #[test]
    fn target_low_evidence_and_pathway_overlap_flag_but_may_still_keep() {
        let result = validate_target(0.9, 0, Some(0.01), None);
        assert!(result.flags.contains(&"single_source".to_string()));
        assert!(result.flags.contains(&"low_pathway_overlap".to_string()));
    }

    #[test]
    fn target_mid_confidence_is_review() {
        let result = validate_target(0.3, 0, None, None);
        assert_eq!(result.decision, Decision::Review);
    }

    #[test]
    fn drug_preclinical_no_evidence_is_rejected() {
        let result = validate_drug(0, false, true, &[]);
        assert_eq!(result.decision, Decision::Reject);
    }

    #[test]
    fn drug_high_phase_with_evidence_is_kept() {
        let result = validate_drug(4, true, true, &[]);
        assert_eq!(result.decision, Decision::Keep);
    }

    #[test]
    fn drug_minimum_non_reject_confidence_lands_exactly_on_keep_boundary() {
        // phase=1 with no other credit is the lowest confidence (0.6) that
        // survives the hard-reject check; the confidence formula has no way
        // to land strictly below 0.6 without also triggering hard-reject,
        // so REVIEW is unreachable for validate_drug by construction.
        let result = validate_drug(1, false, false, &[]);
        assert_eq!(result.decision, Decision::Keep);
        assert!((result.confidence - 0.6).abs() < 1e-9);
    }
}
