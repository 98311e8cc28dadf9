//! Disease Resolver (spec §4.3): turns a free-text indication into a
//! `DiseaseContext`. Queries the ontology and MeSH collaborators
//! concurrently, picks the best ontology hit by an ordered rule cascade,
//! and derives therapeutic-area + boolean flags from the resolved terms.

use crate::error::RepurposeError;
use crate::model::{DiseaseContext, DiseaseFlags};
use crate::sources::mesh::MeshClient;
use crate::sources::ontology::{OntologyClient, OntologyHit};

use super::therapeutic_area;

/// Keyword sets used to derive the boolean flags (spec §4.3 step 6). Matched
/// case-insensitively against the disease label, its parent terms, and the
/// resolved ontology description.
const CANCER_KEYWORDS: &[&str] = &["cancer", "carcinoma", "tumor", "tumour", "neoplasm", "leukemia", "lymphoma", "sarcoma", "melanoma", "oncology"];
const AUTOIMMUNE_KEYWORDS: &[&str] = &["autoimmune", "autoinflammatory", "lupus", "rheumatoid"];
const INFECTIOUS_KEYWORDS: &[&str] = &["infection", "infectious", "viral", "bacterial", "fungal", "parasitic"];
const RARE_KEYWORDS: &[&str] = &["rare disease", "orphan disease", "ultra-rare"];
const GENETIC_KEYWORDS: &[&str] = &["genetic", "hereditary", "inherited", "congenital", "mutation"];

/// Rule that selected the best ontology hit, recorded for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchRule {
    ExactLabel,
    ExactSynonym,
    FuzzyLabel,
    BestMondo,
    HighestScore,
}

impl MatchRule {
    fn as_str(&self) -> &'static str {
        match self {
            Self::ExactLabel => "exact_label",
            Self::ExactSynonym => "exact_synonym",
            Self::FuzzyLabel => "fuzzy_label",
            Self::BestMondo => "best_mondo",
            Self::HighestScore => "highest_score",
        }
    }
}

const FUZZY_MATCH_THRESHOLD: f64 = 0.85;

pub struct DiseaseResolver {
    ontology: OntologyClient,
    mesh: MeshClient,
}

impl DiseaseResolver {
    pub fn new() -> Result<Self, RepurposeError> {
        Ok(Self {
            ontology: OntologyClient::new()?,
            mesh: MeshClient::new()?,
        })
    }

    /// Resolves free-text `indication` to a `DiseaseContext`. Returns
    /// `Ok(None)` when the ontology search yields nothing usable — callers
    /// treat this as a disease-resolution failure and abort the run (spec
    /// §4.10).
    pub async fn resolve(&self, indication: &str) -> Result<Option<DiseaseContext>, RepurposeError> {
        let (hits_result, mesh_result) =
            tokio::join!(self.ontology.search_disease(indication), self.mesh.lookup(indication));
        let hits = hits_result?;
        let mesh_hit = mesh_result.unwrap_or(None);

        let Some((hit, rule)) = select_best_match(&hits, indication) else {
            tracing::warn!(indication, "disease resolution found no ontology match");
            return Ok(None);
        };
        tracing::info!(indication, rule = rule.as_str(), iri = %hit.iri, "disease resolved");

        let parent_terms = self
            .ontology
            .ancestors(&hit.ontology_prefix.to_ascii_lowercase(), &hit.iri)
            .await
            .unwrap_or_default();

        let (efo_id, mondo_id) = match hit.ontology_prefix.to_ascii_uppercase().as_str() {
            "EFO" => (hit.obo_id.clone(), None),
            "MONDO" => (None, hit.obo_id.clone()),
            _ => (None, None),
        };
        let mesh_id = mesh_hit.as_ref().map(|m| m.descriptor_ui.clone());
        let mesh_tree_numbers: Vec<String> =
            mesh_hit.as_ref().map(|m| m.tree_numbers.clone()).unwrap_or_default();

        let area = therapeutic_area::classify(&mesh_tree_numbers, &parent_terms, &hit.label);
        let flags = derive_flags(&hit, &parent_terms);

        Ok(DiseaseContext::new(
            hit.label.clone(),
            efo_id,
            mondo_id,
            mesh_id,
            area,
            flags,
            hit.synonyms.clone(),
            parent_terms,
            1.0,
            hit.score,
        ))
    }
}

fn select_best_match<'a>(hits: &'a [OntologyHit], query: &str) -> Option<(&'a OntologyHit, MatchRule)> {
    if hits.is_empty() {
        return None;
    }
    let normalized_query = normalize(query);

    if let Some(hit) = hits.iter().find(|h| normalize(&h.label) == normalized_query) {
        return Some((hit, MatchRule::ExactLabel));
    }
    if let Some(hit) = hits
        .iter()
        .find(|h| h.synonyms.iter().any(|s| normalize(s) == normalized_query))
    {
        return Some((hit, MatchRule::ExactSynonym));
    }
    if let Some(hit) = hits
        .iter()
        .filter(|h| fuzzy_ratio(&normalize(&h.label), &normalized_query) > FUZZY_MATCH_THRESHOLD)
        .max_by(|a, b| {
            fuzzy_ratio(&normalize(&a.label), &normalized_query)
                .partial_cmp(&fuzzy_ratio(&normalize(&b.label), &normalized_query))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    {
        return Some((hit, MatchRule::FuzzyLabel));
    }
    if let Some(hit) = hits
        .iter()
        .filter(|h| h.ontology_prefix.eq_ignore_ascii_case("mondo"))
        .max_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal))
    {
        return Some((hit, MatchRule::BestMondo));
    }
    hits.iter()
        .max_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal))
        .map(|hit| (hit, MatchRule::HighestScore))
}

fn normalize(value: &str) -> String {
    value.trim().to_ascii_lowercase()
}

/// Approximates Python's `difflib.SequenceMatcher.ratio()`:
/// `2 * matches / (len(a) + len(b))`, where `matches` is the length of the
/// longest common subsequence. No string-similarity crate is carried by the
/// dependency stack, so this is hand-rolled.
fn fuzzy_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let lcs = longest_common_subsequence_len(&a, &b);
    (2 * lcs) as f64 / (a.len() + b.len()) as f64
}

fn longest_common_subsequence_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

fn derive_flags(hit: &OntologyHit, parent_terms: &[String]) -> DiseaseFlags {
    let haystack = format!(
        "{} {} {}",
        hit.label,
        hit.description.as_deref().unwrap_or_default(),
        parent_terms.join(" ")
    )
    .to_ascii_lowercase();
    let matches_any = |keywords: &[&str]| keywords.iter().any(|k| haystack.contains(k));
    DiseaseFlags {
        is_cancer: matches_any(CANCER_KEYWORDS),
        is_autoimmune: matches_any(AUTOIMMUNE_KEYWORDS),
        is_infectious: matches_any(INFECTIOUS_KEYWORDS),
        is_rare: matches_any(RARE_KEYWORDS),
        is_genetic: matches_any(GENETIC_KEYWORDS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(label: &str, prefix: &str, score: f64) -> OntologyHit {
        OntologyHit {
            iri: format!("http://example.org/{label}"),
            label: label.to_string(),
            description: None,
            ontology_prefix: prefix.to_string(),
            obo_id: Some(format!("{prefix}:0001")),
            synonyms: vec![],
            score,
        }
    }

    #[test]
    fn fuzzy_ratio_identical_strings_is_one() {
        assert_eq!(fuzzy_ratio("alzheimer disease", "alzheimer disease"), 1.0);
    }

    #[test]
    fn fuzzy_ratio_detects_near_miss_above_threshold() {
        let ratio = fuzzy_ratio("alzheimer's disease", "alzheimers disease");
        assert!(ratio > FUZZY_MATCH_THRESHOLD, "ratio was {ratio}");
    }

    #[test]
    fn select_best_match_prefers_exact_label_over_higher_score() {
        let hits = vec![hit("Some other disease", "EFO", 99.0), hit("Gout", "EFO", 1.0)];
        let (chosen, rule) = select_best_match(&hits, "gout").unwrap();
        assert_eq!(chosen.label, "Gout");
        assert_eq!(rule, MatchRule::ExactLabel);
    }

    #[test]
    fn select_best_match_falls_back_to_mondo_then_highest_score() {
        let hits = vec![hit("Unrelated term one", "EFO", 50.0), hit("Unrelated term two", "MONDO", 10.0)];
        let (chosen, rule) = select_best_match(&hits, "completely different query").unwrap();
        assert_eq!(chosen.ontology_prefix, "MONDO");
        assert_eq!(rule, MatchRule::BestMondo);
    }

    #[test]
    fn select_best_match_none_when_no_hits() {
        assert!(select_best_match(&[], "anything").is_none());
    }

    #[test]
    fn derive_flags_detects_cancer_and_genetic_keywords() {
        let h = hit("Hereditary breast cancer", "MONDO", 1.0);
        let flags = derive_flags(&h, &[]);
        assert!(flags.is_cancer);
        assert!(flags.is_genetic);
        assert!(!flags.is_infectious);
    }
}
