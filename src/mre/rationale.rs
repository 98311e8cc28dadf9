//! Mechanistic rationale text generation (spec §4.6 step 4): a deterministic,
//! template-rendered sentence rather than an LLM call, so the wording is
//! reproducible across runs.

use minijinja::{context, Environment};

const TEMPLATE: &str = "{{ drug }} modulates {{ target }} via {{ moa }}. This target is implicated \
in {{ disease }} through {{ shared_count }} shared pathways including {{ top2 }}. The {{ percent }}% \
pathway overlap indicates {{ strength }} mechanistic relevance.";

/// `shared_pathways` are pathway display names (not Reactome IDs) common to
/// the target and the disease's own pathway set; `pathway_overlap` is the
/// Jaccard index computed in `targets::pathway::validate_mechanism`.
pub fn render(
    drug: &str,
    target: &str,
    moa: &str,
    disease: &str,
    shared_pathways: &[String],
    pathway_overlap: f64,
) -> String {
    let top2 = if shared_pathways.is_empty() {
        "no named pathways".to_string()
    } else {
        shared_pathways.iter().take(2).cloned().collect::<Vec<_>>().join(", ")
    };
    let percent = (pathway_overlap * 100.0).round() as i64;
    let strength = if pathway_overlap >= 0.30 { "strong" } else { "limited" };

    let env = Environment::new();
    env.render_str(
        TEMPLATE,
        context! {
            drug,
            target,
            moa,
            disease,
            shared_count => shared_pathways.len(),
            top2,
            percent,
            strength,
        },
    )
    .unwrap_or_else(|_| {
        format!(
            "{drug} modulates {target} via {moa}. This target is implicated in {disease} through \
{shared} shared pathways including {top2}. The {percent}% pathway overlap indicates {strength} \
mechanistic relevance.",
            shared = shared_pathways.len()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_strong_relevance_above_threshold() {
        let text = render(
            "Metformin",
            "PRKAA1",
            "AMPK activation",
            "hepatocellular carcinoma",
            &["Signaling by AMPK".to_string(), "Energy metabolism".to_string()],
            0.42,
        );
        assert!(text.contains("Metformin modulates PRKAA1"));
        assert!(text.contains("Signaling by AMPK, Energy metabolism"));
        assert!(text.contains("42%"));
        assert!(text.contains("strong mechanistic relevance"));
    }

    #[test]
    fn renders_limited_relevance_below_threshold_with_no_pathways() {
        let text = render("Drug", "TGT", "unknown MoA", "disease", &[], 0.05);
        assert!(text.contains("no named pathways"));
        assert!(text.contains("limited mechanistic relevance"));
        assert!(text.contains("5%"));
    }

    #[test]
    fn truncates_to_first_two_shared_pathways() {
        let pathways = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let text = render("Drug", "TGT", "moa", "disease", &pathways, 0.5);
        assert!(text.contains("including A, B."));
        assert!(!text.contains(", C"));
    }
}
