//! Literature aggregator (spec §4.7): tiered Europe PMC queries, an LLM
//! pathophysiology synthesis with a structured target list, and a regex
//! gene-symbol fallback when the LLM is unavailable or returns garbage.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::json;

use crate::cache::ContentAddressedCache;
use crate::model::{LiteratureArticle, LiteratureOutput, LiteratureTier};
use crate::sources::literature::{LiteratureClient, LiteratureHit};
use crate::sources::llm::{extract_first_json_object, LlmClient};

const CACHE_ENDPOINT: &str = "literature.search";
const PAGE_SIZE: u32 = 20;

/// Common uppercase abbreviations that match the gene-symbol token shape but
/// are not genes, so the regex fallback doesn't mistake them for targets.
const ABBREVIATION_BLOCKLIST: &[&str] = &[
    "DNA", "RNA", "HIV", "FDA", "NCT", "CI", "OR", "HR", "USA", "EU", "WHO", "NIH", "RCT",
    "PFS", "OS", "AE", "SAE", "QOL", "ICU", "ER", "MRI", "CT", "PET", "EMA", "UK",
];

#[derive(Debug, Deserialize)]
struct LlmLiteratureResponse {
    synthesis: Option<String>,
    #[serde(default)]
    targets: Vec<String>,
}

fn gene_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[A-Z][A-Z0-9]{1,9}\b").expect("valid regex"))
}

fn extract_gene_symbols_fallback(abstracts: &[String]) -> Vec<String> {
    let mut found = BTreeSet::new();
    for text in abstracts {
        for m in gene_token_re().find_iter(text) {
            let token = m.as_str();
            if !ABBREVIATION_BLOCKLIST.contains(&token) {
                found.insert(token.to_string());
            }
        }
    }
    found.into_iter().collect()
}

async fn cached_search(
    client: &LiteratureClient,
    cache: &ContentAddressedCache,
    query: &str,
) -> Vec<LiteratureHit> {
    let params = json!({ "query": query, "pageSize": PAGE_SIZE });
    if let Some(cached) = cache.get(CACHE_ENDPOINT, &params).await {
        #[derive(Deserialize)]
        struct Cached {
            pmid: String,
            title: String,
            abstract_text: Option<String>,
            citation_count: u32,
        }
        if let Ok(rows) = serde_json::from_value::<Vec<Cached>>(cached) {
            return rows
                .into_iter()
                .map(|r| LiteratureHit {
                    pmid: r.pmid,
                    title: r.title,
                    abstract_text: r.abstract_text,
                    citation_count: r.citation_count,
                })
                .collect();
        }
    }
    let hits = client.search(query, PAGE_SIZE).await;
    let cacheable: Vec<_> = hits
        .iter()
        .map(|h| {
            json!({
                "pmid": h.pmid,
                "title": h.title,
                "abstract_text": h.abstract_text,
                "citation_count": h.citation_count,
            })
        })
        .collect();
    cache.put(CACHE_ENDPOINT, &params, json!(cacheable)).await;
    hits
}

pub async fn aggregate(
    literature: &LiteratureClient,
    llm: &LlmClient,
    cache: &ContentAddressedCache,
    disease_label: &str,
) -> LiteratureOutput {
    let tier1 = cached_search(literature, cache, &format!("{disease_label} meta-analysis")).await;
    let tier2 = cached_search(literature, cache, &format!("{disease_label} recent review")).await;
    let tier3 = cached_search(literature, cache, &format!("{disease_label} mechanism")).await;

    let mut articles = Vec::new();
    let mut abstracts = Vec::new();
    let mut citations = Vec::new();
    for (hits, tier) in [
        (&tier1, LiteratureTier::MetaAnalysis),
        (&tier2, LiteratureTier::RecentReview),
        (&tier3, LiteratureTier::Mechanism),
    ] {
        for hit in hits {
            citations.push(hit.pmid.clone());
            if let Some(text) = &hit.abstract_text {
                abstracts.push(text.clone());
            }
            articles.push(LiteratureArticle {
                pmid: hit.pmid.clone(),
                title: hit.title.clone(),
                citation_count: hit.citation_count,
                tier,
            });
        }
    }

    let prompt = format!(
        "Given these abstracts about {disease_label}, respond with a JSON object \
{{\"synthesis\": \"<pathophysiology summary>\", \"targets\": [\"<gene symbol>\", ...]}}.\n\n{}",
        abstracts.join("\n\n")
    );

    let (pathophysiology_synthesis, target_symbols) = match llm.complete(&prompt).await {
        Some(raw) => match extract_first_json_object(&raw).and_then(|v| serde_json::from_value::<LlmLiteratureResponse>(v).ok()) {
            Some(parsed) if parsed.synthesis.is_some() || !parsed.targets.is_empty() => {
                (parsed.synthesis, parsed.targets)
            }
            _ => (None, extract_gene_symbols_fallback(&abstracts)),
        },
        None => (None, extract_gene_symbols_fallback(&abstracts)),
    };

    LiteratureOutput {
        articles,
        pathophysiology_synthesis,
        target_symbols,
        citations,
    }
}
