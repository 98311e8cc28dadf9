//! EXIM / supply-chain aggregator (spec §4.7): one web-search query per
//! candidate aggregating API-manufacturing countries, classified into a
//! coarse supply signal.

use std::collections::BTreeMap;

use serde_json::json;

use crate::cache::ContentAddressedCache;
use crate::model::{EximAssessment, EximOutput, RepurposingCandidate, SupplySignal};
use crate::sources::web_search::WebSearchClient;

const CACHE_ENDPOINT: &str = "exim.search";
const SEARCH_COUNT: u32 = 10;

/// Countries checked for mentions in manufacturing snippets, ordered by the
/// display priority spec §4.7 implies ("China", "India" specifically named).
const KNOWN_COUNTRIES: &[&str] = &[
    "china",
    "india",
    "united states",
    "germany",
    "switzerland",
    "italy",
    "ireland",
    "japan",
    "south korea",
    "israel",
];

fn mentioned_countries(text: &str) -> Vec<String> {
    let lower = text.to_ascii_lowercase();
    KNOWN_COUNTRIES
        .iter()
        .filter(|c| lower.contains(*c))
        .map(|c| titlecase(c))
        .collect()
}

fn titlecase(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// `has_search_text` distinguishes "searched and found nothing" (WEAK) from
/// "no search results at all" (UNKNOWN) — spec §4.7 names both tiers but a
/// country-name match alone can't tell them apart.
fn classify_signal(countries: &[String], has_search_text: bool) -> SupplySignal {
    if countries.is_empty() {
        return if has_search_text { SupplySignal::Weak } else { SupplySignal::Unknown };
    }
    let has_china_or_india = countries.iter().any(|c| c == "China" || c == "India");
    if has_china_or_india {
        SupplySignal::Strong
    } else {
        SupplySignal::Moderate
    }
}

pub async fn aggregate(
    client: &WebSearchClient,
    cache: &ContentAddressedCache,
    candidates: &[RepurposingCandidate],
) -> EximOutput {
    let mut per_candidate = BTreeMap::new();
    for candidate in candidates {
        let query = format!("{} active pharmaceutical ingredient manufacturing country", candidate.drug_name);
        let params = json!({ "query": query, "count": SEARCH_COUNT });

        let text = if let Some(cached) = cache.get(CACHE_ENDPOINT, &params).await {
            cached.as_str().map(str::to_string).unwrap_or_default()
        } else {
            let hits = client.search(&query, SEARCH_COUNT).await;
            let text = hits.into_iter().map(|h| format!("{} {}", h.title, h.snippet)).collect::<Vec<_>>().join(" ");
            cache.put(CACHE_ENDPOINT, &params, json!(text)).await;
            text
        };

        let countries = mentioned_countries(&text);
        let signal = classify_signal(&countries, !text.trim().is_empty());
        let citations = if text.trim().is_empty() { Vec::new() } else { vec![query] };

        per_candidate.insert(
            candidate.drug_id.clone(),
            EximAssessment { signal, manufacturing_countries: countries, citations },
        );
    }
    EximOutput { per_candidate }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn china_or_india_mention_is_strong() {
        let countries = mentioned_countries("manufactured primarily in China and Germany");
        assert_eq!(classify_signal(&countries, true), SupplySignal::Strong);
    }

    #[test]
    fn other_country_mention_is_moderate() {
        let countries = mentioned_countries("produced in Switzerland");
        assert_eq!(classify_signal(&countries, true), SupplySignal::Moderate);
    }

    #[test]
    fn search_hits_with_no_known_country_is_weak() {
        let countries = mentioned_countries("no information available");
        assert_eq!(classify_signal(&countries, true), SupplySignal::Weak);
    }

    #[test]
    fn no_search_text_at_all_is_unknown() {
        let countries: Vec<String> = Vec::new();
        assert_eq!(classify_signal(&countries, false), SupplySignal::Unknown);
    }
}
