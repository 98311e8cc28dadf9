//! Patent landscape aggregator (spec §4.7): two web-search queries per
//! candidate, risk tier derived from keyword heuristics over the snippets.

use std::collections::BTreeMap;

use serde_json::json;

use crate::cache::ContentAddressedCache;
use crate::model::{PatentAssessment, PatentOutput, PatentRiskTier, RepurposingCandidate};
use crate::sources::web_search::WebSearchClient;

const CACHE_ENDPOINT: &str = "patents.search";
const SEARCH_COUNT: u32 = 10;
/// Years beyond the current one treated as a plausible future patent expiry
/// mention; the upper bound matches spec §4.7's literal "2040".
const FUTURE_YEAR_UPPER_BOUND: i32 = 2040;

fn mentions_expired(text: &str) -> bool {
    text.to_ascii_lowercase().contains("expired")
}

fn mentions_future_year(text: &str, current_year: i32) -> bool {
    (current_year + 1..=FUTURE_YEAR_UPPER_BOUND).any(|year| text.contains(&year.to_string()))
}

fn derive_risk_tier(expiry_text: &str, activity_text: &str, current_year: i32) -> PatentRiskTier {
    let has_expired = mentions_expired(expiry_text);
    let has_future_year = mentions_future_year(expiry_text, current_year);
    let has_activity = !activity_text.trim().is_empty();

    if !has_expired && !has_future_year && !has_activity {
        return PatentRiskTier::Unknown;
    }

    let mut tier = if has_expired {
        PatentRiskTier::Low
    } else if has_future_year {
        PatentRiskTier::Medium
    } else {
        PatentRiskTier::Unknown
    };

    if has_activity {
        tier = match tier {
            PatentRiskTier::Low | PatentRiskTier::Unknown => PatentRiskTier::Medium,
            PatentRiskTier::Medium | PatentRiskTier::High => PatentRiskTier::High,
        };
    }
    tier
}

async fn cached_search(client: &WebSearchClient, cache: &ContentAddressedCache, query: &str) -> String {
    let params = json!({ "query": query, "count": SEARCH_COUNT });
    if let Some(cached) = cache.get(CACHE_ENDPOINT, &params).await {
        if let Some(text) = cached.as_str() {
            return text.to_string();
        }
    }
    let hits = client.search(query, SEARCH_COUNT).await;
    let text = hits.into_iter().map(|h| format!("{} {}", h.title, h.snippet)).collect::<Vec<_>>().join(" ");
    cache.put(CACHE_ENDPOINT, &params, json!(text)).await;
    text
}

pub async fn aggregate(
    client: &WebSearchClient,
    cache: &ContentAddressedCache,
    candidates: &[RepurposingCandidate],
    current_year: i32,
) -> PatentOutput {
    let mut per_candidate = BTreeMap::new();
    for candidate in candidates {
        let expiry_query = format!("{} patent expiry", candidate.drug_name);
        let activity_query = format!("{} patent recent activity", candidate.drug_name);
        let expiry_text = cached_search(client, cache, &expiry_query).await;
        let activity_text = cached_search(client, cache, &activity_query).await;

        let risk_tier = derive_risk_tier(&expiry_text, &activity_text, current_year);
        let mut citations = Vec::new();
        if !expiry_text.trim().is_empty() {
            citations.push(expiry_query);
        }
        if !activity_text.trim().is_empty() {
            citations.push(activity_query);
        }

        per_candidate.insert(candidate.drug_id.clone(), PatentAssessment { risk_tier, citations });
    }
    PatentOutput { per_candidate }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_with_no_activity_is_low() {
        assert_eq!(derive_risk_tier("patent expired in 2019", "", 2026), PatentRiskTier::Low);
    }

    #[test]
    fn future_year_bumps_to_medium() {
        assert_eq!(derive_risk_tier("expires 2031", "", 2026), PatentRiskTier::Medium);
    }

    #[test]
    fn activity_bumps_expired_from_low_to_medium() {
        assert_eq!(
            derive_risk_tier("patent expired", "new litigation filed", 2026),
            PatentRiskTier::Medium
        );
    }

    #[test]
    fn activity_bumps_future_year_from_medium_to_high() {
        assert_eq!(
            derive_risk_tier("expires 2031", "licensing deal announced", 2026),
            PatentRiskTier::High
        );
    }

    #[test]
    fn no_data_is_unknown() {
        assert_eq!(derive_risk_tier("", "", 2026), PatentRiskTier::Unknown);
    }
}
