//! Web intelligence aggregator (spec §4.10 `web_intel` node): a general
//! situational-awareness web search run before literature/kg, surfaced to
//! the report as a short summary with citations.

use serde_json::json;

use crate::cache::ContentAddressedCache;
use crate::model::WebIntelOutput;
use crate::sources::web_search::WebSearchClient;

const CACHE_ENDPOINT: &str = "web_intel.search";
const SEARCH_COUNT: u32 = 5;

pub async fn aggregate(client: &WebSearchClient, cache: &ContentAddressedCache, disease_label: &str, geography: &str) -> WebIntelOutput {
    let query = if geography.trim().is_empty() || geography.eq_ignore_ascii_case("global") {
        format!("{disease_label} drug repurposing landscape")
    } else {
        format!("{disease_label} drug repurposing landscape {geography}")
    };
    let params = json!({ "query": query, "count": SEARCH_COUNT });

    let hits = if let Some(cached) = cache.get(CACHE_ENDPOINT, &params).await {
        serde_json::from_value::<Vec<(String, String, String)>>(cached).unwrap_or_default()
    } else {
        let hits: Vec<(String, String, String)> = client
            .search(&query, SEARCH_COUNT)
            .await
            .into_iter()
            .map(|h| (h.title, h.snippet, h.url))
            .collect();
        if let Ok(value) = serde_json::to_value(&hits) {
            cache.put(CACHE_ENDPOINT, &params, value).await;
        }
        hits
    };

    if hits.is_empty() {
        return WebIntelOutput::default();
    }

    let summary = hits.iter().map(|(title, snippet, _)| format!("{title}: {snippet}")).collect::<Vec<_>>().join(" | ");
    let citations = hits.into_iter().map(|(_, _, url)| url).collect();

    WebIntelOutput { summary: Some(summary), citations }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_hits_yield_default_output() {
        let out = WebIntelOutput::default();
        assert!(out.summary.is_none());
        assert!(out.citations.is_empty());
    }
}
