//! Generic web search client shared by the patent, EXIM/supply, and web
//! intelligence aggregators (spec §4.7, §6). A single capability — text
//! query in, snippet hits out — fronting whichever search API the
//! deployment configures.

use std::borrow::Cow;

use serde::Deserialize;

use crate::error::RepurposeError;

const WEB_SEARCH_BASE: &str = "https://api.search.brave.com/res/v1/web/search";
const WEB_SEARCH_API: &str = "web_search";
const WEB_SEARCH_BASE_ENV: &str = "REPURPOSER_WEB_SEARCH_BASE";
const WEB_SEARCH_KEY_ENV: &str = "REPURPOSER_WEB_SEARCH_KEY";

#[derive(Clone)]
pub struct WebSearchClient {
    client: reqwest_middleware::ClientWithMiddleware,
    base: Cow<'static, str>,
    api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

impl WebSearchClient {
    pub fn new() -> Result<Self, RepurposeError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: crate::sources::env_base(WEB_SEARCH_BASE, WEB_SEARCH_BASE_ENV),
            api_key: std::env::var(WEB_SEARCH_KEY_ENV).ok().filter(|v| !v.trim().is_empty()),
        })
    }

    #[cfg(test)]
    fn new_for_test(base: String) -> Result<Self, RepurposeError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: Cow::Owned(base),
            api_key: None,
        })
    }

    /// Returns empty on failure rather than raising (spec §4.7: "all
    /// aggregators ... return structured empty results on failure rather
    /// than raising").
    pub async fn search(&self, query: &str, count: u32) -> Vec<SearchHit> {
        self.try_search(query, count).await.unwrap_or_default()
    }

    async fn try_search(&self, query: &str, count: u32) -> Result<Vec<SearchHit>, RepurposeError> {
        let mut req = self
            .client
            .get(self.base.as_ref())
            .query(&[("q", query), ("count", &count.to_string())]);
        if let Some(key) = &self.api_key {
            req = req.header("X-Subscription-Token", key);
        }
        let resp = crate::sources::guarded_send(WEB_SEARCH_API, req).await?;
        if !resp.status().is_success() {
            return Ok(Vec::new());
        }
        let bytes = crate::sources::read_limited_body(resp, WEB_SEARCH_API).await?;
        let parsed: SearchResponse = match serde_json::from_slice(&bytes) {
            Ok(v) => v,
            Err(_) => return Ok(Vec::new()),
        };
        Ok(parsed
            .web
            .map(|w| w.results)
            .unwrap_or_default()
            .into_iter()
            .map(|r| SearchHit {
                title: r.title,
                snippet: r.description.unwrap_or_default(),
                url: r.url,
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    web: Option<WebResults>,
}

#[derive(Debug, Deserialize)]
struct WebResults {
    #[serde(default)]
    results: Vec<SearchResultRow>,
}

#[derive(Debug, Deserialize)]
struct SearchResultRow {
    title: String,
    url: String,
    description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn search_returns_empty_on_server_error_without_panicking() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = WebSearchClient::new_for_test(server.uri()).unwrap();
        let hits = client.search("drug patent expiry", 5).await;
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn search_parses_result_rows() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "web": { "results": [{"title": "Patent expiry", "url": "https://example.com", "description": "expired 2019"}] }
            })))
            .mount(&server)
            .await;

        let client = WebSearchClient::new_for_test(server.uri()).unwrap();
        let hits = client.search("drug patent expiry", 5).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Patent expiry");
    }
}
