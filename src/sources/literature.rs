//! Literature search client (spec §4.7): abstracts + back-citation counts
//! for the literature evidence aggregator. Same REST-client shape as
//! `sources::ontology`/`sources::mesh`, pointed at Europe PMC's search API.

use std::borrow::Cow;

use serde::Deserialize;

use crate::error::RepurposeError;

const LITERATURE_BASE: &str = "https://www.ebi.ac.uk/europepmc/webservices/rest";
const LITERATURE_API: &str = "literature";
const LITERATURE_BASE_ENV: &str = "REPURPOSER_LITERATURE_BASE";

#[derive(Clone)]
pub struct LiteratureClient {
    client: reqwest_middleware::ClientWithMiddleware,
    base: Cow<'static, str>,
}

#[derive(Debug, Clone)]
pub struct LiteratureHit {
    pub pmid: String,
    pub title: String,
    pub abstract_text: Option<String>,
    /// Back-citation count (spec §4.7: "per-article citation count via
    /// back-citation count").
    pub citation_count: u32,
}

impl LiteratureClient {
    pub fn new() -> Result<Self, RepurposeError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: crate::sources::env_base(LITERATURE_BASE, LITERATURE_BASE_ENV),
        })
    }

    #[cfg(test)]
    fn new_for_test(base: String) -> Result<Self, RepurposeError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: Cow::Owned(base),
        })
    }

    /// Returns an empty vector on any failure (spec §4.7: "return structured
    /// empty results on failure rather than raising").
    pub async fn search(&self, query: &str, page_size: u32) -> Vec<LiteratureHit> {
        self.try_search(query, page_size).await.unwrap_or_default()
    }

    async fn try_search(&self, query: &str, page_size: u32) -> Result<Vec<LiteratureHit>, RepurposeError> {
        let url = format!("{}/search", self.base.as_ref().trim_end_matches('/'));
        let req = self.client.get(&url).query(&[
            ("query", query),
            ("format", "json"),
            ("resultType", "core"),
            ("pageSize", &page_size.to_string()),
        ]);
        let resp = crate::sources::guarded_send(LITERATURE_API, req).await?;
        if !resp.status().is_success() {
            return Ok(Vec::new());
        }
        let bytes = crate::sources::read_limited_body(resp, LITERATURE_API).await?;
        let parsed: EuropePmcResponse = match serde_json::from_slice(&bytes) {
            Ok(v) => v,
            Err(_) => return Ok(Vec::new()),
        };
        Ok(parsed
            .result_list
            .unwrap_or_default()
            .result
            .into_iter()
            .map(|r| LiteratureHit {
                pmid: r.pmid.unwrap_or_default(),
                title: r.title.unwrap_or_default(),
                abstract_text: r.abstract_text,
                citation_count: r.cited_by_count.unwrap_or(0),
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct EuropePmcResponse {
    #[serde(rename = "resultList")]
    result_list: Option<EuropePmcResultList>,
}

#[derive(Debug, Deserialize)]
struct EuropePmcResultList {
    #[serde(default)]
    result: Vec<EuropePmcResult>,
}

#[derive(Debug, Deserialize)]
struct EuropePmcResult {
    pmid: Option<String>,
    title: Option<String>,
    #[serde(rename = "abstractText")]
    abstract_text: Option<String>,
    #[serde(rename = "citedByCount")]
    cited_by_count: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn search_parses_result_rows() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "resultList": {
                    "result": [{
                        "pmid": "12345",
                        "title": "A meta-analysis of repurposing candidates",
                        "abstractText": "We review...",
                        "citedByCount": 42
                    }]
                }
            })))
            .mount(&server)
            .await;

        let client = LiteratureClient::new_for_test(server.uri()).unwrap();
        let hits = client.search("disease X treatment", 10).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].citation_count, 42);
    }

    #[tokio::test]
    async fn search_returns_empty_on_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = LiteratureClient::new_for_test(server.uri()).unwrap();
        assert!(client.search("anything", 5).await.is_empty());
    }
}
