//! Pathway DB client (Reactome), spec §4.5 step 4 / §4.5.1. Adapted from the
//! teacher's Reactome usage (entity→pathways, pathway→events, search),
//! repointed at pathway-set computation for Jaccard validation rather than
//! CLI display.

use std::borrow::Cow;

use serde::Deserialize;

use crate::error::RepurposeError;

const REACTOME_BASE: &str = "https://reactome.org/ContentService";
const REACTOME_API: &str = "reactome";
const REACTOME_BASE_ENV: &str = "REPURPOSER_REACTOME_BASE";

#[derive(Clone)]
pub struct ReactomeClient {
    client: reqwest_middleware::ClientWithMiddleware,
    base: Cow<'static, str>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathwayHit {
    #[serde(rename = "stId")]
    pub stable_id: String,
    #[serde(rename = "displayName")]
    pub name: String,
}

impl ReactomeClient {
    pub fn new() -> Result<Self, RepurposeError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: crate::sources::env_base(REACTOME_BASE, REACTOME_BASE_ENV),
        })
    }

    #[cfg(test)]
    fn new_for_test(base: String) -> Result<Self, RepurposeError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: Cow::Owned(base),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base.as_ref().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// `entity -> pathways` lookup keyed by a reviewed UniProt accession.
    pub async fn pathways_for_protein(
        &self,
        uniprot_accession: &str,
    ) -> Result<Vec<PathwayHit>, RepurposeError> {
        let url = self.endpoint(&format!(
            "data/mapping/UniProt/{uniprot_accession}/pathways"
        ));
        let req = self.client.get(&url).query(&[("species", "9606")]);
        let resp = crate::sources::guarded_send(REACTOME_API, req).await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let status = resp.status();
        let bytes = crate::sources::read_limited_body(resp, REACTOME_API).await?;
        if !status.is_success() {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&bytes).map_err(|source| RepurposeError::ApiJson {
            api: REACTOME_API.to_string(),
            source,
        })
    }

    /// `pathway -> events` lookup: direct child reactions/sub-pathways.
    pub async fn contained_events(&self, stable_id: &str) -> Result<Vec<PathwayHit>, RepurposeError> {
        let url = self.endpoint(&format!("data/pathway/{stable_id}/containedEvents"));
        let req = self.client.get(&url);
        let resp = crate::sources::guarded_send(REACTOME_API, req).await?;
        if !resp.status().is_success() {
            return Ok(Vec::new());
        }
        let bytes = crate::sources::read_limited_body(resp, REACTOME_API).await?;
        Ok(serde_json::from_slice(&bytes).unwrap_or_default())
    }

    pub async fn search_pathways(&self, query: &str) -> Result<Vec<PathwayHit>, RepurposeError> {
        let url = self.endpoint("search/query");
        let req = self
            .client
            .get(&url)
            .query(&[("query", query), ("types", "Pathway"), ("species", "Homo sapiens")]);
        let resp = crate::sources::guarded_send(REACTOME_API, req).await?;
        if !resp.status().is_success() {
            return Ok(Vec::new());
        }
        let bytes = crate::sources::read_limited_body(resp, REACTOME_API).await?;
        let parsed: ReactomeSearchResponse = match serde_json::from_slice(&bytes) {
            Ok(v) => v,
            Err(_) => return Ok(Vec::new()),
        };
        Ok(parsed
            .results
            .into_iter()
            .flat_map(|group| group.entries)
            .map(|e| PathwayHit {
                stable_id: e.stable_id,
                name: e.name,
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct ReactomeSearchResponse {
    #[serde(default)]
    results: Vec<ReactomeSearchGroup>,
}

#[derive(Debug, Deserialize)]
struct ReactomeSearchGroup {
    #[serde(default)]
    entries: Vec<ReactomeSearchEntry>,
}

#[derive(Debug, Deserialize)]
struct ReactomeSearchEntry {
    #[serde(rename = "stId")]
    stable_id: String,
    #[serde(rename = "name")]
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn pathways_for_protein_returns_empty_on_404() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/mapping/UniProt/P00000/pathways"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = ReactomeClient::new_for_test(server.uri()).unwrap();
        assert!(client.pathways_for_protein("P00000").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn pathways_for_protein_parses_hits() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/mapping/UniProt/P15056/pathways"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"stId": "R-HSA-5673001", "displayName": "RAF/MAP kinase cascade"}
            ])))
            .mount(&server)
            .await;

        let client = ReactomeClient::new_for_test(server.uri()).unwrap();
        let hits = client.pathways_for_protein("P15056").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].stable_id, "R-HSA-5673001");
    }
}
