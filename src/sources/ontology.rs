//! Ontology lookup client (spec §4.3 step 1, §6): OLS-shaped search across
//! EFO/MONDO, plus ancestor/xref lookups. Adapted from the teacher's
//! `clinical_trials::ClinicalTrialsClient` shape (`shared_client`,
//! `endpoint`, `get_json`).

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::error::RepurposeError;

const OLS_BASE: &str = "https://www.ebi.ac.uk/ols4";
const OLS_API: &str = "ontology";
const OLS_BASE_ENV: &str = "REPURPOSER_OLS_BASE";

#[derive(Clone)]
pub struct OntologyClient {
    client: reqwest_middleware::ClientWithMiddleware,
    base: Cow<'static, str>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OntologyHit {
    pub iri: String,
    pub label: String,
    pub description: Option<String>,
    pub ontology_prefix: String,
    pub obo_id: Option<String>,
    #[serde(default)]
    pub synonyms: Vec<String>,
    pub score: f64,
}

impl OntologyClient {
    pub fn new() -> Result<Self, RepurposeError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: crate::sources::env_base(OLS_BASE, OLS_BASE_ENV),
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

    /// spec §4.3 step 1: restricted to {EFO, MONDO}, up to 10 rows.
    pub async fn search_disease(&self, term: &str) -> Result<Vec<OntologyHit>, RepurposeError> {
        let url = self.endpoint("api/search");
        let req = self.client.get(&url).query(&[
            ("q", term),
            ("ontology", "efo,mondo"),
            ("rows", "10"),
            ("fieldList", "iri,label,description,ontology_prefix,obo_id,synonym,score"),
        ]);
        let resp = crate::sources::guarded_send(OLS_API, req).await?;
        let status = resp.status();
        let bytes = crate::sources::read_limited_body(resp, OLS_API).await?;
        if !status.is_success() {
            let excerpt = crate::sources::body_excerpt(&bytes);
            return Err(RepurposeError::Api {
                api: OLS_API.to_string(),
                message: format!("HTTP {status}: {excerpt}"),
            });
        }
        let parsed: OlsSearchResponse =
            serde_json::from_slice(&bytes).map_err(|source| RepurposeError::ApiJson {
                api: OLS_API.to_string(),
                source,
            })?;
        Ok(parsed
            .response
            .docs
            .into_iter()
            .map(|d| OntologyHit {
                iri: d.iri,
                label: d.label.unwrap_or_default(),
                description: d.description.and_then(|v| v.into_iter().next()),
                ontology_prefix: d.ontology_prefix.unwrap_or_default(),
                obo_id: d.obo_id,
                synonyms: d.synonym,
                score: d.score.unwrap_or(0.0),
            })
            .collect())
    }

    /// spec §4.3 step 4: parent-term labels for a resolved IRI.
    pub async fn ancestors(&self, ontology: &str, iri: &str) -> Result<Vec<String>, RepurposeError> {
        let encoded = double_url_encode(iri);
        let url = self.endpoint(&format!(
            "api/ontologies/{ontology}/terms/{encoded}/hierarchicalAncestors"
        ));
        let req = self.client.get(&url);
        let resp = crate::sources::guarded_send(OLS_API, req).await?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let bytes = crate::sources::read_limited_body(resp, OLS_API).await?;
        if !status.is_success() {
            return Ok(Vec::new());
        }
        let parsed: OlsAncestorsResponse = match serde_json::from_slice(&bytes) {
            Ok(v) => v,
            Err(_) => return Ok(Vec::new()),
        };
        Ok(parsed
            .embedded
            .terms
            .into_iter()
            .filter_map(|t| t.label)
            .collect())
    }

    /// spec §6: ontology cross-reference mapping (MONDO↔EFO↔DOID).
    pub async fn xref(&self, iri: &str) -> Result<Vec<String>, RepurposeError> {
        let encoded = double_url_encode(iri);
        let url = self.endpoint(&format!("api/terms/{encoded}"));
        let req = self.client.get(&url);
        let resp = crate::sources::guarded_send(OLS_API, req).await?;
        if !resp.status().is_success() {
            return Ok(Vec::new());
        }
        let bytes = crate::sources::read_limited_body(resp, OLS_API).await?;
        let parsed: OlsTermResponse = match serde_json::from_slice(&bytes) {
            Ok(v) => v,
            Err(_) => return Ok(Vec::new()),
        };
        Ok(parsed
            .embedded
            .terms
            .into_iter()
            .flat_map(|t| t.obo_xref.unwrap_or_default())
            .filter_map(|x| x.id)
            .collect())
    }
}

fn double_url_encode(iri: &str) -> String {
    let once = urlencoding_minimal(iri);
    urlencoding_minimal(&once)
}

fn urlencoding_minimal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[derive(Debug, Deserialize)]
struct OlsSearchResponse {
    response: OlsSearchResponseBody,
}

#[derive(Debug, Deserialize)]
struct OlsSearchResponseBody {
    #[serde(default)]
    docs: Vec<OlsDoc>,
}

#[derive(Debug, Deserialize)]
struct OlsDoc {
    iri: String,
    label: Option<String>,
    description: Option<Vec<String>>,
    ontology_prefix: Option<String>,
    obo_id: Option<String>,
    #[serde(default)]
    synonym: Vec<String>,
    score: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OlsAncestorsResponse {
    #[serde(rename = "_embedded", default)]
    embedded: OlsEmbeddedTerms,
}

#[derive(Debug, Default, Deserialize)]
struct OlsEmbeddedTerms {
    #[serde(default)]
    terms: Vec<OlsTerm>,
}

#[derive(Debug, Deserialize)]
struct OlsTerm {
    label: Option<String>,
    #[serde(default)]
    obo_xref: Option<Vec<OlsXref>>,
}

#[derive(Debug, Deserialize)]
struct OlsXref {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OlsTermResponse {
    #[serde(rename = "_embedded")]
    embedded: OlsEmbeddedTerms,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn search_disease_parses_docs() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": {
                    "docs": [{
                        "iri": "http://www.ebi.ac.uk/efo/EFO_0000249",
                        "label": "Alzheimer's disease",
                        "description": ["A dementia"],
                        "ontology_prefix": "EFO",
                        "obo_id": "EFO:0000249",
                        "synonym": ["AD"],
                        "score": 42.0
                    }]
                }
            })))
            .mount(&server)
            .await;

        let client = OntologyClient::new_for_test(server.uri()).unwrap();
        let hits = client.search_disease("alzheimer").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].ontology_prefix, "EFO");
        assert_eq!(hits[0].obo_id.as_deref(), Some("EFO:0000249"));
    }

    #[test]
    fn double_url_encode_escapes_slashes_twice() {
        let encoded = double_url_encode("http://x/y");
        assert!(!encoded.contains('/'));
        assert!(encoded.contains('%'));
    }
}
