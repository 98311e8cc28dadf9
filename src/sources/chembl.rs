//! Drug-mechanism DB client (ChEMBL-shaped REST, spec §6). 3.0s minimum
//! inter-request interval per spec §4.2 — the heaviest collaborator in the
//! pipeline, called once per survivor drug for safety annotation.

use std::borrow::Cow;

use serde::Deserialize;

use crate::error::RepurposeError;

const CHEMBL_BASE: &str = "https://www.ebi.ac.uk/chembl/api/data";
const CHEMBL_API: &str = "chembl";
const CHEMBL_BASE_ENV: &str = "REPURPOSER_CHEMBL_BASE";

#[derive(Clone)]
pub struct ChemblClient {
    client: reqwest_middleware::ClientWithMiddleware,
    base: Cow<'static, str>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MechanismRow {
    pub molecule_chembl_id: String,
    pub mechanism_of_action: Option<String>,
    pub action_type: Option<String>,
    pub target_chembl_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MoleculeDetail {
    pub molecule_chembl_id: String,
    pub molecule_type: Option<String>,
    pub max_phase: Option<f64>,
    pub black_box_warning: Option<i32>,
    pub first_approval: Option<i32>,
    pub withdrawn_flag: Option<bool>,
}

impl ChemblClient {
    pub fn new() -> Result<Self, RepurposeError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: crate::sources::env_base(CHEMBL_BASE, CHEMBL_BASE_ENV),
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

    pub async fn mechanisms_for_target(
        &self,
        target_chembl_id: &str,
    ) -> Result<Vec<MechanismRow>, RepurposeError> {
        let url = self.endpoint("mechanism.json");
        let req = self
            .client
            .get(&url)
            .query(&[("target_chembl_id", target_chembl_id), ("limit", "50")]);
        let resp = crate::sources::guarded_send(CHEMBL_API, req).await?;
        let status = resp.status();
        let bytes = crate::sources::read_limited_body(resp, CHEMBL_API).await?;
        if !status.is_success() {
            let excerpt = crate::sources::body_excerpt(&bytes);
            return Err(RepurposeError::Api {
                api: CHEMBL_API.to_string(),
                message: format!("HTTP {status}: {excerpt}"),
            });
        }
        let parsed: MechanismsResponse =
            serde_json::from_slice(&bytes).map_err(|source| RepurposeError::ApiJson {
                api: CHEMBL_API.to_string(),
                source,
            })?;
        Ok(parsed.mechanisms)
    }

    pub async fn molecule(&self, chembl_id: &str) -> Result<Option<MoleculeDetail>, RepurposeError> {
        let url = self.endpoint(&format!("molecule/{chembl_id}.json"));
        let req = self.client.get(&url);
        let resp = crate::sources::guarded_send(CHEMBL_API, req).await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let status = resp.status();
        let bytes = crate::sources::read_limited_body(resp, CHEMBL_API).await?;
        if !status.is_success() {
            return Ok(None);
        }
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| RepurposeError::ApiJson {
                api: CHEMBL_API.to_string(),
                source,
            })
    }
}

#[derive(Debug, Deserialize)]
struct MechanismsResponse {
    #[serde(default)]
    mechanisms: Vec<MechanismRow>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn molecule_returns_none_on_404() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/molecule/CHEMBL999999.json"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = ChemblClient::new_for_test(server.uri()).unwrap();
        assert!(client.molecule("CHEMBL999999").await.unwrap().is_none());
    }
}
