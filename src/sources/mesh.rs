//! MeSH lookup client (spec §4.3 step 3, §4.4 step 1). Adapted from the
//! teacher's REST-client shape.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::error::RepurposeError;

const MESH_BASE: &str = "https://id.nlm.nih.gov/mesh";
const MESH_API: &str = "mesh";
const MESH_BASE_ENV: &str = "REPURPOSER_MESH_BASE";

#[derive(Clone)]
pub struct MeshClient {
    client: reqwest_middleware::ClientWithMiddleware,
    base: Cow<'static, str>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshHit {
    pub descriptor_ui: String,
    pub label: String,
    pub tree_numbers: Vec<String>,
}

impl MeshClient {
    pub fn new() -> Result<Self, RepurposeError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: crate::sources::env_base(MESH_BASE, MESH_BASE_ENV),
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

    /// Resolves free text to the best-matching MeSH descriptor, if any.
    pub async fn lookup(&self, term: &str) -> Result<Option<MeshHit>, RepurposeError> {
        let url = self.endpoint("lookup/descriptor");
        let req = self
            .client
            .get(&url)
            .query(&[("label", term), ("match", "contains"), ("limit", "1")]);
        let resp = crate::sources::guarded_send(MESH_API, req).await?;
        if !resp.status().is_success() {
            return Ok(None);
        }
        let bytes = crate::sources::read_limited_body(resp, MESH_API).await?;
        let rows: Vec<MeshLookupRow> = match serde_json::from_slice(&bytes) {
            Ok(v) => v,
            Err(_) => return Ok(None),
        };
        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };

        let tree_numbers = self.tree_numbers(&row.resource).await.unwrap_or_default();
        Ok(Some(MeshHit {
            descriptor_ui: row.resource.rsplit('/').next().unwrap_or_default().to_string(),
            label: row.label,
            tree_numbers,
        }))
    }

    async fn tree_numbers(&self, descriptor_uri: &str) -> Result<Vec<String>, RepurposeError> {
        let req = self.client.get(format!("{descriptor_uri}.json"));
        let resp = crate::sources::guarded_send(MESH_API, req).await?;
        if !resp.status().is_success() {
            return Ok(Vec::new());
        }
        let bytes = crate::sources::read_limited_body(resp, MESH_API).await?;
        let parsed: MeshDescriptor = match serde_json::from_slice(&bytes) {
            Ok(v) => v,
            Err(_) => return Ok(Vec::new()),
        };
        Ok(parsed.tree_number_list.unwrap_or_default())
    }
}

#[derive(Debug, Deserialize)]
struct MeshLookupRow {
    resource: String,
    label: String,
}

#[derive(Debug, Deserialize)]
struct MeshDescriptor {
    #[serde(rename = "treeNumberList", default)]
    tree_number_list: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn lookup_returns_none_when_no_match() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lookup/descriptor"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let client = MeshClient::new_for_test(server.uri()).unwrap();
        assert!(client.lookup("nonexistent disease").await.unwrap().is_none());
    }
}
