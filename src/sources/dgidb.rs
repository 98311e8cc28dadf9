//! Gene-drug interaction DB client (GraphQL POST, spec §6). Supplements
//! target characterization with known drug-gene interaction counts.

use std::borrow::Cow;

use serde::Deserialize;
use serde_json::json;

use crate::error::RepurposeError;

const DGIDB_BASE: &str = "https://dgidb.org/api/graphql";
const DGIDB_API: &str = "dgidb";
const DGIDB_BASE_ENV: &str = "REPURPOSER_DGIDB_BASE";

#[derive(Clone)]
pub struct DgidbClient {
    client: reqwest_middleware::ClientWithMiddleware,
    base: Cow<'static, str>,
}

#[derive(Debug, Clone)]
pub struct GeneInteraction {
    pub drug_name: String,
    pub interaction_types: Vec<String>,
    pub source: Option<String>,
}

impl DgidbClient {
    pub fn new() -> Result<Self, RepurposeError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: crate::sources::env_base(DGIDB_BASE, DGIDB_BASE_ENV),
        })
    }

    #[cfg(test)]
    fn new_for_test(base: String) -> Result<Self, RepurposeError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: Cow::Owned(base),
        })
    }

    pub async fn interactions_for_gene(
        &self,
        gene_symbol: &str,
    ) -> Result<Vec<GeneInteraction>, RepurposeError> {
        const QUERY: &str = r#"
            query GeneInteractions($names: [String!]) {
              genes(names: $names) {
                nodes {
                  interactions {
                    drug { name }
                    interactionTypes { type }
                    sources { sourceDbName }
                  }
                }
              }
            }"#;
        let body = json!({ "query": QUERY, "variables": { "names": [gene_symbol] } });
        let req = self.client.post(self.base.as_ref()).json(&body);
        let resp = crate::sources::guarded_send(DGIDB_API, req).await?;
        if !resp.status().is_success() {
            return Ok(Vec::new());
        }
        let bytes = crate::sources::read_limited_body(resp, DGIDB_API).await?;
        let parsed: DgidbResponse = match serde_json::from_slice(&bytes) {
            Ok(v) => v,
            Err(_) => return Ok(Vec::new()),
        };
        Ok(parsed
            .data
            .map(|d| d.genes.nodes)
            .unwrap_or_default()
            .into_iter()
            .flat_map(|n| n.interactions)
            .map(|i| GeneInteraction {
                drug_name: i.drug.name,
                interaction_types: i.interaction_types.into_iter().map(|t| t.r#type).collect(),
                source: i.sources.into_iter().next().map(|s| s.source_db_name),
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct DgidbResponse {
    data: Option<DgidbData>,
}

#[derive(Debug, Deserialize)]
struct DgidbData {
    genes: DgidbGenesConnection,
}

#[derive(Debug, Deserialize)]
struct DgidbGenesConnection {
    #[serde(default)]
    nodes: Vec<DgidbGeneNode>,
}

#[derive(Debug, Deserialize)]
struct DgidbGeneNode {
    #[serde(default)]
    interactions: Vec<DgidbInteraction>,
}

#[derive(Debug, Deserialize)]
struct DgidbInteraction {
    drug: DgidbDrug,
    #[serde(rename = "interactionTypes", default)]
    interaction_types: Vec<DgidbInteractionType>,
    #[serde(default)]
    sources: Vec<DgidbSource>,
}

#[derive(Debug, Deserialize)]
struct DgidbDrug {
    name: String,
}

#[derive(Debug, Deserialize)]
struct DgidbInteractionType {
    r#type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DgidbSource {
    source_db_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn interactions_for_gene_parses_nested_nodes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {
                    "genes": {
                        "nodes": [{
                            "interactions": [{
                                "drug": {"name": "Vemurafenib"},
                                "interactionTypes": [{"type": "inhibitor"}],
                                "sources": [{"sourceDbName": "DrugBank"}]
                            }]
                        }]
                    }
                }
            })))
            .mount(&server)
            .await;

        let client = DgidbClient::new_for_test(server.uri()).unwrap();
        let rows = client.interactions_for_gene("BRAF").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].drug_name, "Vemurafenib");
    }
}
