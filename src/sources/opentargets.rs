//! Target-association DB client (spec §4.5, §4.6): GraphQL POST, grounded
//! on the teacher's REST client shape generalized to a JSON-body POST
//! (`reqwest_middleware::ClientWithMiddleware::post(...).json(...)`).

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::RepurposeError;

const OT_BASE: &str = "https://api.platform.opentargets.org/api/v4/graphql";
const OT_API: &str = "opentargets";
const OT_BASE_ENV: &str = "REPURPOSER_OPENTARGETS_BASE";

#[derive(Clone)]
pub struct OpenTargetsClient {
    client: reqwest_middleware::ClientWithMiddleware,
    base: Cow<'static, str>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssociatedTargetRow {
    pub target_id: String,
    pub approved_symbol: String,
    pub biotype: String,
    pub score: f64,
    /// datatype id -> score, spec §4.5 step 2 "evidence_diversity".
    pub datatype_scores: Vec<(String, f64)>,
    /// spec §4.5 step 2 tractability modality mapping input.
    pub tractability_labels: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnownDrugRow {
    pub drug_id: String,
    pub drug_name: String,
    pub drug_type: String,
    /// row-level trial phase for this target/disease pairing.
    pub phase: Option<u8>,
    /// max observed clinical phase across all of the drug's trials.
    pub maximum_clinical_trial_phase: Option<u8>,
    pub mechanism_of_action: Option<String>,
    pub disease_name: Option<String>,
}

impl OpenTargetsClient {
    pub fn new() -> Result<Self, RepurposeError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: crate::sources::env_base(OT_BASE, OT_BASE_ENV),
        })
    }

    #[cfg(test)]
    fn new_for_test(base: String) -> Result<Self, RepurposeError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: Cow::Owned(base),
        })
    }

    async fn graphql<T: serde::de::DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, RepurposeError> {
        let body = json!({ "query": query, "variables": variables });
        let req = self.client.post(self.base.as_ref()).json(&body);
        let resp = crate::sources::guarded_send(OT_API, req).await?;
        let status = resp.status();
        let bytes = crate::sources::read_limited_body(resp, OT_API).await?;
        if !status.is_success() {
            let excerpt = crate::sources::body_excerpt(&bytes);
            return Err(RepurposeError::Api {
                api: OT_API.to_string(),
                message: format!("HTTP {status}: {excerpt}"),
            });
        }
        let envelope: GraphQlEnvelope<T> =
            serde_json::from_slice(&bytes).map_err(|source| RepurposeError::ApiJson {
                api: OT_API.to_string(),
                source,
            })?;
        if let Some(errors) = envelope.errors.filter(|e| !e.is_empty()) {
            let message = errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(RepurposeError::Api {
                api: OT_API.to_string(),
                message,
            });
        }
        envelope.data.ok_or_else(|| RepurposeError::Api {
            api: OT_API.to_string(),
            message: "GraphQL response carried no data".to_string(),
        })
    }

    /// spec §4.5 step 1: one page of disease-associated targets, page_size
    /// up to 100, selected by `index`.
    pub async fn disease_targets_page(
        &self,
        efo_id: &str,
        index: u32,
        size: u32,
    ) -> Result<Vec<AssociatedTargetRow>, RepurposeError> {
        const QUERY: &str = r#"
            query DiseaseTargets($efoId: String!, $index: Int!, $size: Int!) {
              disease(efoId: $efoId) {
                associatedTargets(page: { index: $index, size: $size }) {
                  rows {
                    score
                    target {
                      id
                      approvedSymbol
                      biotype
                      tractability { label modality value }
                    }
                    datatypeScores { id score }
                  }
                }
              }
            }"#;
        let data: DiseaseTargetsData = self
            .graphql(
                QUERY,
                json!({ "efoId": efo_id, "index": index, "size": size }),
            )
            .await?;
        Ok(data
            .disease
            .map(|d| d.associated_targets.rows)
            .unwrap_or_default()
            .into_iter()
            .map(|r| AssociatedTargetRow {
                target_id: r.target.id,
                approved_symbol: r.target.approved_symbol,
                biotype: r.target.biotype,
                score: r.score,
                datatype_scores: r
                    .datatype_scores
                    .into_iter()
                    .map(|d| (d.id, d.score))
                    .collect(),
                // spec §4.5 step 2: small-molecule (SM) modality tractability
                // only, matching ingest_opentargets.py's filter.
                tractability_labels: r
                    .target
                    .tractability
                    .into_iter()
                    .filter(|t| t.modality == "SM")
                    .map(|t| t.value)
                    .collect(),
            })
            .collect())
    }

    /// spec §4.6 step 1: all drugs known to modulate `ensembl_id`, any
    /// indication, size 100.
    pub async fn known_drugs_for_target(
        &self,
        ensembl_id: &str,
    ) -> Result<Vec<KnownDrugRow>, RepurposeError> {
        const QUERY: &str = r#"
            query TargetKnownDrugs($ensemblId: String!, $size: Int!) {
              target(ensemblId: $ensemblId) {
                knownDrugs(size: $size) {
                  rows {
                    drugId
                    prefName
                    drugType
                    phase
                    mechanismOfAction
                    disease { name }
                    drug { maximumClinicalTrialPhase }
                  }
                }
              }
            }"#;
        let data: TargetKnownDrugsData = self
            .graphql(QUERY, json!({ "ensemblId": ensembl_id, "size": 100 }))
            .await?;
        Ok(data
            .target
            .map(|t| t.known_drugs.rows)
            .unwrap_or_default()
            .into_iter()
            .map(|r| KnownDrugRow {
                drug_id: r.drug_id,
                drug_name: r.pref_name,
                drug_type: r.drug_type,
                phase: r.phase.map(|p| p.round().clamp(0.0, 4.0) as u8),
                maximum_clinical_trial_phase: r
                    .drug
                    .and_then(|d| d.maximum_clinical_trial_phase)
                    .map(|p| p.round().clamp(0.0, 4.0) as u8),
                mechanism_of_action: r.mechanism_of_action,
                disease_name: r.disease.and_then(|d| d.name),
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlEnvelope<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiseaseTargetsData {
    disease: Option<DiseaseNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiseaseNode {
    associated_targets: AssociatedTargetsConnection,
}

#[derive(Debug, Deserialize)]
struct AssociatedTargetsConnection {
    #[serde(default)]
    rows: Vec<AssociatedTargetRowWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssociatedTargetRowWire {
    score: f64,
    target: TargetNodeWire,
    #[serde(default)]
    datatype_scores: Vec<DatatypeScoreWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TargetNodeWire {
    id: String,
    approved_symbol: String,
    biotype: String,
    #[serde(default)]
    tractability: Vec<TractabilityWire>,
}

#[derive(Debug, Deserialize)]
struct TractabilityWire {
    modality: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct DatatypeScoreWire {
    id: String,
    score: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TargetKnownDrugsData {
    target: Option<TargetKnownDrugsNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TargetKnownDrugsNode {
    known_drugs: KnownDrugsConnection,
}

#[derive(Debug, Deserialize)]
struct KnownDrugsConnection {
    #[serde(default)]
    rows: Vec<KnownDrugRowWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KnownDrugRowWire {
    drug_id: String,
    pref_name: String,
    drug_type: String,
    phase: Option<f64>,
    mechanism_of_action: Option<String>,
    disease: Option<DiseaseNameWire>,
    drug: Option<DrugMaxPhaseWire>,
}

#[derive(Debug, Deserialize)]
struct DiseaseNameWire {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DrugMaxPhaseWire {
    maximum_clinical_trial_phase: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn disease_targets_page_parses_rows() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {
                    "disease": {
                        "associatedTargets": {
                            "rows": [{
                                "score": 0.82,
                                "target": {"id": "ENSG00000157764", "approvedSymbol": "BRAF", "biotype": "protein_coding"},
                                "datatypeScores": [{"id": "genetic_association", "score": 0.5}]
                            }]
                        }
                    }
                }
            })))
            .mount(&server)
            .await;

        let client = OpenTargetsClient::new_for_test(server.uri()).unwrap();
        let rows = client.disease_targets_page("EFO_0000756", 0, 100).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].approved_symbol, "BRAF");
        assert_eq!(rows[0].datatype_scores[0].1, 0.5);
    }

    #[tokio::test]
    async fn disease_targets_page_keeps_only_small_molecule_tractability_values() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {
                    "disease": {
                        "associatedTargets": {
                            "rows": [{
                                "score": 0.82,
                                "target": {
                                    "id": "ENSG00000157764",
                                    "approvedSymbol": "BRAF",
                                    "biotype": "protein_coding",
                                    "tractability": [
                                        {"label": "Approved Drug", "modality": "SM", "value": "Approved"},
                                        {"label": "Clinical antibody", "modality": "AB", "value": "Approved"}
                                    ]
                                },
                                "datatypeScores": [{"id": "genetic_association", "score": 0.5}]
                            }]
                        }
                    }
                }
            })))
            .mount(&server)
            .await;

        let client = OpenTargetsClient::new_for_test(server.uri()).unwrap();
        let rows = client.disease_targets_page("EFO_0000756", 0, 100).await.unwrap();
        assert_eq!(rows[0].tractability_labels, vec!["Approved".to_string()]);
    }

    #[tokio::test]
    async fn graphql_errors_surface_as_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "errors": [{"message": "disease not found"}]
            })))
            .mount(&server)
            .await;

        let client = OpenTargetsClient::new_for_test(server.uri()).unwrap();
        let err = client
            .disease_targets_page("EFO_bogus", 0, 100)
            .await
            .expect_err("graphql error should surface");
        assert!(err.to_string().contains("disease not found"));
    }
}
