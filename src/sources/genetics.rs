//! Gene–disease association DB client (spec §4.5 step 5a): returns an
//! association score in [0,1] used as the first independent-evidence term
//! in target validation.

use std::borrow::Cow;

use serde::Deserialize;

use crate::error::RepurposeError;

const GENETICS_BASE: &str = "https://api.genetics.opentargets.org/graphql";
const GENETICS_API: &str = "genetics";
const GENETICS_BASE_ENV: &str = "REPURPOSER_GENETICS_BASE";

#[derive(Clone)]
pub struct GeneticsClient {
    client: reqwest_middleware::ClientWithMiddleware,
    base: Cow<'static, str>,
}

impl GeneticsClient {
    pub fn new() -> Result<Self, RepurposeError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: crate::sources::env_base(GENETICS_BASE, GENETICS_BASE_ENV),
        })
    }

    #[cfg(test)]
    fn new_for_test(base: String) -> Result<Self, RepurposeError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: Cow::Owned(base),
        })
    }

    /// Gene–disease association score in [0,1]; `0.0` when no association
    /// row is returned rather than an error (spec §4.5 step 5: "a" term of
    /// the independent evidence composite).
    pub async fn association_score(
        &self,
        ensembl_id: &str,
        efo_id: &str,
    ) -> Result<f64, RepurposeError> {
        let body = serde_json::json!({
            "query": r#"
                query Assoc($ensemblId: String!, $efoId: String!) {
                  genetics: disease(efoId: $efoId) {
                    target(ensemblId: $ensemblId) { overallScore: score }
                  }
                }"#,
            "variables": { "ensemblId": ensembl_id, "efoId": efo_id },
        });
        let req = self.client.post(self.base.as_ref()).json(&body);
        let resp = crate::sources::guarded_send(GENETICS_API, req).await?;
        if !resp.status().is_success() {
            return Ok(0.0);
        }
        let bytes = crate::sources::read_limited_body(resp, GENETICS_API).await?;
        let parsed: AssociationResponse = match serde_json::from_slice(&bytes) {
            Ok(v) => v,
            Err(_) => return Ok(0.0),
        };
        Ok(parsed
            .data
            .and_then(|d| d.genetics)
            .and_then(|g| g.target)
            .map(|t| t.overall_score)
            .unwrap_or(0.0)
            .clamp(0.0, 1.0))
    }
}

#[derive(Debug, Deserialize)]
struct AssociationResponse {
    data: Option<AssociationData>,
}

#[derive(Debug, Deserialize)]
struct AssociationData {
    genetics: Option<AssociationDisease>,
}

#[derive(Debug, Deserialize)]
struct AssociationDisease {
    target: Option<AssociationTarget>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssociationTarget {
    #[serde(rename = "overallScore")]
    overall_score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn association_score_defaults_to_zero_on_missing_target() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": { "genetics": { "target": null } }
            })))
            .mount(&server)
            .await;

        let client = GeneticsClient::new_for_test(server.uri()).unwrap();
        let score = client.association_score("ENSG1", "EFO_1").await.unwrap();
        assert_eq!(score, 0.0);
    }
}
