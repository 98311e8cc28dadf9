//! Protein interaction DB client (STRING-shaped REST, spec §6):
//! confidence-thresholded interaction network, used to enrich a target's
//! evidence diversity signal during discovery.

use std::borrow::Cow;

use serde::Deserialize;

use crate::error::RepurposeError;

const STRING_BASE: &str = "https://string-db.org/api";
const STRING_API: &str = "string_db";
const STRING_BASE_ENV: &str = "REPURPOSER_STRING_BASE";

/// spec default: only interactions at or above "high confidence" (0.7).
const MIN_SCORE: f64 = 0.7;

#[derive(Clone)]
pub struct StringDbClient {
    client: reqwest_middleware::ClientWithMiddleware,
    base: Cow<'static, str>,
}

#[derive(Debug, Clone)]
pub struct InteractionPartner {
    pub partner_symbol: String,
    pub combined_score: f64,
}

impl StringDbClient {
    pub fn new() -> Result<Self, RepurposeError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: crate::sources::env_base(STRING_BASE, STRING_BASE_ENV),
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

    pub async fn interaction_partners(
        &self,
        gene_symbol: &str,
    ) -> Result<Vec<InteractionPartner>, RepurposeError> {
        let url = self.endpoint("json/interaction_partners");
        let req = self.client.get(&url).query(&[
            ("identifiers", gene_symbol),
            ("species", "9606"),
            ("required_score", "700"),
        ]);
        let resp = crate::sources::guarded_send(STRING_API, req).await?;
        if !resp.status().is_success() {
            return Ok(Vec::new());
        }
        let bytes = crate::sources::read_limited_body(resp, STRING_API).await?;
        let rows: Vec<StringInteractionRow> = match serde_json::from_slice(&bytes) {
            Ok(v) => v,
            Err(_) => return Ok(Vec::new()),
        };
        Ok(rows
            .into_iter()
            .filter(|r| r.score >= MIN_SCORE)
            .map(|r| InteractionPartner {
                partner_symbol: r.preferred_name_b,
                combined_score: r.score,
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct StringInteractionRow {
    #[serde(rename = "preferredName_B")]
    preferred_name_b: String,
    score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn interaction_partners_filters_below_threshold() {
        let server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(200).set_body_json(
            serde_json::json!([
                {"preferredName_B": "MEK1", "score": 0.95},
                {"preferredName_B": "WEAK", "score": 0.2}
            ]),
        ))
        .mount(&server)
        .await;

        let client = StringDbClient::new_for_test(server.uri()).unwrap();
        let partners = client.interaction_partners("BRAF").await.unwrap();
        assert_eq!(partners.len(), 1);
        assert_eq!(partners[0].partner_symbol, "MEK1");
    }
}
