//! `repurposer health` (spec §4.12): one HTTP probe per external
//! collaborator plus a cache/data-directory write check. Grounded on the
//! teacher's concurrent `tokio::join!` probe fan-out and Markdown table.

use std::time::Instant;

use crate::config::Config;
use crate::error::RepurposeError;

#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthRow {
    pub api: String,
    pub status: String,
    pub latency: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthReport {
    pub healthy: usize,
    pub total: usize,
    pub rows: Vec<HealthRow>,
}

impl HealthReport {
    pub fn all_healthy(&self) -> bool {
        self.healthy == self.total
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# Repurposer Health Check\n\n");
        out.push_str("| Collaborator | Status | Latency |\n");
        out.push_str("|--------------|--------|---------|\n");
        for row in &self.rows {
            out.push_str(&format!("| {} | {} | {} |\n", row.api, row.status, row.latency));
        }
        out.push_str(&format!("\nStatus: {}/{} collaborators healthy\n", self.healthy, self.total));
        out
    }
}

async fn check_one(client: &reqwest::Client, api: &str, url: &str) -> HealthRow {
    let start = Instant::now();
    let resp = client.get(url).header(reqwest::header::ACCEPT, "application/json").send().await;
    let elapsed = start.elapsed().as_millis();

    match resp {
        Ok(resp) if resp.status().is_success() => {
            HealthRow { api: api.to_string(), status: "ok".into(), latency: format!("{elapsed}ms") }
        }
        Ok(resp) => HealthRow {
            api: api.to_string(),
            status: "error".into(),
            latency: format!("{elapsed}ms (HTTP {})", resp.status().as_u16()),
        },
        Err(err) => {
            let reason = if err.is_timeout() { "timeout" } else if err.is_connect() { "connect" } else { "error" };
            HealthRow { api: api.to_string(), status: "error".into(), latency: reason.into() }
        }
    }
}

async fn check_directory(label: &str, dir: &std::path::Path) -> HealthRow {
    let start = Instant::now();
    let suffix = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap_or_default().as_nanos();
    let probe = dir.join(format!(".repurposer-healthcheck-{suffix}.tmp"));

    let result = async {
        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(&probe, b"ok").await?;
        tokio::fs::remove_file(&probe).await
    }
    .await;

    match result {
        Ok(()) => HealthRow { api: format!("{label} ({})", dir.display()), status: "ok".into(), latency: format!("{}ms", start.elapsed().as_millis()) },
        Err(err) => HealthRow { api: format!("{label} ({})", dir.display()), status: "error".into(), latency: format!("{:?}", err.kind()) },
    }
}

fn health_http_client(config: &Config) -> Result<reqwest::Client, RepurposeError> {
    reqwest::Client::builder()
        .timeout(config.http_timeout)
        .user_agent(concat!("repurposer/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(RepurposeError::HttpClientInit)
}

/// Probes every external collaborator concurrently plus the cache/data
/// directories; never fails the CLI invocation itself (spec §7's
/// never-crash-on-a-single-collaborator-failure rule applies to health
/// checks too — an unreachable collaborator is a row, not an error).
pub async fn check(config: &Config) -> Result<HealthReport, RepurposeError> {
    let client = health_http_client(config)?;

    let (ontology, mesh, opentargets, reactome, genetics, uniprot, clinical_trials, literature, web_search) = tokio::join!(
        check_one(&client, "Ontology (OLS)", &format!("{}/ontologies/efo", config.ontology_base)),
        check_one(&client, "MeSH", &format!("{}/lookup/term?label=cancer&match=exact", config.mesh_base)),
        check_one(&client, "Open Targets", &config.opentargets_base),
        check_one(&client, "Reactome", &format!("{}/data/pathways/top/9606", config.reactome_base)),
        check_one(&client, "Genetics", &config.genetics_base),
        check_one(&client, "UniProt", &format!("{}/uniprotkb/search?query=braf&size=1", config.uniprot_base)),
        check_one(&client, "ClinicalTrials.gov", &format!("{}/studies?pageSize=1", config.clinical_trials_base)),
        check_one(&client, "Literature (Europe PMC)", &format!("{}/search?query=cancer&format=json&pageSize=1", config.literature_base)),
        check_one(&client, "Web Search", &config.web_search_base),
    );

    let mut rows = vec![ontology, mesh, opentargets, reactome, genetics, uniprot, clinical_trials, literature, web_search];
    rows.push(check_directory("Cache dir", &config.cache_dir).await);
    rows.push(check_directory("Data dir", &config.data_dir).await);

    let healthy = rows.iter().filter(|r| r.status == "ok").count();
    Ok(HealthReport { healthy, total: rows.len(), rows })
}

#[cfg(test)]
mod tests {
    use super::{HealthReport, HealthRow};

    #[test]
    fn markdown_lists_every_row_and_summary() {
        let report = HealthReport {
            healthy: 1,
            total: 2,
            rows: vec![
                HealthRow { api: "Open Targets".into(), status: "ok".into(), latency: "10ms".into() },
                HealthRow { api: "Web Search".into(), status: "error".into(), latency: "timeout".into() },
            ],
        };
        let md = report.to_markdown();
        assert!(md.contains("| Open Targets | ok | 10ms |"));
        assert!(md.contains("Status: 1/2 collaborators healthy"));
    }

    #[test]
    fn all_healthy_true_only_when_every_row_ok() {
        let report = HealthReport { healthy: 2, total: 2, rows: vec![] };
        assert!(report.all_healthy());
        let report = HealthReport { healthy: 1, total: 2, rows: vec![] };
        assert!(!report.all_healthy());
    }
}
