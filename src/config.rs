//! Process-wide configuration, read once from the environment at startup.
//!
//! Grounded on the teacher's `crate::sources::env_base(default, ENV_NAME)`
//! convention (see `sources::env_base`): every collaborator base URL has a
//! hard-coded default and an env-var override. Everything else (cache/data
//! directories, timeouts, call budget) follows the same pattern.

use std::borrow::Cow;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub ontology_base: Cow<'static, str>,
    pub mesh_base: Cow<'static, str>,
    pub opentargets_base: Cow<'static, str>,
    pub chembl_base: Cow<'static, str>,
    pub dgidb_base: Cow<'static, str>,
    pub reactome_base: Cow<'static, str>,
    pub string_db_base: Cow<'static, str>,
    pub genetics_base: Cow<'static, str>,
    pub uniprot_base: Cow<'static, str>,
    pub clinical_trials_base: Cow<'static, str>,
    pub web_search_base: Cow<'static, str>,
    pub web_search_api_key: Option<String>,
    pub literature_base: Cow<'static, str>,
    pub llm_base: Cow<'static, str>,
    pub llm_api_key: Option<String>,
    pub llm_model: String,
    pub graph_uri: String,
    pub graph_user: String,
    pub graph_password: String,
    pub graph_database: String,
    pub cache_dir: PathBuf,
    pub data_dir: PathBuf,
    pub http_timeout: Duration,
    pub max_external_calls_per_run: u32,
    pub max_candidates: usize,
}

fn env_or(name: &str, default: &'static str) -> Cow<'static, str> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Cow::Owned(v),
        _ => Cow::Borrowed(default),
    }
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_path(name: &str, fallback: PathBuf) -> PathBuf {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or(fallback)
}

fn env_u32(name: &str, default: u32) -> u32 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        let cache_default = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("repurposer");
        let data_default = dirs::data_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("repurposer");

        Self {
            ontology_base: env_or("REPURPOSER_OLS_BASE", "https://www.ebi.ac.uk/ols4/api"),
            mesh_base: env_or("REPURPOSER_MESH_BASE", "https://id.nlm.nih.gov/mesh"),
            opentargets_base: env_or(
                "REPURPOSER_OPENTARGETS_BASE",
                "https://api.platform.opentargets.org/api/v4/graphql",
            ),
            chembl_base: env_or("REPURPOSER_CHEMBL_BASE", "https://www.ebi.ac.uk/chembl/api/data"),
            dgidb_base: env_or("REPURPOSER_DGIDB_BASE", "https://dgidb.org/api/graphql"),
            reactome_base: env_or(
                "REPURPOSER_REACTOME_BASE",
                "https://reactome.org/ContentService",
            ),
            string_db_base: env_or("REPURPOSER_STRING_BASE", "https://string-db.org/api"),
            genetics_base: env_or(
                "REPURPOSER_GENETICS_BASE",
                "https://api.opentargets.org/api/v4/graphql",
            ),
            uniprot_base: env_or("REPURPOSER_UNIPROT_BASE", "https://rest.uniprot.org"),
            clinical_trials_base: env_or(
                "REPURPOSER_CTGOV_BASE",
                "https://clinicaltrials.gov/api/v2",
            ),
            web_search_base: env_or(
                "REPURPOSER_WEB_SEARCH_BASE",
                "https://api.search.example/v1/search",
            ),
            web_search_api_key: env_opt("REPURPOSER_WEB_SEARCH_KEY"),
            literature_base: env_or(
                "REPURPOSER_LITERATURE_BASE",
                "https://www.ebi.ac.uk/europepmc/webservices/rest",
            ),
            llm_base: env_or(
                "REPURPOSER_LLM_BASE",
                "https://api.llm.example/v1/chat/completions",
            ),
            llm_api_key: env_opt("REPURPOSER_LLM_API_KEY"),
            llm_model: std::env::var("REPURPOSER_LLM_MODEL")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| "default".to_string()),
            graph_uri: std::env::var("REPURPOSER_GRAPH_URI")
                .unwrap_or_else(|_| "bolt://localhost:7687".to_string()),
            graph_user: std::env::var("REPURPOSER_GRAPH_USER").unwrap_or_else(|_| "neo4j".to_string()),
            graph_password: std::env::var("REPURPOSER_GRAPH_PASSWORD").unwrap_or_default(),
            graph_database: std::env::var("REPURPOSER_GRAPH_DATABASE")
                .unwrap_or_else(|_| "neo4j".to_string()),
            cache_dir: env_path("REPURPOSER_CACHE_DIR", cache_default),
            data_dir: env_path("REPURPOSER_DATA_DIR", data_default),
            http_timeout: Duration::from_secs(env_u64("REPURPOSER_HTTP_TIMEOUT_SECS", 20)),
            max_external_calls_per_run: env_u32("REPURPOSER_MAX_CALLS_PER_RUN", 2000),
            max_candidates: env_u32("REPURPOSER_MAX_CANDIDATES", 50) as usize,
        }
    }
}
