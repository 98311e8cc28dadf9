//! Shared HTTP client construction, retry policy, and body-handling helpers
//! used by every collaborator client in this module. Grounded on the call
//! sites in the teacher's `src/sources/clinicaltrials.rs` and
//! `src/sources/uniprot.rs` (`crate::sources::shared_client`,
//! `crate::sources::streaming_http_client`, `crate::sources::env_base`,
//! `crate::sources::apply_cache_mode`, `crate::sources::read_limited_body`,
//! `crate::sources::body_excerpt`, `crate::sources::retry_send`), which
//! reference this module's contract without being present themselves in
//! the retrieval pack.

pub mod chembl;
pub mod clinical_trials;
pub mod dgidb;
pub mod genetics;
pub mod graphdb;
pub mod literature;
pub mod llm;
pub mod mesh;
pub mod ontology;
pub mod opentargets;
pub mod rate_limit;
pub mod reactome;
pub mod string_db;
pub mod uniprot;
pub mod web_search;

use std::borrow::Cow;
use std::future::Future;
use std::time::Duration;

use rand::Rng as _;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};

use crate::error::RepurposeError;

/// Maximum response body size read into memory for any single collaborator
/// call (16 MiB). Collaborators that legitimately return more (none do
/// today) would need a streaming path; this cap exists so a misbehaving
/// endpoint can't exhaust memory.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Resolves a base URL: the caller's hard-coded default unless the named
/// environment variable is set to a non-empty value. Mirrors the teacher's
/// `env_base(default, env_name)` helper.
pub fn env_base(default: &'static str, env_name: &str) -> Cow<'static, str> {
    match std::env::var(env_name) {
        Ok(v) if !v.trim().is_empty() => Cow::Owned(v),
        _ => Cow::Borrowed(default),
    }
}

/// One connection-pooled client per collaborator, each built fresh by its
/// owning module (spec §9: "never share a client across collaborators
/// because timeouts and headers differ"). This function just applies the
/// shared retry middleware everyone wants.
pub fn shared_client() -> Result<ClientWithMiddleware, RepurposeError> {
    let inner = reqwest::Client::builder()
        .timeout(Duration::from_secs(20))
        .connect_timeout(Duration::from_secs(10))
        .user_agent(concat!("repurposer/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(RepurposeError::HttpClientInit)?;

    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(2);
    Ok(ClientBuilder::new(inner)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build())
}

/// Plain `reqwest::Client` for collaborators that need direct control over
/// streaming/decompression (e.g. UniProt's manual gzip handling).
pub fn streaming_http_client() -> Result<reqwest::Client, RepurposeError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(20))
        .connect_timeout(Duration::from_secs(10))
        .user_agent(concat!("repurposer/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(RepurposeError::HttpClientInit)
}

/// No-op passthrough: the teacher's `apply_cache_mode` toggles its
/// transport-level `http-cache-reqwest` layer on/off per the CLI's
/// `--no-cache` flag. This crate's caching is the content-addressed cache
/// (`crate::cache`, spec §4.1) sitting a layer above individual HTTP calls,
/// so there is no transport-level cache to toggle; this hook only exists
/// for call-site symmetry with the teacher's client shape.
pub fn apply_cache_mode(req: reqwest_middleware::RequestBuilder) -> reqwest_middleware::RequestBuilder {
    req
}

/// Circuit-breaker guard for collaborators built on `shared_client()`: their
/// retry-on-transient-failure already comes from `reqwest-retry`'s own
/// middleware, so this only enforces the rate-limiter gap and the breaker
/// short-circuit (spec §4.2, §8) before handing the request to middleware.
pub async fn guarded_send(
    api: &str,
    req: reqwest_middleware::RequestBuilder,
) -> Result<reqwest::Response, RepurposeError> {
    if !rate_limit::take_call_budget() {
        return Err(RepurposeError::Api {
            api: api.to_string(),
            message: "max external calls per run exhausted, skipping call".to_string(),
        });
    }
    rate_limit::wait_for_api(api).await;
    if rate_limit::is_open(api) {
        return Err(RepurposeError::Api {
            api: api.to_string(),
            message: "circuit breaker open, skipping call".to_string(),
        });
    }
    match req.send().await {
        Ok(resp) => {
            rate_limit::record_success(api);
            Ok(resp)
        }
        Err(err) => {
            rate_limit::record_failure(api);
            Err(err.into())
        }
    }
}

pub async fn read_limited_body(resp: reqwest::Response, api: &str) -> Result<bytes::Bytes, RepurposeError> {
    if let Some(len) = resp.content_length()
        && len as usize > MAX_BODY_BYTES
    {
        return Err(RepurposeError::Api {
            api: api.to_string(),
            message: format!("response too large ({len} bytes)"),
        });
    }
    resp.bytes().await.map_err(|err| RepurposeError::Api {
        api: api.to_string(),
        message: err.to_string(),
    })
}

pub fn body_excerpt(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim();
    if trimmed.len() > 200 {
        format!("{}…", &trimmed[..200])
    } else {
        trimmed.to_string()
    }
}

/// Retries `send` with exponential backoff (base ≥2s, cap 8–15s) up to
/// `attempts` tries, short-circuiting immediately (no network I/O) if `api`'s
/// circuit breaker is open (spec §4.2, §8). Records success/failure against
/// the breaker after every attempt.
pub async fn retry_send<F, Fut>(
    api: &str,
    attempts: u32,
    mut send: F,
) -> Result<reqwest::Response, RepurposeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    rate_limit::wait_for_api(api).await;

    if rate_limit::is_open(api) {
        return Err(RepurposeError::Api {
            api: api.to_string(),
            message: "circuit breaker open, skipping call".to_string(),
        });
    }

    let attempts = attempts.max(1);
    let mut last_err: Option<RepurposeError> = None;

    for attempt in 0..attempts {
        if !rate_limit::take_call_budget() {
            return Err(RepurposeError::Api {
                api: api.to_string(),
                message: "max external calls per run exhausted, skipping call".to_string(),
            });
        }
        match send().await {
            Ok(resp) => {
                rate_limit::record_success(api);
                return Ok(resp);
            }
            Err(err) => {
                rate_limit::record_failure(api);
                last_err = Some(err.into());
                if attempt + 1 < attempts {
                    let backoff = backoff_for_attempt(attempt);
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    Err(last_err.unwrap_or_else(|| RepurposeError::Api {
        api: api.to_string(),
        message: "request failed with no captured error".to_string(),
    }))
}

fn backoff_for_attempt(attempt: u32) -> Duration {
    let base_secs = 2.0_f64;
    let cap_secs = 12.0_f64;
    let exp = base_secs * 2f64.powi(attempt as i32);
    let capped = exp.min(cap_secs);
    let jitter = rand::rng().random_range(0.0..capped * 0.25);
    Duration::from_secs_f64(capped + jitter)
}
