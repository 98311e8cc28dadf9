//! Crate-wide error type.
//!
//! Mirrors the shape the teacher's source clients lean on: a handful of
//! named variants keyed by collaborator, plus a couple of infrastructure
//! variants (`Io`, `Cache`, `GraphDb`, `HttpClientInit`, `Config`). Every
//! collaborator call site converts transport/parse failures into one of
//! these; per spec §7, a single collaborator's failure must never crash the
//! run, so call sites catch `RepurposeError` and fall back to a structured
//! empty result rather than propagating past a stage boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepurposeError {
    #[error("{api}: {message}")]
    Api { api: String, message: String },

    #[error("{api}: invalid JSON response: {source}")]
    ApiJson {
        api: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{entity} not found: {id}{}", suggestion.as_deref().map(|s| format!(" ({s})")).unwrap_or_default())]
    NotFound {
        entity: String,
        id: String,
        suggestion: Option<String>,
    },

    #[error("failed to initialize HTTP client: {0}")]
    HttpClientInit(#[source] reqwest::Error),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("graph database error: {0}")]
    GraphDb(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[source] std::io::Error),

    #[error("run not found: {0}")]
    RunNotFound(String),
}

impl From<std::io::Error> for RepurposeError {
    fn from(err: std::io::Error) -> Self {
        RepurposeError::Io(err)
    }
}

impl From<reqwest::Error> for RepurposeError {
    fn from(err: reqwest::Error) -> Self {
        RepurposeError::Api {
            api: err
                .url()
                .and_then(|u| u.host_str())
                .unwrap_or("unknown")
                .to_string(),
            message: err.to_string(),
        }
    }
}

impl From<reqwest_middleware::Error> for RepurposeError {
    fn from(err: reqwest_middleware::Error) -> Self {
        RepurposeError::Api {
            api: "http".to_string(),
            message: err.to_string(),
        }
    }
}
