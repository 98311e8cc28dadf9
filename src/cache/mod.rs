//! Content-addressed cache (spec §4.1).
//!
//! Key = hex digest of a canonicalized, key-sorted JSON encoding of
//! `{endpoint, params}`. `serde_json::Value::Object` is `BTreeMap`-backed
//! (this crate does not enable the `preserve_order` feature), so two
//! `Value`s built from the same keys in different insertion order serialize
//! identically — the determinism test in spec §8 falls out of that for
//! free rather than needing a manual sort pass.
//!
//! Reads are advisory: a miss, a corrupt file, or a read error all just
//! return `None`. Writes are best-effort: persistence errors are logged,
//! never raised, per spec §4.1/§7.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct ContentAddressedCache {
    root: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEnvelope {
    data: Value,
}

/// Hex digest of the canonicalized `{endpoint, params}` pair.
///
/// Public so call sites and tests can verify the determinism property
/// directly without round-tripping through disk.
pub fn cache_key(endpoint: &str, params: &Value) -> String {
    let envelope = serde_json::json!({ "endpoint": endpoint, "params": params });
    let canonical = serde_json::to_vec(&envelope).unwrap_or_default();
    let digest = Sha256::digest(&canonical);
    hex_encode(&digest)
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

impl ContentAddressedCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    pub async fn get(&self, endpoint: &str, params: &Value) -> Option<Value> {
        let key = cache_key(endpoint, params);
        let path = self.path_for(&key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!("cache read error for {endpoint}: {err}");
                return None;
            }
        };
        match serde_json::from_slice::<CacheEnvelope>(&bytes) {
            Ok(envelope) => Some(envelope.data),
            Err(err) => {
                warn!("cache entry for {endpoint} is corrupt, ignoring: {err}");
                None
            }
        }
    }

    pub async fn put(&self, endpoint: &str, params: &Value, payload: Value) {
        let key = cache_key(endpoint, params);
        let path = self.path_for(&key);
        let envelope = CacheEnvelope { data: payload };
        let Ok(bytes) = serde_json::to_vec(&envelope) else {
            warn!("cache encode failed for {endpoint}");
            return;
        };
        if let Err(err) = write_atomic(&self.root, &path, &bytes).await {
            warn!("cache write failed for {endpoint}: {err}");
        }
    }
}

async fn write_atomic(root: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    tokio::fs::create_dir_all(root).await?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await
}
