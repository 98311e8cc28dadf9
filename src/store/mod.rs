//! Run Store (spec §4.9): one directory per run holding
//! `{metadata.json, state.json, report.<ext>}`. Updates are last-write-wins
//! within a run; cross-run isolation is by directory, keyed on `run_id`.

use std::path::PathBuf;

use uuid::Uuid;

use crate::error::RepurposeError;
use crate::model::{RouteAState, RunMetadata};

#[derive(Debug, Clone)]
pub struct RunStore {
    root: PathBuf,
}

impl RunStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn run_dir(&self, run_id: Uuid) -> PathBuf {
        self.root.join(run_id.to_string())
    }

    async fn write_atomic(&self, path: &std::path::Path, bytes: &[u8]) -> Result<(), RepurposeError> {
        let dir = path.parent().ok_or_else(|| {
            RepurposeError::Io(std::io::Error::new(std::io::ErrorKind::Other, "run directory missing parent"))
        })?;
        tokio::fs::create_dir_all(dir).await?;
        let tmp = path.with_extension(format!(
            "{}.tmp",
            path.extension().and_then(|e| e.to_str()).unwrap_or("json")
        ));
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Creates `<root>/<run_id>/` and writes the initial `metadata.json`.
    pub async fn create_run(&self, metadata: &RunMetadata) -> Result<(), RepurposeError> {
        let dir = self.run_dir(metadata.run_id);
        tokio::fs::create_dir_all(&dir).await?;
        self.update_metadata(metadata).await
    }

    /// Overwrites `metadata.json` for the run (last-write-wins).
    pub async fn update_metadata(&self, metadata: &RunMetadata) -> Result<(), RepurposeError> {
        let path = self.run_dir(metadata.run_id).join("metadata.json");
        let bytes = serde_json::to_vec_pretty(metadata).map_err(|err| RepurposeError::ApiJson { api: "store".to_string(), source: err })?;
        self.write_atomic(&path, &bytes).await
    }

    pub async fn load_metadata(&self, run_id: Uuid) -> Result<RunMetadata, RepurposeError> {
        let path = self.run_dir(run_id).join("metadata.json");
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|_| RepurposeError::RunNotFound(run_id.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|err| RepurposeError::ApiJson { api: "store".to_string(), source: err })
    }

    /// Overwrites `state.json` for the run (last-write-wins).
    pub async fn save_state(&self, run_id: Uuid, state: &RouteAState) -> Result<(), RepurposeError> {
        let path = self.run_dir(run_id).join("state.json");
        let bytes = serde_json::to_vec_pretty(state).map_err(|err| RepurposeError::ApiJson { api: "store".to_string(), source: err })?;
        self.write_atomic(&path, &bytes).await
    }

    pub async fn load_state(&self, run_id: Uuid) -> Result<RouteAState, RepurposeError> {
        let path = self.run_dir(run_id).join("state.json");
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|_| RepurposeError::RunNotFound(run_id.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|err| RepurposeError::ApiJson { api: "store".to_string(), source: err })
    }

    /// Writes `report.<extension>` (e.g. `md`, `pdf`) and returns its path.
    pub async fn save_report(&self, run_id: Uuid, extension: &str, contents: &[u8]) -> Result<PathBuf, RepurposeError> {
        let path = self.run_dir(run_id).join(format!("report.{extension}"));
        self.write_atomic(&path, contents).await?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RunStatus;

    fn tempdir() -> PathBuf {
        std::env::temp_dir().join(format!("repurposer-store-test-{}", Uuid::new_v4()))
    }

    #[tokio::test]
    async fn create_then_load_metadata_round_trips() {
        let dir = tempdir();
        let store = RunStore::new(&dir);
        let metadata = RunMetadata::new("melanoma".into(), "US".into());
        store.create_run(&metadata).await.unwrap();

        let loaded = store.load_metadata(metadata.run_id).await.unwrap();
        assert_eq!(loaded.run_id, metadata.run_id);
        assert_eq!(loaded.status, RunStatus::Queued);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn update_metadata_is_last_write_wins() {
        let dir = tempdir();
        let store = RunStore::new(&dir);
        let mut metadata = RunMetadata::new("melanoma".into(), "US".into());
        store.create_run(&metadata).await.unwrap();

        metadata.mark_running();
        store.update_metadata(&metadata).await.unwrap();

        let loaded = store.load_metadata(metadata.run_id).await.unwrap();
        assert_eq!(loaded.status, RunStatus::Running);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn load_state_for_unknown_run_is_run_not_found() {
        let dir = tempdir();
        let store = RunStore::new(&dir);
        let err = store.load_state(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, RepurposeError::RunNotFound(_)));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn save_report_writes_file_with_extension() {
        let dir = tempdir();
        let store = RunStore::new(&dir);
        let metadata = RunMetadata::new("melanoma".into(), "US".into());
        store.create_run(&metadata).await.unwrap();

        let path = store.save_report(metadata.run_id, "md", b"# Report").await.unwrap();
        assert!(path.ends_with("report.md"));
        let contents = tokio::fs::read(&path).await.unwrap();
        assert_eq!(contents, b"# Report");
        let _ = std::fs::remove_dir_all(&dir);
    }
}
