//! Run identity and lifecycle metadata (spec §3 `RunMetadata`, §6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub run_id: Uuid,
    pub indication: String,
    pub geography: String,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: RunStatus,
    pub error_message: Option<String>,
    pub report_path: Option<String>,
}

impl RunMetadata {
    pub fn new(indication: String, geography: String) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            indication,
            geography,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            status: RunStatus::Queued,
            error_message: None,
            report_path: None,
        }
    }

    pub fn mark_running(&mut self) {
        self.status = RunStatus::Running;
        self.started_at = Some(Utc::now());
    }

    pub fn mark_succeeded(&mut self, report_path: Option<String>) {
        self.status = RunStatus::Succeeded;
        self.completed_at = Some(Utc::now());
        self.report_path = report_path;
    }

    pub fn mark_failed(&mut self, error_message: String) {
        self.status = RunStatus::Failed;
        self.completed_at = Some(Utc::now());
        self.error_message = Some(error_message);
    }
}

/// Submission-time input validation (spec §6/§7: 422-equivalent on empty
/// indication/geography or an out-of-range `min_phase`).
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub indication: String,
    pub geography: String,
    pub min_phase: u8,
    pub oral_only: bool,
    pub exclude_biologics: bool,
    pub strict_fto: bool,
}

impl RunRequest {
    pub fn validate(
        indication: String,
        geography: String,
        min_phase: Option<u8>,
        oral_only: bool,
        exclude_biologics: bool,
        strict_fto: bool,
    ) -> Result<Self, crate::error::RepurposeError> {
        if indication.trim().is_empty() {
            return Err(crate::error::RepurposeError::InvalidArgument(
                "indication must not be empty".into(),
            ));
        }
        if geography.trim().is_empty() {
            return Err(crate::error::RepurposeError::InvalidArgument(
                "geography must not be empty".into(),
            ));
        }
        let min_phase = min_phase.unwrap_or(1);
        if !(1..=4).contains(&min_phase) {
            return Err(crate::error::RepurposeError::InvalidArgument(
                "min_phase must be between 1 and 4".into(),
            ));
        }
        Ok(Self {
            indication: indication.trim().to_string(),
            geography: geography.trim().to_string(),
            min_phase,
            oral_only,
            exclude_biologics,
            strict_fto,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_empty_indication() {
        let err = RunRequest::validate("".into(), "US".into(), None, false, false, false)
            .expect_err("empty indication should fail");
        assert!(matches!(
            err,
            crate::error::RepurposeError::InvalidArgument(_)
        ));
    }

    #[test]
    fn validate_rejects_out_of_range_min_phase() {
        let err = RunRequest::validate(
            "melanoma".into(),
            "US".into(),
            Some(9),
            false,
            false,
            false,
        )
        .expect_err("out of range phase should fail");
        assert!(matches!(
            err,
            crate::error::RepurposeError::InvalidArgument(_)
        ));
    }

    #[test]
    fn validate_accepts_well_formed_request() {
        let req = RunRequest::validate(
            "type 2 diabetes".into(),
            "global".into(),
            Some(4),
            false,
            false,
            false,
        )
        .unwrap();
        assert_eq!(req.min_phase, 4);
    }
}
