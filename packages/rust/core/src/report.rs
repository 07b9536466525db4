//! Per-run outcome records and their JSON export.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use paperflow_shared::{FailurePolicy, PaperflowError, Result};

use crate::stage::StageStatus;

/// Outcome of one executed stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReport {
    /// 1-based position in the declared stage list (matches the banner).
    pub index: usize,
    pub name: String,
    pub status: StageStatus,
    pub elapsed_ms: u64,
}

/// Everything that happened during one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Time-sortable run identifier.
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub policy: FailurePolicy,
    /// Executed stages, in execution order.
    pub stages: Vec<StageReport>,
    /// Name of the stage the run stopped at under the halt policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub halted_at: Option<String>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.stages.iter().filter(|s| s.status.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.stages.len() - self.succeeded()
    }

    /// True when every executed stage succeeded.
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn halted(&self) -> bool {
        self.halted_at.is_some()
    }

    /// Turn a halted run into [`PaperflowError::Halted`].
    pub fn into_result(self) -> Result<Self> {
        match &self.halted_at {
            Some(stage) => {
                let status = self
                    .stages
                    .iter()
                    .find(|s| &s.name == stage)
                    .map(|s| s.status.to_string())
                    .unwrap_or_default();
                Err(PaperflowError::Halted {
                    stage: stage.clone(),
                    status,
                })
            }
            None => Ok(self),
        }
    }

    /// Write the report as pretty JSON, creating parent directories.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| PaperflowError::io(parent, e))?;
        }
        let json =
            serde_json::to_string_pretty(self).map_err(|e| PaperflowError::Report(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| PaperflowError::io(path, e))?;
        tracing::info!(?path, "wrote run report");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(statuses: &[StageStatus], halted_at: Option<&str>) -> RunReport {
        RunReport {
            run_id: Uuid::now_v7(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            policy: FailurePolicy::Continue,
            stages: statuses
                .iter()
                .enumerate()
                .map(|(i, status)| StageReport {
                    index: i + 1,
                    name: format!("stage-{}", i + 1),
                    status: status.clone(),
                    elapsed_ms: 0,
                })
                .collect(),
            halted_at: halted_at.map(String::from),
        }
    }

    #[test]
    fn counts_outcomes() {
        let r = report(
            &[
                StageStatus::Succeeded,
                StageStatus::Failed { code: Some(1) },
                StageStatus::Succeeded,
            ],
            None,
        );
        assert_eq!(r.succeeded(), 2);
        assert_eq!(r.failed(), 1);
        assert!(!r.is_success());
        assert!(r.into_result().is_ok());
    }

    #[test]
    fn halted_report_becomes_error() {
        let r = report(
            &[StageStatus::Succeeded, StageStatus::Failed { code: Some(4) }],
            Some("stage-2"),
        );
        assert!(r.halted());
        let err = r.into_result().unwrap_err();
        assert_eq!(
            err.to_string(),
            "pipeline halted at stage 'stage-2': exited with code 4"
        );
    }

    #[test]
    fn writes_json_report() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("reports").join("run.json");
        let r = report(&[StageStatus::Succeeded], None);
        r.write_json(&path).expect("write");

        let parsed: RunReport =
            serde_json::from_str(&std::fs::read_to_string(&path).expect("read")).expect("parse");
        assert_eq!(parsed.run_id, r.run_id);
        assert_eq!(parsed.stages, r.stages);
        assert!(parsed.halted_at.is_none());
    }
}
