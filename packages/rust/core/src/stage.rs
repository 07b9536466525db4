//! The stage capability: a named unit the runner can execute.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use paperflow_shared::Result;

/// Outcome of executing one stage.
///
/// Anything other than [`StageStatus::Succeeded`] counts as a stage failure;
/// the runner's failure policy decides whether the run continues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StageStatus {
    Succeeded,
    /// Exited non-zero. `code` is `None` when the child was killed by a signal.
    Failed { code: Option<i32> },
    /// The program could not be started at all.
    SpawnFailed { message: String },
    TimedOut { after_secs: u64 },
}

impl StageStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Succeeded => f.write_str("succeeded"),
            Self::Failed { code: Some(code) } => write!(f, "exited with code {code}"),
            Self::Failed { code: None } => f.write_str("terminated by signal"),
            Self::SpawnFailed { message } => write!(f, "failed to start: {message}"),
            Self::TimedOut { after_secs } => write!(f, "timed out after {after_secs}s"),
        }
    }
}

/// One discrete, named step of the pipeline.
///
/// Returning `Ok` with a failing [`StageStatus`] reports a stage failure.
/// Returning `Err` means the stage could not be driven at all and always
/// aborts the run.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Stable identifier, used for selection and in reports.
    fn name(&self) -> &str;

    /// Banner text.
    fn description(&self) -> &str;

    /// Run the stage to completion.
    async fn execute(&self) -> Result<StageStatus>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display() {
        assert_eq!(StageStatus::Succeeded.to_string(), "succeeded");
        assert_eq!(
            StageStatus::Failed { code: Some(2) }.to_string(),
            "exited with code 2"
        );
        assert_eq!(
            StageStatus::Failed { code: None }.to_string(),
            "terminated by signal"
        );
        assert_eq!(
            StageStatus::TimedOut { after_secs: 5 }.to_string(),
            "timed out after 5s"
        );
    }

    #[test]
    fn status_serializes_with_outcome_tag() {
        let json = serde_json::to_string(&StageStatus::Failed { code: Some(1) }).unwrap();
        assert_eq!(json, r#"{"outcome":"failed","code":1}"#);

        let json = serde_json::to_string(&StageStatus::Succeeded).unwrap();
        assert_eq!(json, r#"{"outcome":"succeeded"}"#);
    }
}
