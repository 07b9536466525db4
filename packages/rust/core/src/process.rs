//! Stage backed by an external program.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use paperflow_shared::{PaperflowError, Result, StageSpec};

use crate::stage::{Stage, StageStatus};

/// Launches `program args...` with inherited stdio and waits for it to exit.
#[derive(Debug, Clone)]
pub struct ProcessStage {
    spec: StageSpec,
    /// Pipeline-wide working directory; the spec's own takes precedence.
    working_dir: Option<PathBuf>,
    /// Pipeline-wide env; the spec's own entries override it.
    env: BTreeMap<String, String>,
}

impl ProcessStage {
    pub fn new(spec: StageSpec) -> Self {
        Self {
            spec,
            working_dir: None,
            env: BTreeMap::new(),
        }
    }

    pub fn with_working_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.working_dir = dir;
        self
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.spec.program);
        cmd.args(&self.spec.args)
            .envs(&self.env)
            .envs(&self.spec.env)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        if let Some(dir) = self.spec.working_dir.as_ref().or(self.working_dir.as_ref()) {
            cmd.current_dir(dir);
        }
        cmd
    }
}

#[async_trait]
impl Stage for ProcessStage {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn description(&self) -> &str {
        &self.spec.description
    }

    #[instrument(skip_all, fields(stage = %self.spec.name))]
    async fn execute(&self) -> Result<StageStatus> {
        debug!(command = %self.spec.command_line(), "spawning stage process");

        let mut child = match self.command().spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(program = %self.spec.program, error = %e, "failed to spawn stage process");
                return Ok(StageStatus::SpawnFailed {
                    message: e.to_string(),
                });
            }
        };

        let waited = match self.spec.timeout_secs {
            Some(secs) => {
                let outcome = tokio::time::timeout(Duration::from_secs(secs), child.wait()).await;
                match outcome {
                    Ok(waited) => waited,
                    Err(_) => {
                        warn!(after_secs = secs, "stage timed out, killing process");
                        child.kill().await.map_err(|e| {
                            PaperflowError::stage(&self.spec.name, format!("failed to kill: {e}"))
                        })?;
                        return Ok(StageStatus::TimedOut { after_secs: secs });
                    }
                }
            }
            None => child.wait().await,
        };

        let status = waited.map_err(|e| {
            PaperflowError::stage(&self.spec.name, format!("failed to wait: {e}"))
        })?;

        if status.success() {
            Ok(StageStatus::Succeeded)
        } else {
            Ok(StageStatus::Failed {
                code: status.code(),
            })
        }
    }
}
