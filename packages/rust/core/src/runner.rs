//! Sequential pipeline runner.
//!
//! Stages execute one at a time in declared order. Each stage is announced
//! through the [`ProgressReporter`] immediately before it starts, and the
//! runner waits for it to finish before moving on. What happens after a
//! failing stage is governed by [`FailurePolicy`].

use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use paperflow_shared::{FailurePolicy, PaperflowError, Result, StageSpec};

use crate::process::ProcessStage;
use crate::progress::ProgressReporter;
use crate::report::{RunReport, StageReport};
use crate::stage::Stage;

/// Which part of the stage list a run covers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    All,
    /// The named stage and everything after it.
    From(String),
    /// Just the named stage.
    Only(String),
}

/// An ordered list of stages plus the policy for running them.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
    policy: FailurePolicy,
    selection: Selection,
}

impl Pipeline {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Self {
            stages,
            policy: FailurePolicy::default(),
            selection: Selection::default(),
        }
    }

    /// Build a pipeline of [`ProcessStage`]s sharing a working dir and env.
    pub fn from_specs(
        specs: Vec<StageSpec>,
        working_dir: Option<PathBuf>,
        env: BTreeMap<String, String>,
    ) -> Self {
        let stages = specs
            .into_iter()
            .map(|spec| {
                Box::new(
                    ProcessStage::new(spec)
                        .with_working_dir(working_dir.clone())
                        .with_env(env.clone()),
                ) as Box<dyn Stage>
            })
            .collect();
        Self::new(stages)
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    pub fn stages(&self) -> impl Iterator<Item = &dyn Stage> {
        self.stages.iter().map(|s| s.as_ref())
    }

    /// Indices of the stages this run covers, in declared order.
    fn selected(&self) -> Result<Vec<usize>> {
        let position = |name: &str| {
            self.stages
                .iter()
                .position(|s| s.name() == name)
                .ok_or_else(|| PaperflowError::config(format!("unknown stage '{name}'")))
        };

        match &self.selection {
            Selection::All => Ok((0..self.stages.len()).collect()),
            Selection::From(name) => Ok((position(name)?..self.stages.len()).collect()),
            Selection::Only(name) => Ok(vec![position(name)?]),
        }
    }

    /// Run until completion, aborting if Ctrl-C is received.
    pub async fn run(&self, progress: &dyn ProgressReporter) -> Result<RunReport> {
        self.run_until(progress, ctrl_c()).await
    }

    /// Run until completion, aborting the current stage if `shutdown` resolves.
    ///
    /// Stage failures do not produce `Err`: they are recorded in the report,
    /// and under [`FailurePolicy::Halt`] the run stops with
    /// [`RunReport::halted_at`] set. Use [`RunReport::into_result`] to treat a
    /// halted run as an error.
    #[instrument(skip_all, fields(policy = %self.policy))]
    pub async fn run_until<F>(
        &self,
        progress: &dyn ProgressReporter,
        shutdown: F,
    ) -> Result<RunReport>
    where
        F: Future<Output = ()>,
    {
        let selected = self.selected()?;
        let run_id = Uuid::now_v7();
        let started_at = Utc::now();
        tokio::pin!(shutdown);

        info!(%run_id, stages = selected.len(), "starting pipeline");

        let mut reports = Vec::with_capacity(selected.len());
        let mut halted_at = None;

        for idx in selected {
            let stage = self.stages[idx].as_ref();
            let index = idx + 1;

            progress.stage_started(index, stage);
            info!(index, stage = stage.name(), "stage started");
            let start = Instant::now();

            let status = tokio::select! {
                biased;
                () = &mut shutdown => {
                    warn!(stage = stage.name(), "interrupted, aborting run");
                    return Err(PaperflowError::Interrupted {
                        stage: stage.name().to_string(),
                    });
                }
                status = stage.execute() => status?,
            };

            let elapsed_ms = start.elapsed().as_millis() as u64;
            if status.is_success() {
                info!(index, stage = stage.name(), elapsed_ms, "stage finished");
            } else {
                warn!(index, stage = stage.name(), %status, "stage failed");
            }

            let report = StageReport {
                index,
                name: stage.name().to_string(),
                status,
                elapsed_ms,
            };
            progress.stage_finished(&report);
            let failed = !report.status.is_success();
            reports.push(report);

            if failed && self.policy == FailurePolicy::Halt {
                halted_at = Some(stage.name().to_string());
                break;
            }
        }

        let report = RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            policy: self.policy,
            stages: reports,
            halted_at,
        };

        if report.halted() {
            warn!(
                %run_id,
                stage = %report.halted_at.as_deref().unwrap_or_default(),
                "pipeline halted"
            );
        } else {
            info!(
                %run_id,
                succeeded = report.succeeded(),
                failed = report.failed(),
                "pipeline complete"
            );
            progress.done(&report);
        }

        Ok(report)
    }
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
