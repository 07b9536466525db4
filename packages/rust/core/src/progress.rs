//! Progress reporting: banners before each stage, completion at the end.

use std::io::Write;
use std::sync::Mutex;

use paperflow_shared::{COMPLETION_MESSAGE, banner};

use crate::report::{RunReport, StageReport};
use crate::stage::Stage;

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called immediately before stage number `index` (1-based) executes.
    fn stage_started(&self, index: usize, stage: &dyn Stage);
    /// Called after a stage finishes, whatever its outcome.
    fn stage_finished(&self, report: &StageReport);
    /// Called once when the run completes. Not called for halted runs.
    fn done(&self, report: &RunReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn stage_started(&self, _index: usize, _stage: &dyn Stage) {}
    fn stage_finished(&self, _report: &StageReport) {}
    fn done(&self, _report: &RunReport) {}
}

/// Writes `>> [i] <description>...` banners and the completion line.
pub struct BannerPrinter<W> {
    out: Mutex<W>,
}

impl BannerPrinter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> BannerPrinter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn line(&self, text: &str) {
        let mut out = self.out.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        // Flush so the banner lands before the child's own output.
        if let Err(e) = writeln!(out, "{text}").and_then(|()| out.flush()) {
            tracing::warn!(error = %e, "failed to write progress line");
        }
    }
}

impl<W: Write + Send> ProgressReporter for BannerPrinter<W> {
    fn stage_started(&self, index: usize, stage: &dyn Stage) {
        self.line(&banner(index, stage.description()));
    }

    fn stage_finished(&self, _report: &StageReport) {}

    fn done(&self, _report: &RunReport) {
        self.line(COMPLETION_MESSAGE);
    }
}
