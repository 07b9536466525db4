//! Pipeline orchestration for paperflow.
//!
//! This crate defines the [`stage::Stage`] capability, the process-backed
//! stage used in production, and the sequential runner that announces and
//! executes stages in declared order (see [`runner::Pipeline`]).

pub mod process;
pub mod progress;
pub mod report;
pub mod runner;
pub mod stage;

pub use process::ProcessStage;
pub use progress::{BannerPrinter, ProgressReporter, SilentProgress};
pub use report::{RunReport, StageReport};
pub use runner::{Pipeline, Selection};
pub use stage::{Stage, StageStatus};
