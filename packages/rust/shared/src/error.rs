//! Error types for paperflow.
//!
//! Library crates use [`PaperflowError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all paperflow operations.
#[derive(Debug, thiserror::Error)]
pub enum PaperflowError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A stage could not be driven (wait failed, kill failed, ...).
    #[error("stage '{stage}' error: {message}")]
    Stage { stage: String, message: String },

    /// The run stopped after a failing stage under the halt policy.
    #[error("pipeline halted at stage '{stage}': {status}")]
    Halted { stage: String, status: String },

    /// The run was interrupted (Ctrl-C).
    #[error("pipeline interrupted during stage '{stage}'")]
    Interrupted { stage: String },

    /// Run report serialization error.
    #[error("report error: {0}")]
    Report(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PaperflowError>;

impl PaperflowError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a stage error for the named stage.
    pub fn stage(stage: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Stage {
            stage: stage.into(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = PaperflowError::config("duplicate stage name 'collect-codes'");
        assert_eq!(
            err.to_string(),
            "config error: duplicate stage name 'collect-codes'"
        );

        let err = PaperflowError::Halted {
            stage: "collect-citations".into(),
            status: "exited with code 2".into(),
        };
        assert!(err.to_string().contains("collect-citations"));
        assert!(err.to_string().contains("code 2"));
    }
}
