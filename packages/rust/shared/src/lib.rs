//! Shared types, error model, and configuration for paperflow.
//!
//! This crate is the foundation depended on by the other paperflow crates.
//! It provides:
//! - [`PaperflowError`] — the unified error type
//! - Stage descriptors ([`StageSpec`]) and the default six-stage catalogue
//! - Configuration ([`AppConfig`], [`PipelineConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, PipelineConfig, config_dir, config_file_path, init_config, init_config_at,
    load_config, load_config_from, load_dotenv,
};
pub use error::{PaperflowError, Result};
pub use types::{COMPLETION_MESSAGE, FailurePolicy, StageSpec, banner, default_stages};
