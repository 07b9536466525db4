//! Application configuration for paperflow.
//!
//! User config lives at `~/.paperflow/paperflow.toml`.
//! CLI flags override config file values, which override defaults.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PaperflowError, Result};
use crate::types::{FailurePolicy, StageSpec, default_stages};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "paperflow.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".paperflow";

// ---------------------------------------------------------------------------
// Config structs (matching paperflow.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Pipeline-wide settings.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Explicit stage list. Empty means the built-in six-stage catalogue.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stages: Vec<StageSpec>,
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Interpreter used by the built-in catalogue.
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// Directory holding the built-in catalogue's scripts.
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: PathBuf,

    /// Working directory for every stage (defaults to the current dir).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,

    /// What to do when a stage fails.
    #[serde(default)]
    pub on_failure: FailurePolicy,

    /// Load `.env` from the working directory into every stage's env.
    #[serde(default = "default_true")]
    pub load_dotenv: bool,

    /// Extra environment for every stage.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            scripts_dir: default_scripts_dir(),
            working_dir: None,
            on_failure: FailurePolicy::default(),
            load_dotenv: true,
            env: BTreeMap::new(),
        }
    }
}

fn default_interpreter() -> String {
    "python".into()
}
fn default_scripts_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_true() -> bool {
    true
}

impl AppConfig {
    /// A config whose `[[stages]]` list spells out the built-in catalogue.
    pub fn with_default_stages() -> Self {
        let pipeline = PipelineConfig::default();
        let stages = default_stages(&pipeline.interpreter, &pipeline.scripts_dir);
        Self { pipeline, stages }
    }

    /// The stage list to run: explicit `[[stages]]` or the built-in catalogue.
    pub fn resolved_stages(&self) -> Result<Vec<StageSpec>> {
        let stages = if self.stages.is_empty() {
            default_stages(&self.pipeline.interpreter, &self.pipeline.scripts_dir)
        } else {
            self.stages.clone()
        };
        validate_stages(&stages)?;
        Ok(stages)
    }
}

/// Stage names must be non-empty and unique; programs must be non-empty.
fn validate_stages(stages: &[StageSpec]) -> Result<()> {
    let mut seen = HashSet::new();
    for stage in stages {
        if stage.name.trim().is_empty() {
            return Err(PaperflowError::config("stage with empty name"));
        }
        if stage.program.trim().is_empty() {
            return Err(PaperflowError::config(format!(
                "stage '{}' has no program",
                stage.name
            )));
        }
        if !seen.insert(stage.name.as_str()) {
            return Err(PaperflowError::config(format!(
                "duplicate stage name '{}'",
                stage.name
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.paperflow/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| PaperflowError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.paperflow/paperflow.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| PaperflowError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| PaperflowError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = config_file_path()?;
    init_config_at(&path, force)?;
    Ok(path)
}

/// Write the default config to `path`. An existing file is only replaced
/// when `force` is set.
pub fn init_config_at(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(PaperflowError::config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| PaperflowError::io(dir, e))?;
    }

    write_config(path, &AppConfig::with_default_stages())?;
    tracing::info!(?path, "created default config file");
    Ok(())
}

fn write_config(path: &Path, config: &AppConfig) -> Result<()> {
    let content =
        toml::to_string_pretty(config).map_err(|e| PaperflowError::config(e.to_string()))?;
    std::fs::write(path, content).map_err(|e| PaperflowError::io(path, e))
}

/// Read `<dir>/.env` into a map without touching the process environment.
/// A missing file yields an empty map.
pub fn load_dotenv(dir: &Path) -> Result<BTreeMap<String, String>> {
    let path = dir.join(".env");
    if !path.exists() {
        return Ok(BTreeMap::new());
    }

    let iter = dotenvy::from_path_iter(&path)
        .map_err(|e| PaperflowError::config(format!("failed to read {}: {e}", path.display())))?;

    let mut vars = BTreeMap::new();
    for item in iter {
        let (key, value) = item.map_err(|e| {
            PaperflowError::config(format!("failed to parse {}: {e}", path.display()))
        })?;
        vars.insert(key, value);
    }
    tracing::debug!(?path, count = vars.len(), "loaded .env");
    Ok(vars)
}
