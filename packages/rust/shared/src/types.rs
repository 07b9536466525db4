//! Core domain types for the paperflow pipeline.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Line printed once after the last stage of a completed run.
pub const COMPLETION_MESSAGE: &str =
    "Done! Please enjoy the rest of your day and spread love around your neighbourhood.";

/// Format the progress banner for the stage at 1-based `index`.
pub fn banner(index: usize, description: &str) -> String {
    format!(">> [{index}] {description}...")
}

// ---------------------------------------------------------------------------
// FailurePolicy
// ---------------------------------------------------------------------------

/// What the runner does when a stage fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Log the failure and move on to the next stage.
    #[default]
    Continue,
    /// Stop after the first failing stage.
    Halt,
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Continue => f.write_str("continue"),
            Self::Halt => f.write_str("halt"),
        }
    }
}

// ---------------------------------------------------------------------------
// StageSpec
// ---------------------------------------------------------------------------

/// Descriptor for one external stage, as listed in `[[stages]]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSpec {
    /// Stable kebab-case identifier (used by `--from` / `--only`).
    pub name: String,
    /// Banner text, without the index prefix or trailing ellipsis.
    pub description: String,
    /// Program to launch.
    pub program: String,
    /// Arguments passed to the program.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Working directory for the child (defaults to the pipeline's).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
    /// Extra environment variables, layered over the pipeline env.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    /// Kill the child if it runs longer than this.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl StageSpec {
    /// Descriptor with no arguments, env, or timeout.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        program: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: BTreeMap::new(),
            timeout_secs: None,
        }
    }

    /// Builder-style argument setter.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// The command line as it would be typed, for logs and `list`.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// (name, banner description, script file) for the built-in catalogue.
const DEFAULT_CATALOGUE: [(&str, &str, &str); 6] = [
    ("collect-codes", "Collecting codes", "01_arxiv_codes.py"),
    ("collect-citations", "Collecting citations", "02_citations.py"),
    ("process-content", "Processing content", "03_content_processor.py"),
    ("run-topic-model", "Running topic model", "04_topic_model.py"),
    ("update-catalogue", "Updating Gist catalogue", "05_gist_catalogue.py"),
    ("link-thumbnails", "Linking thumbnails", "06_img_processor.py"),
];

/// The six built-in stages, each running `interpreter <scripts_dir>/<script>`.
pub fn default_stages(interpreter: &str, scripts_dir: &Path) -> Vec<StageSpec> {
    DEFAULT_CATALOGUE
        .iter()
        .map(|(name, description, script)| {
            StageSpec::new(*name, *description, interpreter)
                .with_args([scripts_dir.join(script).to_string_lossy().into_owned()])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_format() {
        assert_eq!(banner(1, "Collecting codes"), ">> [1] Collecting codes...");
        assert_eq!(
            banner(5, "Updating Gist catalogue"),
            ">> [5] Updating Gist catalogue..."
        );
    }

    #[test]
    fn default_catalogue_order() {
        let stages = default_stages("python", Path::new("scripts"));
        let names: Vec<_> = stages.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "collect-codes",
                "collect-citations",
                "process-content",
                "run-topic-model",
                "update-catalogue",
                "link-thumbnails",
            ]
        );
        assert_eq!(stages[0].program, "python");
        assert_eq!(
            PathBuf::from(&stages[5].args[0]),
            Path::new("scripts").join("06_img_processor.py")
        );
    }

    #[test]
    fn command_line_joins_args() {
        let spec = StageSpec::new("a", "A", "python").with_args(["-u", "run.py"]);
        assert_eq!(spec.command_line(), "python -u run.py");
        assert_eq!(StageSpec::new("b", "B", "true").command_line(), "true");
    }

    #[test]
    fn failure_policy_serde() {
        #[derive(Deserialize)]
        struct Wrapper {
            on_failure: FailurePolicy,
        }
        let w: Wrapper = toml::from_str(r#"on_failure = "halt""#).expect("parse");
        assert_eq!(w.on_failure, FailurePolicy::Halt);
        assert_eq!(FailurePolicy::default(), FailurePolicy::Continue);
        assert_eq!(FailurePolicy::Continue.to_string(), "continue");
    }
}
