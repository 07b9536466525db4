//! CLI command definitions, routing, and tracing setup.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::Result;
use paperflow_core::{BannerPrinter, Pipeline, Selection};
use paperflow_shared::{
    AppConfig, FailurePolicy, StageSpec, init_config, load_config, load_config_from, load_dotenv,
};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// paperflow — run the paper-catalogue pipeline stage by stage.
#[derive(Parser)]
#[command(
    name = "paperflow",
    version,
    about = "Run the paper-catalogue pipeline: codes, citations, content, topics, catalogue, thumbnails.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.paperflow/paperflow.toml).
    #[arg(long, global = true, env = "PAPERFLOW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Defaults to `run` when omitted.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the pipeline (the default).
    Run(RunArgs),

    /// List the configured stages in execution order.
    List,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Default)]
pub(crate) struct RunArgs {
    /// Stop at the first failing stage instead of continuing.
    #[arg(long)]
    pub fail_fast: bool,

    /// Start at the named stage and run everything after it.
    #[arg(long, conflicts_with = "only")]
    pub from: Option<String>,

    /// Run only the named stage.
    #[arg(long)]
    pub only: Option<String>,

    /// Write a JSON run report to this path.
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl RunArgs {
    fn selection(&self) -> Selection {
        match (&self.from, &self.only) {
            (Some(name), _) => Selection::From(name.clone()),
            (None, Some(name)) => Selection::Only(name.clone()),
            (None, None) => Selection::All,
        }
    }
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init {
        /// Overwrite an existing config file.
        #[arg(long)]
        force: bool,
    },
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
///
/// Logs go to stderr; stdout carries only banners and stage output.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "paperflow=warn",
        1 => "paperflow=info",
        2 => "paperflow=debug",
        _ => "paperflow=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command.unwrap_or(Command::Run(RunArgs::default())) {
        Command::Run(args) => cmd_run(config_path, &args).await,
        Command::List => cmd_list(config_path),
        Command::Config { action } => match action {
            ConfigAction::Init { force } => cmd_config_init(force),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

/// Explicit `--config` must exist; the default location may be absent.
fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

/// Stage environment: `.env` from the working dir, then `[pipeline.env]`.
fn stage_env(config: &AppConfig) -> Result<BTreeMap<String, String>> {
    let mut env = if config.pipeline.load_dotenv {
        let dir = match &config.pipeline.working_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };
        load_dotenv(&dir)?
    } else {
        BTreeMap::new()
    };
    env.extend(config.pipeline.env.clone());
    Ok(env)
}

async fn cmd_run(config_path: Option<&Path>, args: &RunArgs) -> Result<()> {
    let config = resolve_config(config_path)?;

    let policy = if args.fail_fast {
        FailurePolicy::Halt
    } else {
        config.pipeline.on_failure
    };

    let specs = config.resolved_stages()?;
    let env = stage_env(&config)?;

    info!(
        stages = specs.len(),
        %policy,
        env_vars = env.len(),
        "running pipeline"
    );

    let pipeline = Pipeline::from_specs(specs, config.pipeline.working_dir.clone(), env)
        .with_policy(policy)
        .with_selection(args.selection());

    let report = pipeline.run(&BannerPrinter::stdout()).await?;

    if let Some(path) = &args.report {
        report.write_json(path)?;
    }

    if !report.is_success() && !report.halted() {
        warn!(
            failed = report.failed(),
            succeeded = report.succeeded(),
            "pipeline finished with failing stages"
        );
    }

    report.into_result()?;
    Ok(())
}

fn cmd_list(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    for row in stage_rows(&config.resolved_stages()?) {
        println!("{row}");
    }
    Ok(())
}

/// One aligned line per stage: number, name, description, command.
fn stage_rows(specs: &[StageSpec]) -> Vec<String> {
    let name_width = specs.iter().map(|s| s.name.len()).max().unwrap_or(0);
    let desc_width = specs.iter().map(|s| s.description.len()).max().unwrap_or(0);
    let num_width = specs.len().to_string().len();

    specs
        .iter()
        .enumerate()
        .map(|(i, spec)| {
            format!(
                "  {:>num_width$}. {:<name_width$}  {:<desc_width$}  ({})",
                i + 1,
                spec.name,
                spec.description,
                spec.command_line()
            )
        })
        .collect()
}

fn cmd_config_init(force: bool) -> Result<()> {
    let path = init_config(force)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let resolved = AppConfig {
        stages: config.resolved_stages()?,
        pipeline: config.pipeline,
    };
    let toml_str = toml::to_string_pretty(&resolved)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_defaults_to_run() {
        let cli = Cli::try_parse_from(["paperflow"]).expect("parse");
        assert!(cli.command.is_none());
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn run_flags_parse() {
        let cli = Cli::try_parse_from([
            "paperflow",
            "run",
            "--fail-fast",
            "--from",
            "run-topic-model",
            "--report",
            "out/run.json",
        ])
        .expect("parse");
        match cli.command {
            Some(Command::Run(args)) => {
                assert!(args.fail_fast);
                assert_eq!(args.selection(), Selection::From("run-topic-model".into()));
                assert_eq!(args.report, Some(PathBuf::from("out/run.json")));
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn from_and_only_conflict() {
        let result = Cli::try_parse_from([
            "paperflow",
            "run",
            "--from",
            "collect-codes",
            "--only",
            "link-thumbnails",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn list_rows_align_command_column() {
        let specs = paperflow_shared::default_stages("python", Path::new("scripts"));
        let rows = stage_rows(&specs);
        assert_eq!(rows.len(), 6);

        let columns: Vec<_> = rows.iter().map(|r| r.find('(').expect("command")).collect();
        assert!(columns.iter().all(|&c| c == columns[0]));
        assert!(rows[4].contains("Updating Gist catalogue"));
        assert!(rows[0].starts_with("  1. collect-codes "));
    }

    #[test]
    fn config_init_accepts_force() {
        let cli = Cli::try_parse_from(["paperflow", "config", "init", "--force"]).expect("parse");
        assert!(matches!(
            cli.command,
            Some(Command::Config {
                action: ConfigAction::Init { force: true }
            })
        ));
    }

    #[test]
    fn stage_env_layers_config_over_dotenv() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(".env"), "DB_NAME=local\nDB_HOST=db\n").expect("write");

        let mut config = AppConfig::default();
        config.pipeline.working_dir = Some(dir.path().to_path_buf());
        config.pipeline.env.insert("DB_NAME".into(), "prod".into());

        let env = stage_env(&config).expect("env");
        assert_eq!(env["DB_NAME"], "prod");
        assert_eq!(env["DB_HOST"], "db");

        config.pipeline.load_dotenv = false;
        let env = stage_env(&config).expect("env");
        assert!(!env.contains_key("DB_HOST"));
    }
}
