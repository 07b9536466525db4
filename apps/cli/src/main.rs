//! paperflow CLI — runs the paper-catalogue pipeline.
//!
//! Executes the six catalogue stages in order, printing a numbered banner
//! before each one and a completion message at the end.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
