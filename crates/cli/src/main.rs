//! Spar CLI: coupled aerostructural analysis and fuel-burn optimization.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod report;

#[derive(Parser)]
#[command(name = "spar")]
#[command(version, about = "Spar: coupled aerostructural analysis and optimization")]
struct Cli {
    /// Write the reference problem as TOML to this path and exit.
    #[arg(long, value_name = "PATH")]
    write_default: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one coupled analysis at the problem's initial design.
    Analyze {
        /// Path to the problem file (TOML).
        problem: PathBuf,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Minimize fuel burn from the problem's initial design.
    Optimize {
        /// Path to the problem file (TOML).
        problem: PathBuf,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Some(path) = &cli.write_default {
        commands::write_default(path)?;
    }

    match cli.command {
        Some(Commands::Analyze { problem, json }) => commands::analyze(&problem, json),
        Some(Commands::Optimize { problem, json }) => commands::optimize(&problem, json),
        None if cli.write_default.is_some() => Ok(()),
        None => anyhow::bail!("nothing to do; run `spar --help` for usage"),
    }
}
