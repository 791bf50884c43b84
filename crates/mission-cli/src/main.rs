mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    backlog::BacklogSubcommand, checkpoint::CheckpointSubcommand,
    diagnosis::DiagnosisSubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "mission",
    about = "Mission state for AI-assisted coding: backlog, diagnosis, checkpoints, intent validation",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .mission/ or .git/)
    #[arg(long, global = true, env = "MISSION_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the active mission
    Status,

    /// Manage the typed backlog
    Backlog {
        #[command(subcommand)]
        subcommand: BacklogSubcommand,
    },

    /// Drive a debug investigation
    Diagnosis {
        #[command(subcommand)]
        subcommand: DiagnosisSubcommand,
    },

    /// Snapshot and restore the working tree
    Checkpoint {
        #[command(subcommand)]
        subcommand: CheckpointSubcommand,
    },

    /// Check an intent before executing it
    Validate {
        /// Free-form intent (may be empty)
        intent: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Status => cmd::status::run(&root, cli.json),
        Commands::Backlog { subcommand } => cmd::backlog::run(&root, subcommand, cli.json),
        Commands::Diagnosis { subcommand } => cmd::diagnosis::run(&root, subcommand, cli.json),
        Commands::Checkpoint { subcommand } => cmd::checkpoint::run(&root, subcommand, cli.json),
        Commands::Validate { intent } => cmd::validate::run(&root, &intent.join(" "), cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
