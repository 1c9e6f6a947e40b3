//! curtain-reviews - review attribution, deduplication and scoring
//!
//! Dry run by default: every pass reports what it would change. `--apply`
//! persists the changes to the review files.
//!
//! Exit status is non-zero only when an apply run cannot start (for
//! example the show registry cannot be parsed). Findings are never errors.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use curtain_common::config::{resolve_root_folder, ROOT_FOLDER_ENV};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use curtain_reviews::report::BuildInfo;
use curtain_reviews::{Command, CurtainConfig, Pipeline, ReferenceTables, RunMode};

/// Tables file looked up in the data root when the config names none
const ROOT_TABLES_FILE: &str = "tables.toml";

#[derive(Parser, Debug)]
#[command(name = "curtain-reviews", version, about = "Review attribution, deduplication and scoring")]
struct Cli {
    /// Persist changes (default is a dry run)
    #[arg(long, global = true)]
    apply: bool,

    /// Data root holding shows.json and reviews/
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Explicit TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Commands {
    /// Merge duplicate sightings into canonical reviews
    Consolidate,
    /// Resolve URLs filed under more than one show
    ResolveCollisions,
    /// Flag reviews of an earlier production of a revival
    VerifyProductions,
    /// Assign numeric scores through the fallback cascade
    AssignScores,
    /// Delete wrong-show reviews a second check confirms
    PurgeWrongShow,
    /// Garbage text, merge, collisions, verification and scores in one pass
    Run,
}

impl From<Commands> for Command {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Consolidate => Command::Consolidate,
            Commands::ResolveCollisions => Command::ResolveCollisions,
            Commands::VerifyProductions => Command::VerifyProductions,
            Commands::AssignScores => Command::AssignScores,
            Commands::PurgeWrongShow => Command::PurgeWrongShow,
            Commands::Run => Command::Run,
        }
    }
}

fn load_tables(config: &CurtainConfig, root: &Path) -> Result<ReferenceTables> {
    let path = match &config.tables_path {
        Some(path) => Some(path.clone()),
        None => Some(root.join(ROOT_TABLES_FILE)).filter(|p| p.is_file()),
    };
    ReferenceTables::load(path.as_deref()).context("Failed to load reference tables")
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = CurtainConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    // RUST_LOG wins over the config file level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!("Starting curtain-reviews {}", BuildInfo::current());

    let root = resolve_root_folder(cli.root.as_deref(), ROOT_FOLDER_ENV, config.root_folder.as_deref());
    let mode = if cli.apply { RunMode::Apply } else { RunMode::DryRun };
    info!("Data root: {} ({})", root.display(), mode.as_str());

    let tables = load_tables(&config, &root)?;
    let command = Command::from(cli.command);

    let result = Pipeline::new(&config, &tables, mode).execute(command, &root).await;
    match (result, mode) {
        (Ok(report), _) => {
            info!(
                "{} finished: {} changes, {} collisions, {} findings",
                command.as_str(),
                report.changes.len(),
                report.collisions.len(),
                report.findings.len()
            );
            Ok(())
        }
        (Err(e), RunMode::DryRun) => {
            error!("{} could not run: {}", command.as_str(), e);
            Ok(())
        }
        (Err(e), RunMode::Apply) => Err(e).with_context(|| format!("{} failed", command.as_str())),
    }
}
