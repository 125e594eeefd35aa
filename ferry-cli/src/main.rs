//! Ferry CLI - Command line interface for GitFerry
//!
//! Repository migration from Azure DevOps to GitHub: git history, work
//! items and CI pipelines.

mod commands;
mod env_subst;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{AnalyzeArgs, BatchArgs, ListArgs, MigrateArgs, ValidateArgs};

/// GitFerry: migrate repositories from Azure DevOps to GitHub
#[derive(Parser, Debug)]
#[command(name = "ferry")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true, env = "FERRY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show version information
    Version,

    /// Migrate one repository
    #[command(visible_alias = "m")]
    Migrate(MigrateArgs),

    /// Migrate a list of repositories from a plan file
    Batch(BatchArgs),

    /// Survey the source organization and plan migrations
    Analyze(AnalyzeArgs),

    /// Browse the source platform
    List(ListArgs),

    /// Check credentials and local tooling
    Validate(ValidateArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Config is optional for version/help; commands that need it surface the
    // load error themselves.
    let config = commands::load_config(cli.config.as_deref());

    let default_level = if cli.verbose {
        "debug".to_string()
    } else {
        config
            .as_ref()
            .map(|c| c.logging.level.clone())
            .unwrap_or_else(|_| "info".to_string())
    };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    if cli.verbose {
        tracing::debug!("verbose output enabled");
    }

    match cli.command {
        Some(Commands::Version) => {
            println!("ferry {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Migrate(args)) => {
            args.execute(config?).await?;
        }
        Some(Commands::Batch(args)) => {
            args.execute(config?).await?;
        }
        Some(Commands::Analyze(args)) => {
            args.execute(config?).await?;
        }
        Some(Commands::List(args)) => {
            args.execute(config?).await?;
        }
        Some(Commands::Validate(args)) => {
            args.execute(config?).await?;
        }
        None => {
            println!("GitFerry - repository migration from Azure DevOps to GitHub");
            println!();
            println!("Use --help for usage information");
        }
    }

    Ok(())
}
