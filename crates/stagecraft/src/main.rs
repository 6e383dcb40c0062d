//! stagecraft: run the demo stages from the command line.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use stagecraft::config::{self, CatalogBackend, StagecraftConfig};
use stagecraft_logging::{init_logging, LogConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

mod cli;

#[derive(Parser, Debug)]
#[command(name = "stagecraft")]
#[command(about = "Staged table edits with human approval")]
#[command(version)]
struct Cli {
    /// Log to stderr at the configured level instead of warnings only
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Config file (default: $STAGECRAFT_HOME/config.toml)
    #[arg(long, global = true, env = "STAGECRAFT_CONFIG")]
    config: Option<PathBuf>,

    /// Keep tables in this directory, overriding the configured backend
    #[arg(long, global = true)]
    catalog_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the available stages
    Stages,

    /// Print the layout of a stage
    Layout {
        /// Stage name
        stage: String,
    },

    /// Submit a stage's form
    Submit {
        /// Stage name
        stage: String,

        /// Field value as component_<n>=value; repeat a key for lists
        #[arg(short = 'f', long = "field")]
        fields: Vec<String>,
    },

    /// Show the pending approval form
    Pending,

    /// Resolve the pending approval
    Approve {
        /// Decision as approve_<item>[_<row>]=approve|reject|pending|ignore
        #[arg(short = 'd', long = "decision")]
        decisions: Vec<String>,

        /// Approve every item and row
        #[arg(long, conflicts_with = "reject_all")]
        approve_all: bool,

        /// Reject every item and row
        #[arg(long)]
        reject_all: bool,
    },

    /// List persisted tables
    Tables,

    /// Print a persisted table
    Show {
        /// Table name
        table: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{:?}", err);
            return ExitCode::from(2);
        }
    };

    let _log_guard = match init_logging(LogConfig {
        app_name: "stagecraft",
        verbose: cli.verbose,
        filter: config.logging.filter.as_deref(),
        log_dir: config.logging.dir.clone(),
    }) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Warning: failed to initialize logging: {:#}", err);
            None
        }
    };
    debug!(?config, "Loaded configuration");

    match run_command(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(1)
        }
    }
}

/// Each invocation is its own process, so tables and the open approval
/// round default to directories under the home directory.
fn load_config(cli: &Cli) -> Result<StagecraftConfig> {
    let mut config = match &cli.config {
        Some(path) => config::load_config(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => config::load_default_config().context("Failed to load config")?,
    };

    if let Some(dir) = &cli.catalog_dir {
        config.catalog.backend = Some(CatalogBackend::Json);
        config.catalog.path = Some(dir.clone());
    }
    let home = config::stagecraft_home().context("Failed to locate home directory")?;
    Ok(config.with_home_defaults(&home))
}

fn run_command(command: Commands, config: &StagecraftConfig) -> Result<()> {
    let tool = cli::demos::build_tool(config)?;
    match command {
        Commands::Stages => cli::stages(&tool),
        Commands::Layout { stage } => cli::layout(&tool, &stage),
        Commands::Submit { stage, fields } => cli::submit(&tool, &stage, &fields),
        Commands::Pending => cli::pending(&tool),
        Commands::Approve {
            decisions,
            approve_all,
            reject_all,
        } => cli::approve(
            &tool,
            &decisions,
            cli::BulkDecision::from_flags(approve_all, reject_all),
        ),
        Commands::Tables => cli::tables(&tool),
        Commands::Show { table } => cli::show(&tool, &table),
    }
}
