//! CodeGraph CLI — incremental symbol-graph indexing and search.
//!
//! # Usage
//!
//! ```bash
//! # Index a repository
//! codegraph index .
//!
//! # Search the codebase
//! codegraph search keyword "cache eviction"
//! codegraph search semantic "how do we retry failed requests"
//!
//! # Inspect the import graph
//! codegraph graph cycles
//! codegraph graph impact src/lib.rs
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use codegraph_config::ConfigOverrides;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod adapters;
mod commands;

/// CodeGraph — incremental symbol-graph indexing and search.
#[derive(Parser, Debug)]
#[command(name = "codegraph")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOptions,
}

/// Global options available to all commands.
#[derive(Args, Debug, Clone)]
pub struct GlobalOptions {
    /// Workspace root to operate on.
    #[arg(long, short = 'w', global = true, env = "CODEGRAPH_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Override the index data directory.
    #[arg(long, global = true, env = "CODEGRAPH_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Enable verbose (debug) logging.
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Suppress non-essential output.
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Override the semantic search similarity threshold.
    #[arg(long, global = true)]
    pub similarity_threshold: Option<f32>,

    /// Force-disable embedding generation for this invocation.
    #[arg(long, global = true)]
    pub skip_embeddings: bool,
}

impl GlobalOptions {
    /// Convert global options to config overrides.
    pub fn to_config_overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            workspace_root: self.workspace.clone(),
            data_dir: self.data_dir.clone(),
            log_level: None,
            similarity_threshold: self.similarity_threshold,
            skip_embeddings: self.skip_embeddings.then_some(true),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Index (or incrementally reindex) a repository.
    Index(commands::index::IndexArgs),

    /// Search the indexed codebase.
    #[command(subcommand)]
    Search(commands::search::SearchCommand),

    /// Query the import graph.
    #[command(subcommand)]
    Graph(commands::graph::GraphCommand),

    /// Show aggregate index statistics.
    Stats,

    /// Delete all indexed data for this workspace.
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.global.quiet {
        Level::ERROR
    } else if cli.global.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Index(args) => commands::index::execute(args, &cli.global).await,
        Commands::Search(cmd) => commands::search::execute(cmd, &cli.global).await,
        Commands::Graph(cmd) => commands::graph::execute(cmd, &cli.global).await,
        Commands::Stats => commands::stats::execute_stats(&cli.global).await,
        Commands::Clear => commands::stats::execute_clear(&cli.global).await,
    }
}
