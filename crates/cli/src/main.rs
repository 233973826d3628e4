//! # Recall CLI
//!
//! Keeps a folder of notes and documents indexed for semantic retrieval.
//!
//! ## Commands
//!
//! - `recall index [--force]` - Index the configured folder
//! - `recall search <QUERY>` - Rank stored chunks against a question
//! - `recall watch` - Index, then keep the store in sync with the folder
//! - `recall stats` - Show store and cache statistics
//!
//! Settings come from `recall.toml` (see the one at the repository root).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod app;
mod commands;
mod config;

use app::App;
use config::RecallConfig;

#[derive(Parser)]
#[command(name = "recall")]
#[command(about = "Semantic retrieval over a folder of documents")]
#[command(version)]
struct Cli {
    /// Path to the config file
    #[arg(short, long, global = true, default_value = "recall.toml")]
    config: PathBuf,

    /// Folder to index, overriding `context.folder`
    #[arg(short, long, global = true)]
    folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index every supported file in the folder
    Index {
        /// Re-parse and re-embed files even when they are unchanged
        #[arg(long)]
        force: bool,
    },

    /// Retrieve the chunks most similar to a query
    Search {
        query: String,

        /// Maximum number of results
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Minimum similarity score
        #[arg(short, long, allow_negative_numbers = true)]
        threshold: Option<f32>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Index the folder and reindex files as they change
    Watch,

    /// Show store statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();

    let mut config = RecallConfig::load(&cli.config)
        .with_context(|| format!("loading config {}", cli.config.display()))?;
    if let Some(folder) = cli.folder {
        config.context.folder = folder;
    }

    let app = App::build(config).await?;

    match cli.command {
        Commands::Index { force } => commands::index(&app, force).await,
        Commands::Search {
            query,
            top_k,
            threshold,
            json,
        } => commands::search(&app, &query, top_k, threshold, json).await,
        Commands::Watch => commands::watch(&app).await,
        Commands::Stats => commands::stats(&app).await,
    }
}
