use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;

mod bootstrap;
mod client;
mod commands;
mod output;

use client::Client;
use commands::*;

#[derive(Parser)]
#[command(name = "dotmd")]
#[command(about = "Hybrid Markdown retrieval: index, search, and serve a corpus of notes")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a `dotmd.toml` configuration file; defaults to `./dotmd.toml` if present.
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Talk to a running `dotmd-indexer` service at this URL instead of
    /// driving the engine in-process (e.g. `http://localhost:8088`).
    #[arg(long, global = true)]
    server: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Index Markdown documents from a directory.
    Index(index::IndexCommand),
    /// Search the index.
    Search(search::SearchCommand),
    /// Show index statistics.
    Status(status::StatusCommand),
    /// Delete all indexed data.
    Clear(clear::ClearCommand),
    /// Remove entities with no remaining edges. In-process only.
    Gc(gc::GcCommand),
    /// Run the dotmd-indexer service (HTTP + JSON-RPC over stdio).
    Serve(serve::ServeCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    dotmd_observability::init_tracing(&format!("dotmd={log_level}"), false);

    let result = run(cli).await;

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => dotmd_config::ConfigResolver::with_file(path.clone()).load()?,
        None => dotmd_config::ConfigResolver::new().load()?,
    };
    dotmd_config::validate_config(&config)?;

    let client = match &cli.server {
        Some(url) => Client::http(url.clone())?,
        None => Client::in_process(config).await?,
    };

    match cli.command {
        Commands::Index(cmd) => cmd.execute(&client).await,
        Commands::Search(cmd) => cmd.execute(&client).await,
        Commands::Status(cmd) => cmd.execute(&client).await,
        Commands::Clear(cmd) => cmd.execute(&client).await,
        Commands::Gc(cmd) => cmd.execute(&client).await,
        Commands::Serve(cmd) => cmd.execute(&client).await,
    }
}
