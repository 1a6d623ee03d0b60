//! `dotmd-indexer` service entry point: the tool-protocol façade over the
//! core engine, exposed as an HTTP/REST surface or a JSON-RPC-over-stdio
//! surface (§6 "Tool-protocol surface"). Both transports share the same
//! `AppState` and the same protocol-independent handlers.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

mod bootstrap;
mod handlers;
mod http;
mod jsonrpc;
mod stdio;

use handlers::AppState;

#[derive(Parser)]
#[command(name = "dotmd-indexer")]
#[command(about = "Tool-protocol service for the dotmd hybrid Markdown retrieval engine")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// HTTP port to bind; ignored in --stdio mode.
    #[arg(long, default_value_t = dotmd_contracts::defaults::SERVER_PORT)]
    port: u16,

    /// Host to bind the HTTP server to.
    #[arg(long, default_value_t = dotmd_contracts::defaults::SERVER_HOST.to_string())]
    host: String,

    /// Run the JSON-RPC-over-stdio surface instead of the HTTP server.
    #[arg(long, short = 's')]
    stdio: bool,

    /// Path to a `dotmd.toml` configuration file.
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Enable verbose (debug-level) logging.
    #[arg(long)]
    verbose: bool,

    /// Emit newline-delimited JSON logs instead of the compact formatter.
    #[arg(long)]
    structured_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    dotmd_observability::init_tracing(&format!("dotmd_indexer={log_level}"), cli.structured_logs);

    let config = match &cli.config {
        Some(path) => dotmd_config::ConfigResolver::with_file(path.clone()).load()?,
        None => dotmd_config::ConfigResolver::new().load()?,
    };
    dotmd_config::validate_config(&config)?;

    info!(index_dir = %config.index_dir.display(), "loading models");
    let models = bootstrap::load_models(&config)?;

    let engine = dotmd_index::Engine::open(config, models).context("opening dotmd index")?;
    let state = AppState {
        engine: Arc::new(engine),
    };

    if cli.stdio {
        stdio::run(state).await?;
        return Ok(());
    }

    let addr: SocketAddr = format!("{}:{}", cli.host, cli.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", cli.host, cli.port))?;
    let timeout = Duration::from_millis(dotmd_contracts::defaults::REQUEST_TIMEOUT_MS);
    let router = http::build_router(state, timeout);

    info!(%addr, "dotmd-indexer listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, router)
        .await
        .context("HTTP server error")?;

    info!("dotmd-indexer stopped");
    Ok(())
}
