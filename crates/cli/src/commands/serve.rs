use anyhow::Result;
use clap::Args;
use colored::*;

use crate::client::Client;

/// Runs the `dotmd-indexer` service in the foreground, spawned as a
/// subprocess rather than embedded.
#[derive(Args)]
pub struct ServeCommand {
    /// HTTP port to bind.
    #[arg(short, long, default_value_t = dotmd_contracts::defaults::SERVER_PORT)]
    pub port: u16,

    /// Run the JSON-RPC-over-stdio surface instead of the HTTP server.
    #[arg(long)]
    pub stdio: bool,

    /// Path to the `dotmd.toml` configuration file to pass through.
    #[arg(long)]
    pub config: Option<String>,
}

impl ServeCommand {
    pub async fn execute(&self, _client: &Client) -> Result<()> {
        println!("{} dotmd-indexer", "starting".blue());
        let mut cmd = std::process::Command::new("dotmd-indexer");
        if self.stdio {
            cmd.arg("--stdio");
        } else {
            cmd.args(["--port", &self.port.to_string()]);
        }
        if let Some(config) = &self.config {
            cmd.args(["--config", config]);
        }
        let status = cmd.status()?;
        if !status.success() {
            anyhow::bail!("dotmd-indexer exited with {status}");
        }
        Ok(())
    }
}
