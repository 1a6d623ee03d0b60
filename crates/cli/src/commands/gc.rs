use anyhow::Result;
use clap::Args;
use colored::*;

use crate::client::Client;

/// Removes entities left with no remaining edges. Not part of the hot
/// ingestion path; run this periodically, not after every `dotmd index`.
#[derive(Args)]
pub struct GcCommand;

impl GcCommand {
    pub async fn execute(&self, client: &Client) -> Result<()> {
        let removed = client.gc().await?;
        println!("{} {} orphan entities removed", "done:".green().bold(), removed);
        Ok(())
    }
}
