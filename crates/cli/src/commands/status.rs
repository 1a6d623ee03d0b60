use anyhow::Result;
use clap::Args;

use crate::client::Client;

#[derive(Args)]
pub struct StatusCommand {
    /// Output format: table, json.
    #[arg(short, long, default_value = "table")]
    pub format: String,
}

impl StatusCommand {
    pub async fn execute(&self, client: &Client) -> Result<()> {
        let status = client.status().await?;
        if self.format == "json" {
            println!("{}", serde_json::to_string_pretty(&status)?);
            return Ok(());
        }
        println!("files:        {}", status.files);
        println!("chunks:       {}", status.chunks);
        println!("entities:     {}", status.entities);
        println!("edges:        {}", status.edges);
        println!(
            "last indexed: {}",
            status.last_indexed.as_deref().unwrap_or("never")
        );
        Ok(())
    }
}
