use anyhow::Result;
use clap::Args;
use colored::*;

use crate::client::Client;

#[derive(Args)]
pub struct IndexCommand {
    /// Root directory of the Markdown corpus to index.
    pub directory: String,

    /// Re-extract and re-embed every file regardless of checksum match.
    #[arg(long)]
    pub force: bool,

    /// Abandon any files not yet started after this many seconds.
    #[arg(long)]
    pub deadline_secs: Option<u64>,
}

impl IndexCommand {
    pub async fn execute(&self, client: &Client) -> Result<()> {
        println!("{} {}", "indexing".blue(), self.directory.cyan());
        let response = client.index(&self.directory, self.force, self.deadline_secs).await?;

        println!(
            "{} {} files indexed, {} failed, {} chunks, {} entities, {} edges",
            "done:".green().bold(),
            response.files_indexed,
            response.files_failed,
            response.chunks,
            response.entities,
            response.edges,
        );
        for error in &response.errors {
            eprintln!("{} {}", "warn:".yellow(), error);
        }
        Ok(())
    }
}
