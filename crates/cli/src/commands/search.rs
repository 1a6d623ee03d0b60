use anyhow::Result;
use clap::Args;
use colored::*;

use crate::client::Client;
use crate::output::OutputFormatter;

#[derive(Args)]
pub struct SearchCommand {
    /// Search query.
    pub query: String,

    /// Retrieval mode: hybrid, semantic, bm25, graph.
    #[arg(short, long)]
    pub mode: Option<String>,

    /// Maximum number of results to return.
    #[arg(short, long)]
    pub top_k: Option<usize>,

    /// Skip cross-encoder reranking.
    #[arg(long)]
    pub no_rerank: bool,

    /// Skip query expansion.
    #[arg(long)]
    pub no_expand: bool,

    /// Output format: table, json, simple.
    #[arg(short, long, default_value = "table")]
    pub format: String,
}

impl SearchCommand {
    pub async fn execute(&self, client: &Client) -> Result<()> {
        let response = client
            .search(
                &self.query,
                self.mode.clone(),
                self.top_k,
                Some(!self.no_rerank),
                Some(!self.no_expand),
            )
            .await?;

        if response.results.is_empty() {
            println!("{} no results for '{}'", "—".dimmed(), self.query);
            return Ok(());
        }

        OutputFormatter::new(&self.format).display_search_results(&response)?;
        println!("{}", format!("{} results", response.total).green());
        Ok(())
    }
}
