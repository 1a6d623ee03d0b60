use anyhow::Result;
use clap::Args;
use colored::*;

use crate::client::Client;

#[derive(Args)]
pub struct ClearCommand {
    /// Skip the confirmation prompt.
    #[arg(long)]
    pub yes: bool,
}

impl ClearCommand {
    pub async fn execute(&self, client: &Client) -> Result<()> {
        if !self.yes {
            print!("this deletes all indexed data, continue? [y/N] ");
            use std::io::Write;
            std::io::stdout().flush().ok();
            let mut answer = String::new();
            std::io::stdin().read_line(&mut answer)?;
            if !answer.trim().eq_ignore_ascii_case("y") {
                println!("aborted");
                return Ok(());
            }
        }
        client.clear().await?;
        println!("{}", "index cleared".green());
        Ok(())
    }
}
