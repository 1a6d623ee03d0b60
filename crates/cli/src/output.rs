use colored::*;
use comfy_table::{ContentArrangement, Table};
use dotmd_contracts::SearchResponse;

pub struct OutputFormatter {
    format: String,
}

impl OutputFormatter {
    pub fn new(format: &str) -> Self {
        Self {
            format: format.to_string(),
        }
    }

    pub fn display_search_results(&self, response: &SearchResponse) -> anyhow::Result<()> {
        match self.format.as_str() {
            "json" => {
                println!("{}", serde_json::to_string_pretty(response)?);
            }
            "simple" => {
                for (i, result) in response.results.iter().enumerate() {
                    println!(
                        "{}. {} (score: {:.3})",
                        i + 1,
                        result.file_path.green().bold(),
                        result.score
                    );
                    println!("   {}", result.snippet.dimmed());
                }
            }
            _ => {
                let mut table = Table::new();
                table
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_header(vec!["#", "file", "heading", "score", "snippet"]);
                for (i, result) in response.results.iter().enumerate() {
                    table.add_row(vec![
                        (i + 1).to_string(),
                        result.file_path.clone(),
                        result.heading_path.join(" > "),
                        format!("{:.3}", result.score),
                        truncate(&result.snippet, 80),
                    ]);
                }
                println!("{table}");
            }
        }
        Ok(())
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        format!("{}…", text.chars().take(max_chars).collect::<String>())
    }
}
