//! Document commands.

use super::{status_symbol, with_knowledge_base};
use anyhow::Result;
use colored::Colorize;
use std::path::Path;

pub fn list(config_file: Option<&Path>, agent: &str) -> Result<()> {
    with_knowledge_base(config_file, |kb| {
        let agent = kb.find_agent(agent)?;
        let documents = kb.list_documents(&agent.id)?;

        if documents.is_empty() {
            println!("{} has no documents.", agent.name.cyan());
            println!(
                "Upload one with: {}",
                format!("agentkb upload {} <file>", agent.name).cyan()
            );
            return Ok(());
        }

        println!("{} {}", "Documents of".cyan().bold(), agent.name.cyan().bold());
        println!("{}", "─".repeat(70));

        let db = kb.database();
        for document in &documents {
            let run = db.latest_run_for_document(&document.id)?;
            let chunks = db.count_chunks_by_document(&document.id)?;

            match run {
                Some(run) => println!(
                    "  {} {} {}",
                    status_symbol(run.status),
                    document.file_name.white().bold(),
                    run.describe().dimmed()
                ),
                None => println!("  {} {}", "•".dimmed(), document.file_name.white().bold()),
            }
            println!(
                "    {} {}",
                document.uploaded_at.format("%Y-%m-%d %H:%M").to_string().dimmed(),
                format!("{} chunks", chunks).dimmed()
            );
        }

        println!();
        println!("{} documents", documents.len());
        Ok(())
    })
}

pub fn delete(config_file: Option<&Path>, agent: &str, file_name: &str) -> Result<()> {
    with_knowledge_base(config_file, |kb| {
        let agent = kb.find_agent(agent)?;
        let document = kb.delete_document(&agent.id, file_name)?;

        println!(
            "{} Deleted {} from {}",
            "✓".green(),
            document.file_name,
            agent.name.cyan()
        );
        Ok(())
    })
}
