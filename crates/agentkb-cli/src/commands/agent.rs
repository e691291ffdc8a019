//! Agent management commands.

use super::{status_symbol, with_knowledge_base};
use agentkb_core::{AgentUpdate, RunStatus};
use anyhow::Result;
use colored::Colorize;
use std::path::Path;

pub fn create(config_file: Option<&Path>, name: &str, prompt: &str) -> Result<()> {
    with_knowledge_base(config_file, |kb| {
        let agent = kb.create_agent(name, prompt)?;

        println!("{} Created agent: {}", "✓".green(), agent.name.cyan());
        println!("  ID: {}", agent.id.dimmed());
        println!();
        println!(
            "Upload documents with: {}",
            format!("agentkb upload {} <file>", agent.name).cyan()
        );
        Ok(())
    })
}

pub fn list(config_file: Option<&Path>) -> Result<()> {
    with_knowledge_base(config_file, |kb| {
        let agents = kb.list_agents()?;

        if agents.is_empty() {
            println!("{}", "No agents yet.".dimmed());
            println!(
                "Create one with: {}",
                "agentkb agent create <name> --prompt <system prompt>".cyan()
            );
            return Ok(());
        }

        println!("{}", "Agents".cyan().bold());
        println!("{}", "─".repeat(70));

        for summary in &agents {
            let agent = &summary.agent;
            println!(
                "  {} {} {}",
                "•".cyan(),
                agent.name.white().bold(),
                format!("({} documents)", summary.document_count).dimmed()
            );
            println!(
                "    {} {}",
                agent.id.dimmed(),
                agent.created_at.format("%Y-%m-%d").to_string().dimmed()
            );
        }

        println!();
        println!("{} agents", agents.len());
        Ok(())
    })
}

pub fn show(config_file: Option<&Path>, agent: &str) -> Result<()> {
    with_knowledge_base(config_file, |kb| {
        let agent = kb.find_agent(agent)?;
        let documents = kb.list_documents(&agent.id)?;
        let chunks = kb.database().count_chunks_by_tenant(&agent.id)?;
        let runs = kb.runs(Some(&agent.id), None)?;

        println!("{}", agent.name.cyan().bold());
        println!("{}", "─".repeat(70));
        println!("  {} {}", "ID:".dimmed(), agent.id);
        println!(
            "  {} {}",
            "Created:".dimmed(),
            agent.created_at.format("%Y-%m-%d %H:%M")
        );
        if let Some(updated) = agent.updated_at {
            println!("  {} {}", "Updated:".dimmed(), updated.format("%Y-%m-%d %H:%M"));
        }
        println!("  {} {}", "Documents:".dimmed(), documents.len());
        println!("  {} {}", "Chunks:".dimmed(), chunks);

        println!();
        println!("{}", "System Prompt".white().bold());
        for line in agent.system_prompt.lines() {
            println!("  {}", line);
        }

        if !documents.is_empty() {
            println!();
            println!("{}", "Documents".white().bold());
            for document in &documents {
                let status = runs
                    .iter()
                    .find(|run| run.document_id == document.id)
                    .map(|run| run.status)
                    .unwrap_or(RunStatus::Pending);
                println!("  {} {}", status_symbol(status), document.file_name);
            }
        }

        Ok(())
    })
}

pub fn update(
    config_file: Option<&Path>,
    agent: &str,
    name: Option<String>,
    prompt: Option<String>,
) -> Result<()> {
    let update = AgentUpdate {
        name,
        system_prompt: prompt,
    };
    if update.is_empty() {
        anyhow::bail!("Nothing to update. Pass --name and/or --prompt.");
    }

    with_knowledge_base(config_file, |kb| {
        let agent = kb.find_agent(agent)?;
        let updated = kb.update_agent(&agent.id, &update)?;

        println!("{} Updated agent: {}", "✓".green(), updated.name.cyan());
        Ok(())
    })
}

pub fn delete(config_file: Option<&Path>, agent: &str) -> Result<()> {
    with_knowledge_base(config_file, |kb| {
        let agent = kb.find_agent(agent)?;
        kb.delete_agent(&agent.id)?;

        println!(
            "{} Deleted agent {} and all of its documents",
            "✓".green(),
            agent.name.cyan()
        );
        Ok(())
    })
}
