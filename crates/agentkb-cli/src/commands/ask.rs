//! Ask command - grounded question answering.

use super::{load_initialized, open_knowledge_base, runtime, spinner};
use agentkb_ollama::OllamaClient;
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

/// Run the ask command.
pub fn run(config_file: Option<&Path>, agent: &str, question: &str, show_sources: bool) -> Result<()> {
    let (config, paths) = load_initialized(config_file)?;

    let client = OllamaClient::from_config(&config.ollama)
        .context("Failed to create Ollama client")?;

    let rt = runtime()?;

    if !rt.block_on(client.is_available()) {
        anyhow::bail!(
            "Ollama is not running at {}. Start it with 'ollama serve'.",
            config.ollama.host
        );
    }

    rt.block_on(async {
        let kb = open_knowledge_base(&config, &paths)?;
        let agent = kb.find_agent(agent)?;

        println!("{} {}", "Agent:".cyan().bold(), agent.name);
        println!("{} {}", "Question:".cyan().bold(), question);
        println!("{}", "─".repeat(70));
        println!();

        let pb = spinner("Thinking...")?;
        let answer = kb.ask(&agent.id, question).await;
        pb.finish_and_clear();
        kb.shutdown().await;
        let answer = answer?;

        println!("{}", answer.text);

        if show_sources && answer.has_sources() {
            println!();
            println!("{}", "Sources".white().bold());
            for (i, source) in answer.sources.iter().enumerate() {
                println!("  {} {}", format!("[{}]", i + 1).dimmed(), source);
            }
        }

        Ok(())
    })
}
