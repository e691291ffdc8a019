//! Upload command - store a document and ingest it.

use super::{format_size, load_initialized, open_knowledge_base, runtime, spinner};
use agentkb_core::RunStatus;
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};

pub fn run(config_file: Option<&Path>, agent: &str, file: &str, detach: bool) -> Result<()> {
    let path = PathBuf::from(shellexpand::tilde(file).into_owned());
    if !path.is_file() {
        anyhow::bail!("File not found: {}", path.display());
    }

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .context("Invalid file name")?
        .to_string();
    let bytes = std::fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    let size = bytes.len() as u64;

    let (config, paths) = load_initialized(config_file)?;
    let rt = runtime()?;

    rt.block_on(async {
        let mut kb = open_knowledge_base(&config, &paths)?;
        let agent = kb.find_agent(agent)?;

        let (document, run_id) = kb.upload_document(&agent.id, &file_name, bytes).await?;
        println!(
            "{} Uploaded {} ({}) to {}",
            "✓".green(),
            document.file_name,
            format_size(size),
            agent.name.cyan()
        );

        if detach {
            println!("  Run: {}", run_id.dimmed());
            println!(
                "{}",
                "Queued. Use 'agentkb process' to ingest it and 'agentkb status' to follow it."
                    .dimmed()
            );
            return Ok(());
        }

        let pb = spinner(format!("Ingesting {}", document.file_name))?;
        kb.flush().await;
        let run = kb.run(&run_id)?;
        kb.shutdown().await;

        match run.status {
            RunStatus::Done => {
                pb.finish_with_message(format!(
                    "{} {} ({} chunks)",
                    "✓".green(),
                    document.file_name,
                    run.chunk_count
                ));
                Ok(())
            }
            _ => {
                pb.finish_and_clear();
                anyhow::bail!(
                    "Ingestion of {} {}: {}",
                    document.file_name,
                    run.describe(),
                    run.error.as_deref().unwrap_or("unknown error")
                )
            }
        }
    })
}
