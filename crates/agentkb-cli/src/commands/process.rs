//! Process command - ingest queued and interrupted documents.

use super::{load_initialized, open_knowledge_base, print_run, runtime, spinner};
use agentkb_core::RunStatus;
use anyhow::Result;
use colored::Colorize;
use std::path::Path;

pub fn run(config_file: Option<&Path>, retry_failed: bool) -> Result<()> {
    let (config, paths) = load_initialized(config_file)?;
    let rt = runtime()?;

    rt.block_on(async {
        let mut kb = open_knowledge_base(&config, &paths)?;

        if retry_failed {
            let reset = kb.retry_failed(None)?;
            if reset > 0 {
                println!("{} Retrying {} failed runs", "↻".cyan(), reset);
            }
        }

        let before = kb.run_counts()?;
        let queued = kb.resume_pending().await?;
        if queued == 0 {
            kb.shutdown().await;
            println!("{}", "Nothing to process.".dimmed());
            return Ok(());
        }

        let pb = spinner(format!("Ingesting {} documents", queued))?;
        kb.flush().await;
        pb.finish_and_clear();

        let after = kb.run_counts()?;
        let failed = kb.runs(None, Some(RunStatus::Failed))?;
        kb.shutdown().await;

        let succeeded = (after.done - before.done).max(0);
        let newly_failed = (after.failed - before.failed).max(0);
        println!("{} Processed {} documents", "✓".green(), queued);
        println!("  {} Completed: {}", "●".green(), succeeded);
        if newly_failed > 0 {
            println!("  {} Failed: {}", "✗".red(), newly_failed);
            println!();
            println!("{}", "Failed Runs".red().bold());
            for run in failed.iter().take(newly_failed as usize) {
                print_run(run, None);
            }
        }

        Ok(())
    })
}
