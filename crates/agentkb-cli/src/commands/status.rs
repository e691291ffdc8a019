//! Status command - show ingestion runs.

use super::{print_run, with_knowledge_base};
use agentkb_core::{RunCounts, RunStatus};
use anyhow::Result;
use colored::Colorize;
use std::collections::HashMap;
use std::path::Path;

const MAX_LISTED: usize = 20;

pub fn run(config_file: Option<&Path>, agent: Option<String>, status: Option<String>) -> Result<()> {
    let status = status.as_deref().map(RunStatus::parse).transpose()?;

    with_knowledge_base(config_file, |kb| {
        let agent = agent.as_deref().map(|a| kb.find_agent(a)).transpose()?;
        let agent_id = agent.as_ref().map(|a| a.id.as_str());

        let counts = match agent_id {
            None => kb.run_counts()?,
            Some(id) => tally(kb.runs(Some(id), None)?.iter().map(|run| run.status)),
        };

        match &agent {
            Some(agent) => println!(
                "{} {}",
                "Ingestion Status of".cyan().bold(),
                agent.name.cyan().bold()
            ),
            None => println!("{}", "Ingestion Status".cyan().bold()),
        }
        println!("{}", "─".repeat(50));

        println!();
        println!("  {} Pending: {}", "○".yellow(), counts.pending);
        println!("  {} Processing: {}", "◐".blue(), counts.processing);
        println!("  {} Completed: {}", "●".green(), counts.done);
        if counts.failed > 0 {
            println!("  {} Failed: {}", "✗".red(), counts.failed);
        }

        let runs = kb.runs(agent_id, status)?;
        if runs.is_empty() {
            println!();
            if counts.total() == 0 {
                println!(
                    "{}",
                    "Nothing ingested yet. Use 'agentkb upload <agent> <file>' to add documents."
                        .dimmed()
                );
            } else {
                println!("{}", "No matching runs.".dimmed());
            }
            return Ok(());
        }

        let names: HashMap<String, String> = kb
            .list_agents()?
            .into_iter()
            .map(|summary| (summary.agent.id, summary.agent.name))
            .collect();

        println!();
        println!("{}", "Recent Runs".white().bold());
        for run in runs.iter().take(MAX_LISTED) {
            let owner = if agent.is_some() {
                None
            } else {
                names.get(&run.tenant_id).map(String::as_str)
            };
            print_run(run, owner);
        }
        if runs.len() > MAX_LISTED {
            println!("  {}", format!("...and {} more", runs.len() - MAX_LISTED).dimmed());
        }

        if counts.pending > 0 {
            println!();
            println!(
                "{}",
                "Pending documents are ingested by 'agentkb process'.".dimmed()
            );
        }

        Ok(())
    })
}

fn tally(statuses: impl Iterator<Item = RunStatus>) -> RunCounts {
    let mut counts = RunCounts::default();
    for status in statuses {
        match status {
            RunStatus::Pending => counts.pending += 1,
            RunStatus::Processing => counts.processing += 1,
            RunStatus::Done => counts.done += 1,
            RunStatus::Failed => counts.failed += 1,
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally() {
        let counts = tally(
            [RunStatus::Done, RunStatus::Failed, RunStatus::Done, RunStatus::Pending].into_iter(),
        );
        assert_eq!(counts.done, 2);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.pending, 1);
        assert_eq!(counts.total(), 4);
    }
}
