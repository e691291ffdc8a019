//! CLI command implementations.

pub mod agent;
pub mod ask;
pub mod config;
pub mod docs;
pub mod init;
pub mod process;
pub mod status;
pub mod upload;

use agentkb_config::{AppPaths, Config};
use agentkb_core::{IngestionRun, RunStatus};
use agentkb_pipeline::KnowledgeBase;
use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::debug;

/// Get the application paths, honoring an explicit config file.
pub fn get_paths(config_file: Option<&Path>) -> Result<AppPaths> {
    let paths = AppPaths::new().context("Failed to determine application directories")?;
    Ok(match config_file {
        Some(file) => {
            let expanded = shellexpand::tilde(&file.to_string_lossy()).into_owned();
            paths.with_config_file(PathBuf::from(expanded))
        }
        None => paths,
    })
}

/// Load the configuration and the paths it resolves to.
pub fn load_config(config_file: Option<&Path>) -> Result<(Config, AppPaths)> {
    let paths = get_paths(config_file)?;
    let config = Config::load_from(&paths.config_file).with_context(|| {
        format!("Failed to load config from {}", paths.config_file.display())
    })?;
    let paths = config.resolve_paths(paths);
    Ok((config, paths))
}

/// Load the configuration, ensuring agentkb is initialized.
pub fn load_initialized(config_file: Option<&Path>) -> Result<(Config, AppPaths)> {
    let (config, paths) = load_config(config_file)?;

    if !paths.is_initialized() {
        anyhow::bail!("agentkb is not initialized. Run 'agentkb init' first.");
    }

    Ok((config, paths))
}

pub fn runtime() -> Result<Runtime> {
    Runtime::new().context("Failed to create async runtime")
}

/// Open the knowledge base. Must be called from within the runtime.
pub fn open_knowledge_base(config: &Config, paths: &AppPaths) -> Result<KnowledgeBase> {
    debug!("Opening knowledge base at {}", paths.database_file.display());
    KnowledgeBase::open(config, paths).context("Failed to open knowledge base")
}

/// Run a synchronous command against the knowledge base.
pub fn with_knowledge_base<T>(
    config_file: Option<&Path>,
    f: impl FnOnce(&KnowledgeBase) -> Result<T>,
) -> Result<T> {
    let (config, paths) = load_initialized(config_file)?;
    let rt = runtime()?;

    rt.block_on(async {
        let kb = open_knowledge_base(&config, &paths)?;
        let result = f(&kb);
        kb.shutdown().await;
        result
    })
}

pub fn spinner(message: impl Into<String>) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

/// Status symbol used in run listings.
pub fn status_symbol(status: RunStatus) -> colored::ColoredString {
    match status {
        RunStatus::Pending => "○".yellow(),
        RunStatus::Processing => "◐".blue(),
        RunStatus::Done => "●".green(),
        RunStatus::Failed => "✗".red(),
    }
}

/// Print one line for a run, plus its error when it failed.
pub fn print_run(run: &IngestionRun, agent_name: Option<&str>) {
    let owner = agent_name
        .map(|name| format!(" [{}]", name))
        .unwrap_or_default();
    println!(
        "  {} {}{} {}",
        status_symbol(run.status),
        run.file_name,
        owner.dimmed(),
        run.describe().dimmed()
    );
    if let Some(ref err) = run.error {
        println!("    {}", err.dimmed());
    }
}

/// Format a file size in human-readable form.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
