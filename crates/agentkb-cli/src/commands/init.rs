//! Initialize agentkb.

use super::load_config;
use agentkb_config::Config;
use agentkb_db::Database;
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

pub fn run(config_file: Option<&Path>) -> Result<()> {
    let (_config, paths) = load_config(config_file)?;

    if paths.is_initialized() {
        println!("{} agentkb is already initialized.", "Note:".yellow().bold());
        println!("  Config: {}", paths.config_file.display());
        println!("  Database: {}", paths.database_file.display());
        return Ok(());
    }

    println!("{}", "Initializing agentkb...".cyan().bold());

    paths.ensure_dirs().context("Failed to create directories")?;
    println!("  {} Created directories", "✓".green());

    if !paths.config_file.exists() {
        Config::create_default_file(&paths.config_file).context("Failed to create config file")?;
        println!(
            "  {} Created config: {}",
            "✓".green(),
            paths.config_file.display()
        );
    }

    Database::open(&paths.database_file).context("Failed to initialize database")?;
    println!(
        "  {} Created database: {}",
        "✓".green(),
        paths.database_file.display()
    );
    println!(
        "  {} Document storage: {}",
        "✓".green(),
        paths.blob_dir.display()
    );

    println!();
    println!("{}", "agentkb initialized successfully!".green().bold());
    println!();
    println!("Next steps:");
    println!(
        "  1. Create an agent: {}",
        "agentkb agent create support --prompt \"You answer customer questions.\"".cyan()
    );
    println!(
        "  2. Upload a document: {}",
        "agentkb upload support ~/Documents/handbook.pdf".cyan()
    );
    println!(
        "  3. Ask a question: {}",
        "agentkb ask support \"What is the refund policy?\"".cyan()
    );

    Ok(())
}
