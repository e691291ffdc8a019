//! Configuration commands.

use super::{get_paths, load_config};
use anyhow::{Context, Result};
use agentkb_config::Config;
use colored::Colorize;
use std::path::Path;

pub fn show(config_file: Option<&Path>) -> Result<()> {
    let paths = get_paths(config_file)?;

    println!("{}", "Current Configuration".cyan().bold());
    println!("{}", "─".repeat(50));

    if paths.config_file.exists() {
        let contents = std::fs::read_to_string(&paths.config_file)
            .context("Failed to read config file")?;
        println!("{}", contents);
    } else {
        println!(
            "{}",
            "No config file yet, showing defaults. Run 'agentkb init' to create one.".dimmed()
        );
        println!();
        println!("{}", Config::default_config_string());
    }

    Ok(())
}

pub fn path(config_file: Option<&Path>) -> Result<()> {
    let (_config, paths) = load_config(config_file)?;

    println!("{}", paths.config_file.display());
    if paths.is_initialized() {
        println!("  {} {}", "Database:".dimmed(), paths.database_file.display());
        println!("  {} {}", "Documents:".dimmed(), paths.blob_dir.display());
    }

    Ok(())
}

pub fn set(config_file: Option<&Path>, key: &str, value: &str) -> Result<()> {
    let paths = get_paths(config_file)?;

    let mut config = Config::load_from(&paths.config_file).context("Failed to load config")?;
    config.set_value(key, value)?;
    config
        .save_to(&paths.config_file)
        .context("Failed to save config")?;

    println!("{} Set {} = {}", "✓".green(), key.cyan(), value);

    Ok(())
}
