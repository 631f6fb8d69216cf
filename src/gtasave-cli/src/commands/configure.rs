//! Configuration command handlers
//!
//! Handles the `configure` subcommand for setting up gtasave defaults.

use anyhow::{Context, Result};
use gtasave::OpcodeTable;
use std::fs;
use std::path::PathBuf;

use crate::config::Config;

/// Handle the configure command
pub fn handle(
    opcodes: Option<PathBuf>,
    store_size: Option<u32>,
    name: Option<String>,
    show: bool,
) -> Result<()> {
    let mut config = Config::load()?;

    if show {
        show_config(&config);
        return Ok(());
    }

    if opcodes.is_none() && store_size.is_none() && name.is_none() {
        show_usage();
        return Ok(());
    }

    apply(&mut config, opcodes, store_size, name)?;
    config.save()?;

    show_config(&config);
    if let Ok(path) = Config::config_path() {
        println!("Config saved to: {}", path.display());
    }

    Ok(())
}

/// Validate and store the given settings
fn apply(
    config: &mut Config,
    opcodes: Option<PathBuf>,
    store_size: Option<u32>,
    name: Option<String>,
) -> Result<()> {
    if let Some(path) = opcodes {
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read opcode table {}", path.display()))?;
        OpcodeTable::parse_ini(&text)
            .with_context(|| format!("Failed to parse opcode table {}", path.display()))?;
        config.opcodes = Some(path);
    }

    if let Some(size) = store_size {
        config.store_size = Some(size);
    }

    if let Some(name) = name {
        if name.len() > 8 {
            println!("Note: script names are truncated to 8 bytes");
        }
        config.script_name = Some(name);
    }

    Ok(())
}

fn show_config(config: &Config) {
    match &config.opcodes {
        Some(path) => println!("Opcode table: {}", path.display()),
        None => println!("Opcode table: built-in"),
    }
    match config.store_size {
        Some(size) => println!("Store size: {} bytes", size),
        None => println!("Store size: default"),
    }
    match &config.script_name {
        Some(name) => println!("Script name: {}", name),
        None => println!("Script name: default"),
    }

    if let Ok(path) = Config::config_path() {
        println!("Config file: {}", path.display());
    }
}

fn show_usage() {
    println!("Usage: gtasave configure [--opcodes SASCM.ini] [--store-size BYTES] [--name NAME]");
    println!("   or: gtasave configure --show");
}
