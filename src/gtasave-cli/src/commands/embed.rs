//! Embed command handler
//!
//! The default operation: `gtasave <save> [<script>] <output>`.

use anyhow::{Context, Result};
use gtasave::{InjectOptions, InjectReport, OpcodeTable, ScmDecoder};
use std::fs;
use std::path::Path;

use crate::cli::EmbedArgs;
use crate::config::Config;
use crate::file_io;

pub fn handle(args: &EmbedArgs) -> Result<()> {
    let config = Config::load()?;
    let report = run(args, &config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, args.output());
    }

    Ok(())
}

/// Flags first, then the config file, then built-in defaults
pub fn inject_options(args: &EmbedArgs, config: &Config) -> InjectOptions {
    let defaults = InjectOptions::default();
    InjectOptions {
        script_name: args
            .name
            .clone()
            .or_else(|| config.script_name.clone())
            .unwrap_or(defaults.script_name),
        store_size: args
            .store_size
            .or(config.store_size)
            .unwrap_or(defaults.store_size),
        strict_relocation: args.strict,
    }
}

/// Built-in opcodes, with the INI at `path` layered on top
pub fn load_decoder(path: Option<&Path>) -> Result<ScmDecoder> {
    let mut table = OpcodeTable::builtin();

    if let Some(path) = path {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read opcode table {}", path.display()))?;
        let extra = OpcodeTable::parse_ini(&text)
            .with_context(|| format!("Failed to parse opcode table {}", path.display()))?;
        tracing::debug!(opcodes = extra.len(), "loaded opcode table");
        table.merge(extra);
    }

    Ok(ScmDecoder::new(table))
}

pub fn run(args: &EmbedArgs, config: &Config) -> Result<InjectReport> {
    let save = file_io::read_file(args.save())?;
    let output = args.output();

    let injection = match args.script() {
        Some(script) => {
            let code = file_io::read_file(script)?;
            let decoder = load_decoder(args.opcodes.as_deref().or(config.opcodes.as_deref()))?;
            let options = inject_options(args, config);
            gtasave::inject(&save, &code, &options, &decoder).context("Failed to embed script")?
        }
        None => gtasave::rewrite(&save).context("Failed to rewrite save")?,
    };

    if !args.no_backup {
        gtasave::backup_before_write(output).context("Failed to back up existing output")?;
    }

    file_io::write_replacing(output, &injection.bytes)?;

    if !args.no_backup {
        gtasave::record_write(output, &injection.bytes)
            .context("Failed to update backup metadata")?;
    }

    Ok(injection.report)
}

fn print_report(report: &InjectReport, output: &Path) {
    println!("Platform: {}", report.platform);

    if let (Some(position), Some(name)) = (report.position, &report.script_name) {
        println!(
            "Global store: {} -> {} bytes",
            report.old_store_size, report.new_store_size
        );
        println!("Embedded '{}' at byte {}", name, position);
    }

    if let Some(relocation) = &report.relocation {
        println!(
            "Relocated {} of {} instructions",
            relocation.patched.len(),
            relocation.instructions
        );
        for issue in &relocation.issues {
            println!("Warning: {:?}", issue);
        }
    }

    println!("Running scripts: {}", report.running_scripts);
    println!(
        "Wrote {} bytes to {} (checksum {:#010x})",
        report.output_len,
        output.display(),
        report.checksum
    );
}
