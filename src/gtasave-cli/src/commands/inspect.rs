//! Inspect command handler

use anyhow::{Context, Result};
use gtasave::SaveSummary;
use std::path::Path;

use crate::file_io;

pub fn handle(input: &Path, json: bool) -> Result<()> {
    let save = file_io::read_file(input)?;
    let summary = gtasave::inspect(&save)
        .with_context(|| format!("Failed to decode {}", input.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", format_summary(&summary));
    }

    Ok(())
}

fn format_summary(summary: &SaveSummary) -> String {
    let mut out = String::new();
    let mut line = |text: String| {
        out.push_str(&text);
        out.push('\n');
    };

    line(format!("Platform: {}", summary.platform));
    line(format!("Version: {:#010x}", summary.version));
    line(format!("Last mission passed: {}", summary.last_mission_passed));
    line(format!("Game time: {} ms", summary.game_time_ms));
    line(format!(
        "File: {} bytes, checksum {}",
        summary.file_len,
        if summary.checksum_valid { "ok" } else { "INVALID" }
    ));
    match summary.packed_store_size {
        Some(packed) if packed != summary.store_size => line(format!(
            "Global store: {} bytes (packed copy says {})",
            summary.store_size, packed
        )),
        _ => line(format!("Global store: {} bytes", summary.store_size)),
    }
    line(format!(
        "Brains: {} ({} with scripts)",
        summary.brains, summary.script_brains
    ));
    line(format!("Running scripts: {}", summary.scripts.len()));

    for script in &summary.scripts {
        line(format!(
            "  {:<8} index {:#06x} ip {:>6}{}{}",
            script.name,
            script.index,
            script.instruction_pointer,
            if script.is_active { " active" } else { "" },
            if script.is_mission { " mission" } else { "" },
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use gtasave::ScriptSummary;

    fn summary() -> SaveSummary {
        SaveSummary {
            platform: "PC".to_string(),
            version: 0x35DA_8AFE,
            last_mission_passed: "Big Smoke".to_string(),
            game_time_ms: 1000,
            file_len: 202_752,
            checksum_valid: true,
            store_size: 60_000,
            packed_store_size: Some(60_000),
            brains: 70,
            script_brains: 3,
            scripts: vec![ScriptSummary {
                name: "embed".to_string(),
                index: 0,
                is_mission: false,
                is_active: true,
                instruction_pointer: 40_000,
            }],
        }
    }

    #[test]
    fn test_format_summary() {
        let text = format_summary(&summary());
        assert!(text.contains("Platform: PC"));
        assert!(text.contains("checksum ok"));
        assert!(text.contains("Global store: 60000 bytes\n"));
        assert!(text.contains("embed"));
        assert!(text.contains(" active"));
        assert!(!text.contains("mission\n"));
    }

    #[test]
    fn test_format_flags_packed_mismatch() {
        let mut summary = summary();
        summary.packed_store_size = Some(40_000);
        summary.checksum_valid = false;
        let text = format_summary(&summary);
        assert!(text.contains("packed copy says 40000"));
        assert!(text.contains("INVALID"));
    }

    #[test]
    fn test_missing_file() {
        assert!(handle(Path::new("/nonexistent/GTASAsf1.b"), false).is_err());
    }
}
