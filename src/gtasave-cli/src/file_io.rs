//! I/O helpers for reading inputs and replacing outputs

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

pub fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Hidden sibling of `path` used while writing it
fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `data` next to `path` and rename it into place
///
/// `path` is either left untouched or fully replaced.
pub fn write_replacing(path: &Path, data: &[u8]) -> Result<()> {
    let temp = temp_path(path);

    let result = fs::write(&temp, data)
        .with_context(|| format!("Failed to write temp file {}", temp.display()))
        .and_then(|()| {
            fs::rename(&temp, path)
                .with_context(|| format!("Failed to move output into place at {}", path.display()))
        });

    if result.is_err() {
        let _ = fs::remove_file(&temp);
    }
    result
}
