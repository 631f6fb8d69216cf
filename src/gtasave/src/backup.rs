//! Backups of saves before they are overwritten.
//!
//! A backup is taken once per distinct file. A sidecar JSON file remembers the
//! hash of the file when it was backed up and the hash of the last file this
//! tool wrote, so re-running over our own output does not clobber the backup
//! of the real original.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupMetadata {
    /// SHA-256 of the file that was backed up
    pub original_hash: String,
    /// SHA-256 of the last file written over it
    pub last_write_hash: String,
}

impl BackupMetadata {
    pub fn new(hash: String) -> Self {
        Self {
            original_hash: hash.clone(),
            last_write_hash: hash,
        }
    }

    /// Whether `hash` is a file we already know about
    pub fn tracks(&self, hash: &str) -> bool {
        self.original_hash == hash || self.last_write_hash == hash
    }
}

/// Where the backup of a file is kept
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupPaths {
    pub backup: PathBuf,
    pub metadata: PathBuf,
}

impl BackupPaths {
    /// `<file>.bak` and `<file>.bak.json`
    ///
    /// The suffix is appended to the full name since save names such as
    /// `GTASAsf1.b` already carry an extension.
    pub fn for_file(path: &Path) -> Self {
        Self {
            backup: with_suffix(path, ".bak"),
            metadata: with_suffix(path, ".bak.json"),
        }
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

pub fn hash_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

pub fn hash_file(path: &Path) -> Result<String, BackupError> {
    Ok(hash_bytes(&fs::read(path)?))
}

pub fn read_metadata(path: &Path) -> Result<Option<BackupMetadata>, BackupError> {
    if !path.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&text)?))
}

pub fn write_metadata(path: &Path, metadata: &BackupMetadata) -> Result<(), BackupError> {
    fs::write(path, serde_json::to_string_pretty(metadata)?)?;
    Ok(())
}

/// Whether `file` needs a fresh backup
///
/// A backup without metadata is never overwritten. Otherwise a new backup is
/// due only when the file matches neither tracked hash, meaning someone put a
/// different save there.
pub fn needs_backup(file: &Path, paths: &BackupPaths) -> Result<bool, BackupError> {
    if !paths.backup.exists() {
        return Ok(true);
    }
    let Some(metadata) = read_metadata(&paths.metadata)? else {
        return Ok(false);
    };
    Ok(!metadata.tracks(&hash_file(file)?))
}

/// Back up `file` if it exists and is not already covered
///
/// Returns the backup path when a new backup was written.
pub fn backup_before_write(file: &Path) -> Result<Option<PathBuf>, BackupError> {
    if !file.exists() {
        return Ok(None);
    }

    let paths = BackupPaths::for_file(file);
    if !needs_backup(file, &paths)? {
        tracing::debug!(file = %file.display(), "backup already covers this file");
        return Ok(None);
    }

    fs::copy(file, &paths.backup)?;
    write_metadata(&paths.metadata, &BackupMetadata::new(hash_file(file)?))?;
    tracing::info!(backup = %paths.backup.display(), "created backup");
    Ok(Some(paths.backup))
}

/// Record the hash of the bytes just written to `file`
///
/// Does nothing when `file` has never been backed up.
pub fn record_write(file: &Path, written: &[u8]) -> Result<(), BackupError> {
    let paths = BackupPaths::for_file(file);
    let Some(mut metadata) = read_metadata(&paths.metadata)? else {
        return Ok(());
    };
    metadata.last_write_hash = hash_bytes(written);
    write_metadata(&paths.metadata, &metadata)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_bytes() {
        // SHA-256 of the empty string
        assert_eq!(
            hash_bytes(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(hash_bytes(b"save").len(), 64);
    }

    #[test]
    fn test_paths_keep_extension() {
        let paths = BackupPaths::for_file(Path::new("/tmp/GTASAsf1.b"));
        assert_eq!(paths.backup, PathBuf::from("/tmp/GTASAsf1.b.bak"));
        assert_eq!(paths.metadata, PathBuf::from("/tmp/GTASAsf1.b.bak.json"));
    }

    #[test]
    fn test_missing_file_is_not_backed_up() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("GTASAsf1.b");
        assert_eq!(backup_before_write(&file).unwrap(), None);
    }

    #[test]
    fn test_backup_once_then_track_writes() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("GTASAsf1.b");
        fs::write(&file, b"original").unwrap();

        let backup = backup_before_write(&file).unwrap().unwrap();
        assert_eq!(fs::read(&backup).unwrap(), b"original");

        // our own output replaces the file
        fs::write(&file, b"modded").unwrap();
        record_write(&file, b"modded").unwrap();
        assert_eq!(backup_before_write(&file).unwrap(), None);
        assert_eq!(fs::read(&backup).unwrap(), b"original");

        let metadata = read_metadata(&BackupPaths::for_file(&file).metadata)
            .unwrap()
            .unwrap();
        assert_eq!(metadata.original_hash, hash_bytes(b"original"));
        assert_eq!(metadata.last_write_hash, hash_bytes(b"modded"));
    }

    #[test]
    fn test_replaced_file_gets_new_backup() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("GTASAsf1.b");
        fs::write(&file, b"original").unwrap();
        backup_before_write(&file).unwrap();

        fs::write(&file, b"another save").unwrap();
        let backup = backup_before_write(&file).unwrap().unwrap();
        assert_eq!(fs::read(backup).unwrap(), b"another save");
    }

    #[test]
    fn test_backup_without_metadata_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("GTASAsf1.b");
        let paths = BackupPaths::for_file(&file);
        fs::write(&file, b"current").unwrap();
        fs::write(&paths.backup, b"hand made").unwrap();

        assert!(!needs_backup(&file, &paths).unwrap());
        assert_eq!(backup_before_write(&file).unwrap(), None);
        assert_eq!(fs::read(&paths.backup).unwrap(), b"hand made");
    }

    #[test]
    fn test_record_write_without_backup() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("GTASAsf1.b");
        record_write(&file, b"data").unwrap();
        assert!(!BackupPaths::for_file(&file).metadata.exists());
    }
}
