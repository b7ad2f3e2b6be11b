//! Key-value storage for snapshot text
//!
//! - `MemoryStorage`: in-process map, for tests and embedding
//! - `FileStorage`: one JSON file per key in a save directory, with
//!   optional timestamped backups

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::types::SaveError;

/// Where snapshot text is persisted
pub trait SaveStorage {
    fn write(&mut self, key: &str, text: &str) -> Result<(), SaveError>;

    /// Returns None if nothing is stored under `key`
    fn read(&self, key: &str) -> Result<Option<String>, SaveError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
    writes: usize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful writes so far
    pub fn write_count(&self) -> usize {
        self.writes
    }

    pub fn insert(&mut self, key: impl Into<String>, text: impl Into<String>) {
        self.entries.insert(key.into(), text.into());
    }
}

impl SaveStorage for MemoryStorage {
    fn write(&mut self, key: &str, text: &str) -> Result<(), SaveError> {
        self.entries.insert(key.to_string(), text.to_string());
        self.writes += 1;
        Ok(())
    }

    fn read(&self, key: &str) -> Result<Option<String>, SaveError> {
        Ok(self.entries.get(key).cloned())
    }
}

/// Stores each key as `<key>.json` in a directory
pub struct FileStorage {
    save_directory: PathBuf,
    backups: usize,
}

impl FileStorage {
    /// Creates a FileStorage in the given directory
    ///
    /// The directory will be created if it doesn't exist.
    pub fn new(save_directory: impl AsRef<Path>) -> Result<Self, SaveError> {
        let save_dir = save_directory.as_ref().to_path_buf();

        if !save_dir.exists() {
            fs::create_dir_all(&save_dir)?;
        }

        Ok(FileStorage {
            save_directory: save_dir,
            backups: 0,
        })
    }

    /// Platform data directory, falling back to `./saves`
    pub fn default_directory() -> PathBuf {
        dirs::data_dir()
            .map(|p| p.join("scene-save"))
            .unwrap_or_else(|| PathBuf::from("./saves"))
    }

    /// Keep the previous N versions of each key as backups
    pub fn with_backups(mut self, keep_count: usize) -> Self {
        self.backups = keep_count;
        self
    }

    pub fn directory(&self) -> &Path {
        &self.save_directory
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.save_directory.join(format!("{}.json", key))
    }

    /// Backup files for a key, newest first
    pub fn list_backups(&self, key: &str) -> Result<Vec<PathBuf>, SaveError> {
        let mut backups: Vec<PathBuf> = fs::read_dir(&self.save_directory)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|f| f.to_str())
                    .map(|name| is_backup_of(name, key))
                    .unwrap_or(false)
            })
            .collect();

        // Timestamped names sort chronologically
        backups.sort();
        backups.reverse();
        Ok(backups)
    }

    /// Copies the current file to a timestamped backup
    fn backup_current(&self, key: &str, current: &Path) -> Result<(), SaveError> {
        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S%.3f");
        let backup = self
            .save_directory
            .join(format!("{}.{}.bak.json", key, timestamp));
        fs::copy(current, &backup)?;
        Ok(())
    }

    /// Drops all but the newest backups; failures are logged, never fatal
    fn prune_backups(&self, key: &str) {
        let backups = match self.list_backups(key) {
            Ok(backups) => backups,
            Err(e) => {
                log::warn!("Could not list backups for '{}': {}", key, e);
                return;
            }
        };
        for old in backups.iter().skip(self.backups) {
            if let Err(e) = fs::remove_file(old) {
                log::warn!("Could not remove old backup {}: {}", old.display(), e);
            }
        }
    }
}

/// `<key>.<timestamp>.bak.json`, where the timestamp is digits, `_` and `.`
fn is_backup_of(file_name: &str, key: &str) -> bool {
    file_name
        .strip_prefix(key)
        .and_then(|rest| rest.strip_prefix('.'))
        .and_then(|rest| rest.strip_suffix(".bak.json"))
        .map(|stamp| {
            !stamp.is_empty()
                && stamp
                    .chars()
                    .all(|c| c.is_ascii_digit() || c == '_' || c == '.')
        })
        .unwrap_or(false)
}

impl SaveStorage for FileStorage {
    fn write(&mut self, key: &str, text: &str) -> Result<(), SaveError> {
        let path = self.path_for(key);
        let tmp = self.save_directory.join(format!("{}.json.tmp", key));

        // Never leave a truncated save behind
        fs::write(&tmp, text)?;

        let rotate = self.backups > 0 && path.exists();
        if rotate {
            if let Err(e) = self.backup_current(key, &path) {
                let _ = fs::remove_file(&tmp);
                return Err(e);
            }
        }
        // The previous save stays in place until this rename lands
        fs::rename(&tmp, &path)?;

        if rotate {
            self.prune_backups(key);
        }

        log::debug!("Wrote {} bytes to {}", text.len(), path.display());
        Ok(())
    }

    fn read(&self, key: &str) -> Result<Option<String>, SaveError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&path)?))
    }
}
