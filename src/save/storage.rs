//! Storage backends
//!
//! The save system only needs a flat key -> bytes store. `MemoryBackend`
//! keeps everything in a map; `FileBackend` writes one file per key into a
//! save directory.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::error::SaveError;

/// Flat key -> bytes store with no transactions
pub trait StorageBackend {
    /// Reads a key; `Ok(None)` when nothing is stored under it
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SaveError>;

    /// Writes a key, replacing any previous value
    fn set(&mut self, key: &str, bytes: &[u8]) -> Result<(), SaveError>;

    /// Removes a key; removing an absent key is not an error
    fn remove(&mut self, key: &str) -> Result<(), SaveError>;

    fn contains(&self, key: &str) -> Result<bool, SaveError> {
        Ok(self.get(key)?.is_some())
    }
}

/// In-memory backend
///
/// Counts writes per key and can be told to fail writes, which makes it the
/// backend of choice for tests.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: HashMap<String, Vec<u8>>,
    writes: HashMap<String, usize>,
    fail_writes: bool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total successful `set` calls
    pub fn write_count(&self) -> usize {
        self.writes.values().sum()
    }

    /// Successful `set` calls for one key
    pub fn writes_to(&self, key: &str) -> usize {
        self.writes.get(key).copied().unwrap_or(0)
    }

    /// Makes every following `set` fail with a storage error
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Stored keys, sorted
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SaveError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, bytes: &[u8]) -> Result<(), SaveError> {
        if self.fail_writes {
            return Err(SaveError::StorageError(format!("write to '{}' refused", key)));
        }
        self.entries.insert(key.to_string(), bytes.to_vec());
        *self.writes.entry(key.to_string()).or_insert(0) += 1;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), SaveError> {
        self.entries.remove(key);
        Ok(())
    }

    fn contains(&self, key: &str) -> Result<bool, SaveError> {
        Ok(self.entries.contains_key(key))
    }
}

/// One file per key inside a save directory
#[derive(Debug, Clone)]
pub struct FileBackend {
    directory: PathBuf,
}

impl FileBackend {
    /// Opens a save directory, creating it if it doesn't exist
    pub fn new(directory: impl AsRef<Path>) -> Result<Self, SaveError> {
        let directory = directory.as_ref().to_path_buf();

        if !directory.exists() {
            fs::create_dir_all(&directory)?;
        }

        Ok(FileBackend { directory })
    }

    /// Per-user data directory for saves, e.g. `~/.local/share/crawler_save`
    pub fn default_location() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("crawler_save"))
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Bytes outside `[A-Za-z0-9_-]` become `%XX`, so distinct keys never
    /// share a file and no key can leave the directory
    fn path_for(&self, key: &str) -> PathBuf {
        let mut file_name = String::with_capacity(key.len());
        for byte in key.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
                file_name.push(char::from(byte));
            } else {
                file_name.push_str(&format!("%{:02X}", byte));
            }
        }
        self.directory.join(format!("{}.sav", file_name))
    }
}

impl StorageBackend for FileBackend {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SaveError> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes through a temp file and renames it into place, so a crash
    /// mid-write leaves the previous save intact
    fn set(&mut self, key: &str, bytes: &[u8]) -> Result<(), SaveError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("sav.tmp");

        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), SaveError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn contains(&self, key: &str) -> Result<bool, SaveError> {
        Ok(self.path_for(key).exists())
    }
}
