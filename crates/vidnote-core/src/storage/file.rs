//! File-based key-value store.

use super::{KeyValueStore, StorageError, StorageResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Stores each key as a file in a directory.
pub struct FileKeyValue {
    /// Base directory for stored values.
    base_path: PathBuf,
}

impl FileKeyValue {
    /// Create a store rooted at `base_path`.
    ///
    /// Creates the directory if it doesn't exist.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                StorageError::Io(format!("Failed to create storage directory: {}", e))
            })?;
        }
        Ok(Self { base_path })
    }

    /// Platform data directory for the store.
    ///
    /// On Linux: `~/.local/share/vidnote/storage/`
    /// On Windows: `%LOCALAPPDATA%\vidnote\storage\`
    pub fn default_dir() -> StorageResult<PathBuf> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;
        Ok(base.join("vidnote").join("storage"))
    }

    /// Create a store in the default location.
    pub fn default_location() -> StorageResult<Self> {
        Self::new(Self::default_dir()?)
    }

    fn key_path(&self, key: &str) -> PathBuf {
        let safe_key: String = key
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.base_path.join(format!("{}.json", safe_key))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

impl KeyValueStore for FileKeyValue {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.key_path(key);
        if !path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&path)
            .map(Some)
            .map_err(|e| StorageError::Io(format!("Failed to read {}: {}", path.display(), e)))
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.key_path(key);
        fs::write(&path, value)
            .map_err(|e| StorageError::Io(format!("Failed to write {}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_store_set_get() {
        let dir = tempdir().unwrap();
        let store = FileKeyValue::new(dir.path().to_path_buf()).unwrap();

        store.set("video-annotations", "[]").unwrap();
        assert_eq!(store.get("video-annotations").unwrap().as_deref(), Some("[]"));
        assert!(dir.path().join("video-annotations.json").exists());
    }

    #[test]
    fn test_file_store_missing_key() {
        let dir = tempdir().unwrap();
        let store = FileKeyValue::new(dir.path().to_path_buf()).unwrap();
        assert_eq!(store.get("nonexistent").unwrap(), None);
    }

    #[test]
    fn test_keys_are_sanitized() {
        let dir = tempdir().unwrap();
        let store = FileKeyValue::new(dir.path().to_path_buf()).unwrap();

        store.set("../escape", "x").unwrap();
        assert!(dir.path().join("___escape.json").exists());
        assert_eq!(store.get("../escape").unwrap().as_deref(), Some("x"));
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = FileKeyValue::new(nested.clone()).unwrap();
        assert_eq!(store.base_path(), nested.as_path());
        assert!(nested.is_dir());
    }
}
