//! Storage backends: a directory of JSON files, and an in-memory map

use super::{validate_name, StorageBackend, StorageError, StorageRecord};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const RECORD_EXTENSION: &str = "json";

/// One `<name>.json` file per record
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Open (creating if needed) a storage directory
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, name: &str) -> Result<PathBuf, StorageError> {
        validate_name(name)?;
        Ok(self.root.join(format!("{}.{}", name, RECORD_EXTENSION)))
    }
}

impl StorageBackend for FileStorage {
    fn read(&self, name: &str) -> Result<StorageRecord, StorageError> {
        let path = self.record_path(name)?;
        if !path.exists() {
            return Err(StorageError::NotFound(name.to_string()));
        }
        let contents = fs::read_to_string(&path)?;
        serde_json::from_str(&contents).map_err(|e| StorageError::CorruptRecord(format!("{}: {}", name, e)))
    }

    fn write(&self, name: &str, record: &StorageRecord) -> Result<(), StorageError> {
        let path = self.record_path(name)?;
        let json = serde_json::to_string_pretty(record)?;

        // Write then rename so readers never see a half-written record
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn exists(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.record_path(name)?.exists())
    }

    fn list(&self) -> Result<Vec<String>, StorageError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn remove(&self, name: &str) -> Result<(), StorageError> {
        let path = self.record_path(name)?;
        if !path.exists() {
            return Err(StorageError::NotFound(name.to_string()));
        }
        fs::remove_file(path)?;
        Ok(())
    }
}

/// Process-local backend, handy for tests and ephemeral keyrings
#[derive(Debug, Default)]
pub struct MemoryStorage {
    records: RwLock<BTreeMap<String, StorageRecord>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryStorage {
    fn read(&self, name: &str) -> Result<StorageRecord, StorageError> {
        validate_name(name)?;
        self.records
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(name.to_string()))
    }

    fn write(&self, name: &str, record: &StorageRecord) -> Result<(), StorageError> {
        validate_name(name)?;
        self.records.write().insert(name.to_string(), record.clone());
        Ok(())
    }

    fn exists(&self, name: &str) -> Result<bool, StorageError> {
        validate_name(name)?;
        Ok(self.records.read().contains_key(name))
    }

    fn list(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.records.read().keys().cloned().collect())
    }

    fn remove(&self, name: &str) -> Result<(), StorageError> {
        validate_name(name)?;
        self.records
            .write()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(name.to_string()))
    }
}
