//! Storage Module - keypair persistence
//!
//! Keypairs are stored as [`StorageRecord`]s through a [`StorageBackend`]
//! handle, optionally password-encrypted. The vendor-compatible encrypted
//! JSON export lives in [`export`].

mod backend;
pub mod export;
mod keystore;

pub use backend::{FileStorage, MemoryStorage};
pub use export::{EncryptedExportRecord, ExportEncoding, ExportMeta};
pub use keystore::{KeypairSnapshot, Keystore};

use crate::crypto::CryptoError;
use crate::identity::IdentityError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Key already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid key name: {0}")]
    InvalidName(String),

    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Cryptographic error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

/// The unit written to and read from a storage backend.
///
/// `data` is the JSON keypair snapshot, or its base64 ciphertext when
/// `encrypted` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRecord {
    pub data: String,
    #[serde(default)]
    pub encrypted: bool,
}

/// Where records live. Names are flat identifiers, not paths.
pub trait StorageBackend: Send + Sync {
    fn read(&self, name: &str) -> Result<StorageRecord, StorageError>;

    fn write(&self, name: &str, record: &StorageRecord) -> Result<(), StorageError>;

    fn exists(&self, name: &str) -> Result<bool, StorageError>;

    /// Stored names, sorted
    fn list(&self) -> Result<Vec<String>, StorageError>;

    fn remove(&self, name: &str) -> Result<(), StorageError>;
}

/// Reject names that could escape the backend's namespace
pub(crate) fn validate_name(name: &str) -> Result<(), StorageError> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidName(name.to_string()))
    }
}
