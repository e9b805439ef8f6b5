//! Keyring Core - multi-scheme cryptographic keypair manager
//!
//! This crate builds Sr25519, Ed25519 and ECDSA identities from seeds,
//! mnemonics or secret URIs with hierarchical derivation, encodes SS58
//! addresses, signs and verifies, encrypts messages between Ed25519 peers
//! and persists keypairs encrypted at rest.

pub mod crypto;
pub mod identity;
pub mod storage;

pub use identity::{Keypair, KeypairBuilder, MnemonicLanguage, SignatureScheme};
pub use storage::{FileStorage, Keystore, MemoryStorage, StorageBackend};

use std::path::Path;
use thiserror::Error;

/// Main error type for keyring operations
#[derive(Error, Debug)]
pub enum KeyringError {
    #[error("Cryptographic error: {0}")]
    Crypto(#[from] crypto::CryptoError),

    #[error("Identity error: {0}")]
    Identity(#[from] identity::IdentityError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, KeyringError>;

/// Defaults applied when building keypairs and opening a keystore
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct KeyringConfig {
    /// Scheme used when none is requested
    pub default_scheme: SignatureScheme,

    /// SS58 network format for new addresses
    pub network_format: u16,

    /// Words in a generated mnemonic (12, 15, 18, 21 or 24)
    pub mnemonic_words: usize,

    /// Mnemonic word list
    pub language: MnemonicLanguage,

    /// Directory for the file keystore
    pub keystore_path: String,
}

impl Default for KeyringConfig {
    fn default() -> Self {
        Self {
            default_scheme: SignatureScheme::Sr25519,
            network_format: identity::address::DEFAULT_NETWORK_FORMAT,
            mnemonic_words: 12,
            language: MnemonicLanguage::English,
            keystore_path: "./keyring_data".to_string(),
        }
    }
}

impl KeyringConfig {
    /// Read a JSON config file; missing fields keep their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents).map_err(|e| KeyringError::Serialization(e.to_string()))
    }

    pub fn builder(&self) -> KeypairBuilder {
        KeypairBuilder::with_config(self)
    }

    /// File keystore rooted at `keystore_path`
    pub fn open_keystore(&self) -> Result<Keystore<FileStorage>> {
        Ok(Keystore::new(FileStorage::new(&self.keystore_path)?))
    }
}
