//! Named keypair store
//!
//! Each keypair is written as a [`StorageRecord`] holding its JSON snapshot,
//! encrypted with a [`PasswordCipher`] when a password is given.

use super::{StorageBackend, StorageError, StorageRecord};
use crate::crypto::{Argon2Cipher, CryptoError, PasswordCipher};
use crate::identity::{IdentityError, Keypair, SignatureScheme};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Serialized form of a keypair. Byte fields are hex without `0x`.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct KeypairSnapshot {
    #[zeroize(skip)]
    pub scheme: SignatureScheme,
    pub public_key: String,
    #[serde(default)]
    pub private_key: Option<String>,
    pub address: String,
    pub network_format: u16,
    #[serde(default)]
    pub mnemonic: Option<String>,
    #[serde(default)]
    pub seed: Option<String>,
    #[serde(default)]
    pub derive_path: Option<String>,
}

impl KeypairSnapshot {
    pub fn from_keypair(keypair: &Keypair) -> Self {
        Self {
            scheme: keypair.scheme(),
            public_key: keypair.public_key_hex(),
            private_key: keypair.private_key().map(hex::encode),
            address: keypair.address().to_string(),
            network_format: keypair.network_format(),
            mnemonic: keypair.mnemonic().map(str::to_string),
            seed: keypair.seed().map(hex::encode),
            derive_path: keypair.derive_path().map(str::to_string),
        }
    }

    /// Rebuild the keypair. Stored keys and address are cross-checked.
    pub fn to_keypair(&self) -> Result<Keypair, StorageError> {
        if self.public_key.is_empty() && self.address.is_empty() && self.private_key.is_none() {
            return Err(IdentityError::MissingKeyMaterial.into());
        }

        let mut builder = Keypair::builder()
            .scheme(self.scheme)
            .network_format(self.network_format);
        if !self.public_key.is_empty() {
            builder = builder.public_key(self.public_key.as_str());
        }
        if !self.address.is_empty() {
            builder = builder.address(&self.address);
        }
        if let Some(private_key) = &self.private_key {
            builder = builder.private_key(private_key.as_str());
        }

        let seed = match &self.seed {
            Some(seed) => Some(Zeroizing::new(
                hex::decode(seed).map_err(|e| StorageError::CorruptRecord(format!("seed: {}", e)))?,
            )),
            None => None,
        };
        let mnemonic = self.mnemonic.as_deref().map(|m| Zeroizing::new(m.to_string()));

        Ok(builder
            .build()?
            .with_provenance(mnemonic, seed, self.derive_path.clone()))
    }
}

/// Keypairs by name on top of a [`StorageBackend`]
pub struct Keystore<S: StorageBackend> {
    backend: S,
    cipher: Box<dyn PasswordCipher>,
}

impl<S: StorageBackend> Keystore<S> {
    /// Keystore using the default Argon2id + AES-256-GCM cipher
    pub fn new(backend: S) -> Self {
        Self::with_cipher(backend, Argon2Cipher)
    }

    pub fn with_cipher(backend: S, cipher: impl PasswordCipher + 'static) -> Self {
        Self {
            backend,
            cipher: Box::new(cipher),
        }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Store `keypair` under `name`, replacing any existing record
    pub fn save(&self, name: &str, keypair: &Keypair, password: Option<&str>) -> Result<(), StorageError> {
        let snapshot = KeypairSnapshot::from_keypair(keypair);
        let json = Zeroizing::new(serde_json::to_string(&snapshot)?);

        let record = match password {
            Some(password) => StorageRecord {
                data: BASE64.encode(self.cipher.encrypt(json.as_bytes(), password)?),
                encrypted: true,
            },
            None => {
                warn!("Storing keypair {} without encryption", name);
                StorageRecord {
                    data: json.to_string(),
                    encrypted: false,
                }
            }
        };

        self.backend.write(name, &record)?;
        info!("Saved {} keypair {} ({})", keypair.scheme(), name, keypair.address());
        Ok(())
    }

    /// Like [`Keystore::save`] but refuses to overwrite
    pub fn save_new(&self, name: &str, keypair: &Keypair, password: Option<&str>) -> Result<(), StorageError> {
        if self.backend.exists(name)? {
            return Err(StorageError::AlreadyExists(name.to_string()));
        }
        self.save(name, keypair, password)
    }

    /// Load `name`. Encrypted records need the password they were saved with.
    pub fn load(&self, name: &str, password: Option<&str>) -> Result<Keypair, StorageError> {
        let record = self.backend.read(name)?;

        let json = if record.encrypted {
            let password = password.ok_or(CryptoError::DecryptionFailed)?;
            let ciphertext = BASE64
                .decode(record.data.as_bytes())
                .map_err(|e| StorageError::CorruptRecord(format!("{}: {}", name, e)))?;
            // Malformed ciphertext is a storage fault; a failed tag check stays a crypto error
            let plaintext = Zeroizing::new(self.cipher.decrypt(&ciphertext, password).map_err(|e| match e {
                CryptoError::InvalidData(reason) => StorageError::CorruptRecord(format!("{}: {}", name, reason)),
                other => StorageError::Crypto(other),
            })?);
            Zeroizing::new(
                String::from_utf8(plaintext.to_vec())
                    .map_err(|e| StorageError::CorruptRecord(format!("{}: {}", name, e)))?,
            )
        } else {
            Zeroizing::new(record.data)
        };

        let snapshot: KeypairSnapshot =
            serde_json::from_str(&json).map_err(|e| StorageError::CorruptRecord(format!("{}: {}", name, e)))?;
        let keypair = snapshot.to_keypair()?.with_storage_path(name);

        info!("Loaded {} keypair {} ({})", keypair.scheme(), name, keypair.address());
        Ok(keypair)
    }

    pub fn exists(&self, name: &str) -> Result<bool, StorageError> {
        self.backend.exists(name)
    }

    pub fn list(&self) -> Result<Vec<String>, StorageError> {
        self.backend.list()
    }

    pub fn delete(&self, name: &str) -> Result<(), StorageError> {
        self.backend.remove(name)?;
        info!("Deleted keypair {}", name);
        Ok(())
    }

    pub fn is_encrypted(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.backend.read(name)?.encrypted)
    }

    /// Load `name` if present, otherwise build a keypair, save it and return it
    pub fn load_or_create<F>(&self, name: &str, password: Option<&str>, create: F) -> Result<Keypair, StorageError>
    where
        F: FnOnce() -> Result<Keypair, IdentityError>,
    {
        if self.backend.exists(name)? {
            return self.load(name, password);
        }

        debug!("Keypair {} not found, creating it", name);
        let keypair = create()?;
        self.save(name, &keypair, password)?;
        Ok(keypair.with_storage_path(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStorage, MemoryStorage};
    use tempfile::TempDir;

    fn alice() -> Keypair {
        Keypair::from_uri("//Alice", SignatureScheme::Sr25519).unwrap()
    }

    #[test]
    fn test_save_load_plain() {
        let store = Keystore::new(MemoryStorage::new());
        let keypair = alice();

        store.save("alice", &keypair, None).unwrap();
        assert!(!store.is_encrypted("alice").unwrap());

        let loaded = store.load("alice", None).unwrap();
        assert_eq!(loaded.address(), keypair.address());
        assert_eq!(loaded.private_key(), keypair.private_key());
        assert_eq!(loaded.mnemonic(), keypair.mnemonic());
        assert_eq!(loaded.derive_path(), Some("//Alice"));
        assert_eq!(loaded.storage_path(), Some("alice"));
    }

    #[test]
    fn test_plain_record_is_hex_json() {
        let store = Keystore::new(MemoryStorage::new());
        let keypair = Keypair::from_seed(&[1u8; 32], SignatureScheme::Ed25519, 42).unwrap();
        store.save("ed", &keypair, None).unwrap();

        let record = store.backend().read("ed").unwrap();
        let value: serde_json::Value = serde_json::from_str(&record.data).unwrap();
        assert_eq!(value["public_key"], keypair.public_key_hex());
        assert_eq!(value["seed"], hex::encode([1u8; 32]));
        assert_eq!(value["scheme"], "ed25519");
    }

    #[test]
    fn test_save_load_encrypted() {
        let store = Keystore::new(MemoryStorage::new());
        let keypair = Keypair::generate(SignatureScheme::Ecdsa).unwrap();

        store.save("eth", &keypair, Some("hunter2")).unwrap();
        assert!(store.is_encrypted("eth").unwrap());

        let record = store.backend().read("eth").unwrap();
        assert!(!record.data.contains(keypair.address()));

        let loaded = store.load("eth", Some("hunter2")).unwrap();
        assert_eq!(loaded.address(), keypair.address());
        assert_eq!(loaded.private_key(), keypair.private_key());

        assert!(matches!(
            store.load("eth", Some("wrong")),
            Err(StorageError::Crypto(CryptoError::DecryptionFailed))
        ));
        assert!(matches!(
            store.load("eth", None),
            Err(StorageError::Crypto(CryptoError::DecryptionFailed))
        ));
    }

    #[test]
    fn test_verify_only_keypair_roundtrip() {
        let store = Keystore::new(MemoryStorage::new());
        let watcher = Keypair::from_address(alice().address(), SignatureScheme::Sr25519).unwrap();

        store.save("watch", &watcher, None).unwrap();
        let loaded = store.load("watch", None).unwrap();
        assert!(loaded.is_verify_only());
        assert_eq!(loaded.public_key(), watcher.public_key());
    }

    #[test]
    fn test_corrupt_and_tampered_records() {
        let store = Keystore::new(MemoryStorage::new());
        store
            .backend()
            .write(
                "junk",
                &StorageRecord {
                    data: "not json".into(),
                    encrypted: false,
                },
            )
            .unwrap();
        assert!(matches!(store.load("junk", None), Err(StorageError::CorruptRecord(_))));

        // Snapshot whose address belongs to another key
        let mut snapshot = KeypairSnapshot::from_keypair(&alice());
        snapshot.address = Keypair::from_uri("//Bob", SignatureScheme::Sr25519)
            .unwrap()
            .address()
            .to_string();
        assert!(matches!(
            snapshot.to_keypair(),
            Err(StorageError::Identity(IdentityError::InvalidAddress(_)))
        ));

        let mut empty = KeypairSnapshot::from_keypair(&alice());
        empty.public_key.clear();
        empty.address.clear();
        empty.private_key = None;
        assert!(matches!(
            empty.to_keypair(),
            Err(StorageError::Identity(IdentityError::MissingKeyMaterial))
        ));
    }

    #[test]
    fn test_truncated_ciphertext_is_corrupt() {
        let store = Keystore::new(MemoryStorage::new());
        store
            .backend()
            .write(
                "short",
                &StorageRecord {
                    data: BASE64.encode([0u8; 10]),
                    encrypted: true,
                },
            )
            .unwrap();
        assert!(matches!(store.load("short", Some("pw")), Err(StorageError::CorruptRecord(_))));

        store
            .backend()
            .write(
                "not-base64",
                &StorageRecord {
                    data: "%%%".into(),
                    encrypted: true,
                },
            )
            .unwrap();
        assert!(matches!(
            store.load("not-base64", Some("pw")),
            Err(StorageError::CorruptRecord(_))
        ));
    }

    #[test]
    fn test_save_new_list_delete() {
        let dir = TempDir::new().unwrap();
        let store = Keystore::new(FileStorage::new(dir.path()).unwrap());
        let keypair = alice();

        store.save_new("alice", &keypair, None).unwrap();
        assert!(matches!(
            store.save_new("alice", &keypair, None),
            Err(StorageError::AlreadyExists(_))
        ));
        store.save("bob", &Keypair::from_uri("//Bob", SignatureScheme::Sr25519).unwrap(), None).unwrap();

        assert_eq!(store.list().unwrap(), vec!["alice".to_string(), "bob".to_string()]);
        assert!(store.exists("alice").unwrap());

        store.delete("alice").unwrap();
        assert!(!store.exists("alice").unwrap());
        assert!(matches!(store.load("alice", None), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_load_or_create() {
        let store = Keystore::new(MemoryStorage::new());

        let created = store
            .load_or_create("node", Some("pw"), || Keypair::generate(SignatureScheme::Ed25519))
            .unwrap();
        assert_eq!(created.storage_path(), Some("node"));

        let loaded = store
            .load_or_create("node", Some("pw"), || panic!("must not create twice"))
            .unwrap();
        assert_eq!(loaded.address(), created.address());
        assert_eq!(loaded.mnemonic(), created.mnemonic());
    }
}
