//! Cryptography Module - primitive backends for the keypair manager
//!
//! Byte-level signature backends (sr25519, ed25519, ecdsa), hashing,
//! password-based encryption and the authenticated key-exchange box.
//! Nothing in here knows about addresses, URIs or keypair provenance.

pub mod ecdsa;
pub mod ed25519;
pub mod encryption;
pub mod exchange;
pub mod hashing;
pub mod sr25519;

pub use encryption::{Argon2Cipher, PasswordCipher};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Invalid seed length: expected {expected} bytes, got {actual}")]
    InvalidSeedLength { expected: usize, actual: usize },

    #[error("Invalid {kind} length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: wrong password or tampered data")]
    DecryptionFailed,

    #[error("Message authentication failed")]
    AuthenticationFailed,

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Check a key slice length, naming the key in the error.
pub(crate) fn expect_len(kind: &'static str, bytes: &[u8], expected: usize) -> Result<(), CryptoError> {
    if bytes.len() != expected {
        return Err(CryptoError::InvalidKeyLength {
            kind,
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}

/// Secure random fixed-size array
pub fn random_array<const N: usize>() -> [u8; N] {
    use rand::RngCore;
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// Derive a key from password using Argon2id
pub fn derive_key_from_password(password: &[u8], salt: &[u8]) -> Result<[u8; 32], CryptoError> {
    use argon2::password_hash::SaltString;
    use argon2::{Argon2, PasswordHasher};

    // Argon2id with recommended parameters
    let argon2 = Argon2::default();

    // Create salt string (needs to be valid base64)
    let salt_b64 = base64::Engine::encode(&base64::engine::general_purpose::STANDARD_NO_PAD, salt);
    let salt_str = SaltString::from_b64(&salt_b64).map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

    let hash = argon2
        .hash_password(password, &salt_str)
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

    let hash_bytes = hash.hash.ok_or(CryptoError::InvalidKey("No hash output".into()))?;
    let bytes = hash_bytes.as_bytes();
    if bytes.len() < 32 {
        return Err(CryptoError::InvalidKey("Hash output too short".into()));
    }

    let mut key = [0u8; 32];
    key.copy_from_slice(&bytes[..32]);
    Ok(key)
}
