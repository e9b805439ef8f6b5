//! Password-based encryption
//!
//! Two constructions live here:
//! - [`Argon2Cipher`]: Argon2id + AES-256-GCM, used for keystore records at rest.
//! - scrypt + XSalsa20-Poly1305 secret box, used by the vendor export format.

use super::{random_array, CryptoError};
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use crypto_secretbox::XSalsa20Poly1305;
use zeroize::Zeroizing;

const NONCE_SIZE: usize = 12;
const SALT_SIZE: usize = 16;
const TAG_SIZE: usize = 16;

pub const SECRETBOX_NONCE_SIZE: usize = 24;
pub const SECRETBOX_KEY_SIZE: usize = 32;

/// Upper bounds for scrypt parameters read from untrusted headers
const SCRYPT_MAX_N: u32 = 1 << 20;
const SCRYPT_MAX_R: u32 = 8;
const SCRYPT_MAX_P: u32 = 4;

/// Password-keyed symmetric cipher used for data at rest.
///
/// Implementations must fail with [`CryptoError::DecryptionFailed`] on a wrong
/// password or tampered input, and with [`CryptoError::InvalidData`] when the
/// input is too short to be a ciphertext at all.
pub trait PasswordCipher: Send + Sync {
    fn encrypt(&self, plaintext: &[u8], password: &str) -> Result<Vec<u8>, CryptoError>;

    fn decrypt(&self, ciphertext: &[u8], password: &str) -> Result<Vec<u8>, CryptoError>;
}

/// Argon2id key derivation with AES-256-GCM
///
/// Output format: salt (16 bytes) || nonce (12 bytes) || ciphertext || tag (16 bytes)
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Cipher;

impl PasswordCipher for Argon2Cipher {
    fn encrypt(&self, plaintext: &[u8], password: &str) -> Result<Vec<u8>, CryptoError> {
        let salt: [u8; SALT_SIZE] = random_array();
        let nonce_bytes: [u8; NONCE_SIZE] = random_array();

        let key = Zeroizing::new(super::derive_key_from_password(password.as_bytes(), &salt)?);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key[..]));

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        let mut result = Vec::with_capacity(SALT_SIZE + NONCE_SIZE + ciphertext.len());
        result.extend_from_slice(&salt);
        result.extend_from_slice(&nonce_bytes);
        result.extend_from_slice(&ciphertext);

        Ok(result)
    }

    fn decrypt(&self, ciphertext: &[u8], password: &str) -> Result<Vec<u8>, CryptoError> {
        if ciphertext.len() < SALT_SIZE + NONCE_SIZE + TAG_SIZE {
            return Err(CryptoError::InvalidData("Ciphertext too short".into()));
        }

        let (salt, rest) = ciphertext.split_at(SALT_SIZE);
        let (nonce, encrypted_data) = rest.split_at(NONCE_SIZE);

        let key = Zeroizing::new(super::derive_key_from_password(password.as_bytes(), salt)?);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key[..]));

        cipher
            .decrypt(Nonce::from_slice(nonce), encrypted_data)
            .map_err(|_| CryptoError::DecryptionFailed)
    }
}

/// scrypt parameters as carried in the vendor export header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScryptParams {
    pub n: u32,
    pub p: u32,
    pub r: u32,
}

impl Default for ScryptParams {
    fn default() -> Self {
        Self { n: 1 << 15, p: 1, r: 8 }
    }
}

impl ScryptParams {
    /// Header layout: n || p || r, each u32 little endian
    pub fn to_bytes(self) -> [u8; 12] {
        let mut out = [0u8; 12];
        out[0..4].copy_from_slice(&self.n.to_le_bytes());
        out[4..8].copy_from_slice(&self.p.to_le_bytes());
        out[8..12].copy_from_slice(&self.r.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != 12 {
            return Err(CryptoError::InvalidData("scrypt header must be 12 bytes".into()));
        }
        let word = |i: usize| u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
        Ok(Self {
            n: word(0),
            p: word(4),
            r: word(8),
        })
    }

    /// Reject parameters that are malformed or too costly to evaluate
    pub fn validate(&self) -> Result<(), CryptoError> {
        if !self.n.is_power_of_two() || self.n < 2 {
            return Err(CryptoError::InvalidData(format!("scrypt N must be a power of two, got {}", self.n)));
        }
        if self.n > SCRYPT_MAX_N || self.r == 0 || self.r > SCRYPT_MAX_R || self.p == 0 || self.p > SCRYPT_MAX_P {
            return Err(CryptoError::InvalidData(format!(
                "scrypt parameters out of range: N={} r={} p={}",
                self.n, self.r, self.p
            )));
        }
        Ok(())
    }
}

/// Derive a 64-byte scrypt key; callers use the first 32 bytes
pub fn scrypt_key(
    password: &[u8],
    salt: &[u8],
    params: ScryptParams,
) -> Result<Zeroizing<[u8; 64]>, CryptoError> {
    params.validate()?;
    let log_n = params.n.trailing_zeros() as u8;
    let scrypt_params = scrypt::Params::new(log_n, params.r, params.p, 64)
        .map_err(|e| CryptoError::InvalidData(e.to_string()))?;

    let mut out = Zeroizing::new([0u8; 64]);
    scrypt::scrypt(password, salt, &scrypt_params, &mut out[..])
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
    Ok(out)
}

/// NaCl `secretbox`: returns nonce (24 bytes) || ciphertext
pub fn secretbox_seal(
    key: &[u8; SECRETBOX_KEY_SIZE],
    nonce: &[u8; SECRETBOX_NONCE_SIZE],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = XSalsa20Poly1305::new(crypto_secretbox::Key::from_slice(key));
    let ciphertext = cipher
        .encrypt(crypto_secretbox::Nonce::from_slice(nonce), plaintext)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let mut result = Vec::with_capacity(SECRETBOX_NONCE_SIZE + ciphertext.len());
    result.extend_from_slice(nonce);
    result.extend_from_slice(&ciphertext);
    Ok(result)
}

/// Inverse of [`secretbox_seal`]
pub fn secretbox_open(key: &[u8; SECRETBOX_KEY_SIZE], sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if sealed.len() < SECRETBOX_NONCE_SIZE + TAG_SIZE {
        return Err(CryptoError::InvalidData("Sealed box too short".into()));
    }
    let (nonce, ciphertext) = sealed.split_at(SECRETBOX_NONCE_SIZE);
    let cipher = XSalsa20Poly1305::new(crypto_secretbox::Key::from_slice(key));
    cipher
        .decrypt(crypto_secretbox::Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)
}
