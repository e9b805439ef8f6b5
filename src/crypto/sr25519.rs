//! Schnorr signatures over Ristretto25519 (schnorrkel)
//!
//! Secret keys are the 64-byte schnorrkel encoding (`key || nonce`).
//! All signatures use the `substrate` signing context.

use super::{expect_len, CryptoError};
use schnorrkel::derive::{ChainCode, Derivation};
use schnorrkel::{ExpansionMode, MiniSecretKey, PublicKey, SecretKey, Signature};

pub const PUBLIC_KEY_LENGTH: usize = 32;
pub const SECRET_KEY_LENGTH: usize = 64;
pub const SEED_LENGTH: usize = 32;
pub const SIGNATURE_LENGTH: usize = 64;

const SIGNING_CTX: &[u8] = b"substrate";

/// Derived key pair bytes: (public, secret)
pub type PairBytes = ([u8; PUBLIC_KEY_LENGTH], [u8; SECRET_KEY_LENGTH]);

fn secret_from_bytes(secret: &[u8]) -> Result<SecretKey, CryptoError> {
    expect_len("sr25519 secret key", secret, SECRET_KEY_LENGTH)?;
    SecretKey::from_bytes(secret).map_err(|e| CryptoError::InvalidKey(e.to_string()))
}

fn public_from_bytes(public: &[u8]) -> Result<PublicKey, CryptoError> {
    expect_len("sr25519 public key", public, PUBLIC_KEY_LENGTH)?;
    PublicKey::from_bytes(public).map_err(|e| CryptoError::InvalidKey(e.to_string()))
}

/// Expand a 32-byte mini secret into a key pair
pub fn pair_from_seed(seed: &[u8]) -> Result<PairBytes, CryptoError> {
    if seed.len() != SEED_LENGTH {
        return Err(CryptoError::InvalidSeedLength {
            expected: SEED_LENGTH,
            actual: seed.len(),
        });
    }
    let mini = MiniSecretKey::from_bytes(seed).map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
    let keypair = mini.expand_to_keypair(ExpansionMode::Ed25519);
    Ok((keypair.public.to_bytes(), keypair.secret.to_bytes()))
}

pub fn public_from_secret(secret: &[u8]) -> Result<[u8; PUBLIC_KEY_LENGTH], CryptoError> {
    Ok(secret_from_bytes(secret)?.to_public().to_bytes())
}

pub fn sign(public: &[u8], secret: &[u8], message: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let secret = secret_from_bytes(secret)?;
    let public = public_from_bytes(public)?;
    Ok(secret.sign_simple(SIGNING_CTX, message, &public).to_bytes().to_vec())
}

/// Malformed signatures or keys verify as `false`.
pub fn verify(signature: &[u8], message: &[u8], public: &[u8]) -> bool {
    let Ok(public) = public_from_bytes(public) else {
        return false;
    };
    let Ok(signature) = Signature::from_bytes(signature) else {
        return false;
    };
    public.verify_simple(SIGNING_CTX, message, &signature).is_ok()
}

/// Hard derivation: needs the parent secret, ignores the parent public key
pub fn hard_derive(chain_code: &[u8; 32], secret: &[u8]) -> Result<PairBytes, CryptoError> {
    let parent = secret_from_bytes(secret)?;
    let (mini, _) = parent.hard_derive_mini_secret_key(Some(ChainCode(*chain_code)), b"");
    let child = mini.expand_to_keypair(ExpansionMode::Ed25519);
    Ok((child.public.to_bytes(), child.secret.to_bytes()))
}

/// Soft derivation of a full key pair.
///
/// The child nonce is randomized, so only the public half is reproducible.
pub fn soft_derive(chain_code: &[u8; 32], secret: &[u8]) -> Result<PairBytes, CryptoError> {
    let parent = secret_from_bytes(secret)?.to_keypair();
    let (child, _) = parent.derived_key_simple(ChainCode(*chain_code), b"");
    Ok((child.public.to_bytes(), child.secret.to_bytes()))
}

/// Soft derivation from the public key alone (watch-only)
pub fn soft_derive_public(chain_code: &[u8; 32], public: &[u8]) -> Result<[u8; PUBLIC_KEY_LENGTH], CryptoError> {
    let parent = public_from_bytes(public)?;
    let (child, _) = parent.derived_key_simple(ChainCode(*chain_code), b"");
    Ok(child.to_bytes())
}

/// Convert to the Ed25519 expanded-secret layout used by the vendor export
pub fn secret_to_ed25519_bytes(secret: &[u8]) -> Result<[u8; SECRET_KEY_LENGTH], CryptoError> {
    Ok(secret_from_bytes(secret)?.to_ed25519_bytes())
}

/// Inverse of [`secret_to_ed25519_bytes`]
pub fn secret_from_ed25519_bytes(bytes: &[u8]) -> Result<[u8; SECRET_KEY_LENGTH], CryptoError> {
    expect_len("sr25519 secret key", bytes, SECRET_KEY_LENGTH)?;
    let secret = SecretKey::from_ed25519_bytes(bytes).map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
    Ok(secret.to_bytes())
}
