//! Ed25519 signatures (ed25519-dalek)
//!
//! Secret keys are stored libsodium style: seed (32 bytes) || public key (32 bytes).

use super::{expect_len, CryptoError};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

pub const PUBLIC_KEY_LENGTH: usize = 32;
pub const SECRET_KEY_LENGTH: usize = 64;
pub const SEED_LENGTH: usize = 32;

/// Key pair bytes: (public, seed || public)
pub type PairBytes = ([u8; PUBLIC_KEY_LENGTH], [u8; SECRET_KEY_LENGTH]);

fn signing_key(secret: &[u8]) -> Result<SigningKey, CryptoError> {
    if secret.len() != SEED_LENGTH && secret.len() != SECRET_KEY_LENGTH {
        return Err(CryptoError::InvalidKeyLength {
            kind: "ed25519 secret key",
            expected: SECRET_KEY_LENGTH,
            actual: secret.len(),
        });
    }
    let mut seed = [0u8; SEED_LENGTH];
    seed.copy_from_slice(&secret[..SEED_LENGTH]);
    Ok(SigningKey::from_bytes(&seed))
}

pub fn pair_from_seed(seed: &[u8]) -> Result<PairBytes, CryptoError> {
    if seed.len() != SEED_LENGTH {
        return Err(CryptoError::InvalidSeedLength {
            expected: SEED_LENGTH,
            actual: seed.len(),
        });
    }
    let signing_key = signing_key(seed)?;
    Ok((signing_key.verifying_key().to_bytes(), signing_key.to_keypair_bytes()))
}

/// Accepts either a bare 32-byte seed or the 64-byte layout
pub fn expand_secret(secret: &[u8]) -> Result<PairBytes, CryptoError> {
    let signing_key = signing_key(secret)?;
    let expanded = signing_key.to_keypair_bytes();
    if secret.len() == SECRET_KEY_LENGTH && secret[SEED_LENGTH..] != expanded[SEED_LENGTH..] {
        return Err(CryptoError::InvalidKey(
            "ed25519 secret key does not embed its own public key".into(),
        ));
    }
    Ok((signing_key.verifying_key().to_bytes(), expanded))
}

pub fn sign(secret: &[u8], message: &[u8]) -> Result<Vec<u8>, CryptoError> {
    Ok(signing_key(secret)?.sign(message).to_bytes().to_vec())
}

/// Malformed signatures or keys verify as `false`.
pub fn verify(signature: &[u8], message: &[u8], public: &[u8]) -> bool {
    if expect_len("ed25519 public key", public, PUBLIC_KEY_LENGTH).is_err() {
        return false;
    }
    let mut public_bytes = [0u8; PUBLIC_KEY_LENGTH];
    public_bytes.copy_from_slice(public);
    let Ok(verifying_key) = VerifyingKey::from_bytes(&public_bytes) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(signature) else {
        return false;
    };
    verifying_key.verify(message, &signature).is_ok()
}
