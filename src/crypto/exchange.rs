//! Authenticated public-key encryption between Ed25519 identities
//!
//! Ed25519 keys are mapped onto Curve25519 (the libsodium
//! `crypto_sign_ed25519_*_to_curve25519` conversions) and used with the
//! NaCl `crypto_box` construction (X25519 + XSalsa20-Poly1305).

use super::encryption::SECRETBOX_NONCE_SIZE;
use super::{expect_len, CryptoError};
use crypto_box::aead::generic_array::GenericArray;
use crypto_box::aead::Aead;
use crypto_box::{PublicKey, SalsaBox, SecretKey};
use curve25519_dalek::edwards::CompressedEdwardsY;
use sha2::{Digest, Sha512};
use zeroize::Zeroizing;

pub const NONCE_LENGTH: usize = SECRETBOX_NONCE_SIZE;

/// Edwards public key -> Montgomery u-coordinate
pub fn ed25519_public_to_x25519(public: &[u8]) -> Result<[u8; 32], CryptoError> {
    expect_len("ed25519 public key", public, 32)?;
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(public);
    let point = CompressedEdwardsY(bytes)
        .decompress()
        .ok_or_else(|| CryptoError::InvalidKey("not a valid Edwards point".into()))?;
    Ok(point.to_montgomery().to_bytes())
}

/// Ed25519 seed -> clamped X25519 scalar
pub fn ed25519_secret_to_x25519(seed: &[u8]) -> Result<Zeroizing<[u8; 32]>, CryptoError> {
    if seed.len() < 32 {
        return Err(CryptoError::InvalidKeyLength {
            kind: "ed25519 secret key",
            expected: 32,
            actual: seed.len(),
        });
    }
    let mut digest = Zeroizing::new([0u8; 64]);
    digest.copy_from_slice(&Sha512::digest(&seed[..32]));
    let mut scalar = Zeroizing::new([0u8; 32]);
    scalar.copy_from_slice(&digest[..32]);
    scalar[0] &= 248;
    scalar[31] &= 127;
    scalar[31] |= 64;
    Ok(scalar)
}

fn salsa_box(our_secret: &[u8], their_public: &[u8]) -> Result<SalsaBox, CryptoError> {
    let secret = SecretKey::from(*ed25519_secret_to_x25519(our_secret)?);
    let public = PublicKey::from(ed25519_public_to_x25519(their_public)?);
    Ok(SalsaBox::new(&public, &secret))
}

/// Returns nonce (24 bytes) || ciphertext
pub fn seal(
    our_secret: &[u8],
    their_public: &[u8],
    nonce: &[u8; NONCE_LENGTH],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let ciphertext = salsa_box(our_secret, their_public)?
        .encrypt(GenericArray::from_slice(nonce), plaintext)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let mut out = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
    out.extend_from_slice(nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Inverse of [`seal`]; a bad tag is [`CryptoError::AuthenticationFailed`]
pub fn open(our_secret: &[u8], their_public: &[u8], sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if sealed.len() < NONCE_LENGTH {
        return Err(CryptoError::InvalidData("sealed message shorter than its nonce".into()));
    }
    let (nonce, ciphertext) = sealed.split_at(NONCE_LENGTH);
    salsa_box(our_secret, their_public)?
        .decrypt(GenericArray::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::AuthenticationFailed)
}
