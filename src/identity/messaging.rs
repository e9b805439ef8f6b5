//! Ed25519 secure messaging
//!
//! Messages are boxed with X25519 + XSalsa20-Poly1305 after mapping both
//! Ed25519 keys to Curve25519. The nonce is always supplied per call.

use super::{IdentityError, Keypair, SignatureScheme};
use crate::crypto::{self, exchange};

/// 24-byte box nonce. Use [`MessageNonce::random`] for every message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageNonce([u8; exchange::NONCE_LENGTH]);

impl MessageNonce {
    pub fn random() -> Self {
        Self(crypto::random_array())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, IdentityError> {
        let nonce: [u8; exchange::NONCE_LENGTH] = bytes.try_into().map_err(|_| {
            crypto::CryptoError::InvalidData(format!(
                "nonce must be {} bytes, got {}",
                exchange::NONCE_LENGTH,
                bytes.len()
            ))
        })?;
        Ok(Self(nonce))
    }

    pub fn as_bytes(&self) -> &[u8; exchange::NONCE_LENGTH] {
        &self.0
    }
}

impl Keypair {
    fn messaging_secret(&self) -> Result<&[u8], IdentityError> {
        if self.scheme() != SignatureScheme::Ed25519 {
            return Err(IdentityError::UnsupportedScheme(format!(
                "secure messaging needs ed25519, not {}",
                self.scheme()
            )));
        }
        self.private_key().ok_or(IdentityError::NoPrivateKey)
    }

    /// Encrypt for `recipient_public_key`. Output is `nonce || ciphertext`.
    pub fn encrypt_message(
        &self,
        message: impl AsRef<[u8]>,
        recipient_public_key: &[u8],
        nonce: &MessageNonce,
    ) -> Result<Vec<u8>, IdentityError> {
        let secret = self.messaging_secret()?;
        Ok(exchange::seal(secret, recipient_public_key, nonce.as_bytes(), message.as_ref())?)
    }

    /// Decrypt `nonce || ciphertext` sent by `sender_public_key`
    pub fn decrypt_message(&self, sealed: &[u8], sender_public_key: &[u8]) -> Result<Vec<u8>, IdentityError> {
        let secret = self.messaging_secret()?;
        Ok(exchange::open(secret, sender_public_key, sealed)?)
    }
}
