//! Signature scheme dispatch
//!
//! [`SignatureScheme`] is the single place that maps a scheme to its key
//! lengths and backend functions.

use super::keys::KeyMaterial;
use super::IdentityError;
use crate::crypto::{ecdsa, ed25519, sr25519};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum SignatureScheme {
    Ed25519,
    #[default]
    Sr25519,
    Ecdsa,
}

impl SignatureScheme {
    pub const ALL: [SignatureScheme; 3] = [Self::Ed25519, Self::Sr25519, Self::Ecdsa];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Ed25519 => "ed25519",
            Self::Sr25519 => "sr25519",
            Self::Ecdsa => "ecdsa",
        }
    }

    /// Legacy numeric tag
    pub fn tag(&self) -> u8 {
        match self {
            Self::Ed25519 => 0,
            Self::Sr25519 => 1,
            Self::Ecdsa => 2,
        }
    }

    /// Length of the stored public key. For ECDSA this is the 20-byte address.
    pub fn public_key_len(&self) -> usize {
        match self {
            Self::Ed25519 => ed25519::PUBLIC_KEY_LENGTH,
            Self::Sr25519 => sr25519::PUBLIC_KEY_LENGTH,
            Self::Ecdsa => ecdsa::ADDRESS_LENGTH,
        }
    }

    pub fn private_key_len(&self) -> usize {
        match self {
            Self::Ed25519 => ed25519::SECRET_KEY_LENGTH,
            Self::Sr25519 => sr25519::SECRET_KEY_LENGTH,
            Self::Ecdsa => ecdsa::SECRET_KEY_LENGTH,
        }
    }

    /// Whether soft/hard junction walks are available
    pub fn supports_derivation(&self) -> bool {
        matches!(self, Self::Sr25519)
    }

    /// Whether addresses go through the SS58 codec
    pub fn uses_ss58(&self) -> bool {
        !matches!(self, Self::Ecdsa)
    }

    pub fn keypair_from_seed(&self, seed: &[u8]) -> Result<KeyMaterial, IdentityError> {
        match self {
            Self::Sr25519 => {
                let (public, secret) = sr25519::pair_from_seed(seed)?;
                KeyMaterial::new(*self, public.to_vec(), Some(secret.to_vec()))
            }
            Self::Ed25519 => {
                let (public, secret) = ed25519::pair_from_seed(seed)?;
                KeyMaterial::new(*self, public.to_vec(), Some(secret.to_vec()))
            }
            Self::Ecdsa => {
                if seed.len() != ecdsa::SECRET_KEY_LENGTH {
                    return Err(crate::crypto::CryptoError::InvalidSeedLength {
                        expected: ecdsa::SECRET_KEY_LENGTH,
                        actual: seed.len(),
                    }
                    .into());
                }
                let address = ecdsa::address_from_secret(seed)?;
                KeyMaterial::new(*self, address.to_vec(), Some(seed.to_vec()))
            }
        }
    }

    pub fn sign(&self, material: &KeyMaterial, message: &[u8]) -> Result<Vec<u8>, IdentityError> {
        if material.scheme() != *self {
            return Err(IdentityError::UnsupportedScheme(format!(
                "{} key material cannot sign as {}",
                material.scheme(),
                self
            )));
        }
        let secret = material.private_key().ok_or(IdentityError::NoPrivateKey)?;
        let signature = match self {
            Self::Sr25519 => sr25519::sign(material.public_key(), secret, message)?,
            Self::Ed25519 => ed25519::sign(secret, message)?,
            Self::Ecdsa => ecdsa::sign(secret, message)?,
        };
        Ok(signature)
    }

    /// Pure predicate: malformed signatures and keys yield `false`.
    pub fn verify(&self, signature: &[u8], message: &[u8], public_key: &[u8]) -> bool {
        match self {
            Self::Sr25519 => sr25519::verify(signature, message, public_key),
            Self::Ed25519 => ed25519::verify(signature, message, public_key),
            Self::Ecdsa => ecdsa::verify(signature, message, public_key),
        }
    }
}

impl fmt::Display for SignatureScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SignatureScheme {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ed25519" | "0" => Ok(Self::Ed25519),
            "sr25519" | "1" => Ok(Self::Sr25519),
            "ecdsa" | "2" => Ok(Self::Ecdsa),
            other => Err(IdentityError::UnknownScheme(other.to_string())),
        }
    }
}

impl TryFrom<String> for SignatureScheme {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl TryFrom<u8> for SignatureScheme {
    type Error = IdentityError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|scheme| scheme.tag() == tag)
            .ok_or_else(|| IdentityError::UnknownScheme(tag.to_string()))
    }
}
