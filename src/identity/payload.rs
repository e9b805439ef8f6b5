//! Normalization of signable data, signatures and keys
//!
//! Callers hand in bytes, hex strings, plain text, JSON values or SCALE
//! encoded buffers. Everything is reduced to a byte sequence before it
//! reaches a signature backend.

use super::IdentityError;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Already SCALE-encoded bytes, signed as-is
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleBytes(pub Vec<u8>);

/// Data to sign or verify
#[derive(Debug, Clone)]
pub enum Payload {
    Scale(ScaleBytes),
    Bytes(Vec<u8>),
    /// Plain text; a `0x` prefix marks hex-encoded bytes
    Text(String),
    /// Serialized compactly before signing
    Json(serde_json::Value),
}

impl Payload {
    pub fn into_bytes(self) -> Result<Vec<u8>, IdentityError> {
        match self {
            Payload::Scale(ScaleBytes(bytes)) | Payload::Bytes(bytes) => Ok(bytes),
            Payload::Text(text) => match text.strip_prefix("0x") {
                Some(hex_data) => decode_hex(hex_data),
                None => Ok(text.into_bytes()),
            },
            Payload::Json(serde_json::Value::String(text)) => Payload::Text(text).into_bytes(),
            Payload::Json(value) => Ok(value.to_string().into_bytes()),
        }
    }
}

impl From<ScaleBytes> for Payload {
    fn from(value: ScaleBytes) -> Self {
        Payload::Scale(value)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(value: Vec<u8>) -> Self {
        Payload::Bytes(value)
    }
}

impl From<&[u8]> for Payload {
    fn from(value: &[u8]) -> Self {
        Payload::Bytes(value.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for Payload {
    fn from(value: &[u8; N]) -> Self {
        Payload::Bytes(value.to_vec())
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Payload::Text(value.to_string())
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Payload::Text(value)
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Payload::Json(value)
    }
}

/// Signature or key given as raw bytes or as hex (with or without `0x`).
///
/// Private keys travel through this type, so both forms are zeroized on drop.
#[derive(Debug, Clone)]
pub enum BytesInput {
    Bytes(Zeroizing<Vec<u8>>),
    Hex(Zeroizing<String>),
}

impl BytesInput {
    pub fn into_bytes(self) -> Result<Zeroizing<Vec<u8>>, IdentityError> {
        match self {
            BytesInput::Bytes(bytes) => Ok(bytes),
            BytesInput::Hex(text) => decode_hex(text.strip_prefix("0x").unwrap_or(&text)).map(Zeroizing::new),
        }
    }
}

impl From<Vec<u8>> for BytesInput {
    fn from(value: Vec<u8>) -> Self {
        BytesInput::Bytes(Zeroizing::new(value))
    }
}

impl From<&[u8]> for BytesInput {
    fn from(value: &[u8]) -> Self {
        BytesInput::Bytes(Zeroizing::new(value.to_vec()))
    }
}

impl<const N: usize> From<&[u8; N]> for BytesInput {
    fn from(value: &[u8; N]) -> Self {
        BytesInput::Bytes(Zeroizing::new(value.to_vec()))
    }
}

impl From<&str> for BytesInput {
    fn from(value: &str) -> Self {
        BytesInput::Hex(Zeroizing::new(value.to_string()))
    }
}

impl From<String> for BytesInput {
    fn from(value: String) -> Self {
        BytesInput::Hex(Zeroizing::new(value))
    }
}

pub(crate) fn decode_hex(data: &str) -> Result<Vec<u8>, IdentityError> {
    hex::decode(data).map_err(|e| IdentityError::InvalidHex(e.to_string()))
}

/// Hex string with an optional `0x` prefix
pub(crate) fn decode_prefixed_hex(data: &str) -> Result<Vec<u8>, IdentityError> {
    decode_hex(data.strip_prefix("0x").unwrap_or(data))
}

/// Self-contained signed record: data, signature and signer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedMessage {
    /// Signed data; UTF-8 text as-is, anything else as `0x` hex
    pub data: String,
    /// Hex signature
    pub signature: String,
    /// Hex public key (the 20-byte address for ECDSA)
    pub public_key: String,
    pub address: String,
}

impl SignedMessage {
    pub(crate) fn encode_data(data: &[u8]) -> String {
        match std::str::from_utf8(data) {
            Ok(text) if !text.starts_with("0x") => text.to_string(),
            _ => format!("0x{}", hex::encode(data)),
        }
    }
}
