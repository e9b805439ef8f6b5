//! secp256k1 ECDSA with Ethereum conventions
//!
//! Keys are identified by their 20-byte address, messages are hashed with
//! Keccak-256 and signatures carry a recovery byte: r (32) || s (32) || v (1).

use super::hashing::keccak256;
use super::{expect_len, CryptoError};
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};

pub const ADDRESS_LENGTH: usize = 20;
pub const SECRET_KEY_LENGTH: usize = 32;
pub const SIGNATURE_LENGTH: usize = 65;

/// Default BIP-44 path for Ethereum accounts
pub const ETH_DERIVATION_PATH: &str = "m/44'/60'/0'/0/0";

fn signing_key(secret: &[u8]) -> Result<SigningKey, CryptoError> {
    expect_len("ecdsa secret key", secret, SECRET_KEY_LENGTH)?;
    SigningKey::from_slice(secret).map_err(|e| CryptoError::InvalidKey(e.to_string()))
}

fn address_of(verifying_key: &VerifyingKey) -> [u8; ADDRESS_LENGTH] {
    // Uncompressed point without the 0x04 tag
    let point = verifying_key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut address = [0u8; ADDRESS_LENGTH];
    address.copy_from_slice(&hash[12..]);
    address
}

/// 20-byte account address for a secret key
pub fn address_from_secret(secret: &[u8]) -> Result<[u8; ADDRESS_LENGTH], CryptoError> {
    Ok(address_of(signing_key(secret)?.verifying_key()))
}

/// EIP-55 mixed-case checksum encoding, `0x` prefixed
pub fn to_checksum_address(address: &[u8]) -> String {
    let lower = hex::encode(address);
    let hash = keccak256(lower.as_bytes());

    let mut out = String::with_capacity(2 + lower.len());
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = (hash[i / 2] >> (if i % 2 == 0 { 4 } else { 0 })) & 0x0f;
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Parse a `0x` hex address. Mixed-case input must carry a valid checksum.
pub fn parse_address(address: &str) -> Result<[u8; ADDRESS_LENGTH], CryptoError> {
    let body = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .unwrap_or(address);
    let bytes = hex::decode(body).map_err(|e| CryptoError::InvalidData(e.to_string()))?;
    expect_len("ecdsa address", &bytes, ADDRESS_LENGTH)?;

    let mixed_case = body.chars().any(|c| c.is_ascii_uppercase()) && body.chars().any(|c| c.is_ascii_lowercase());
    if mixed_case && to_checksum_address(&bytes)[2..] != *body {
        return Err(CryptoError::InvalidData("address checksum mismatch".into()));
    }

    let mut out = [0u8; ADDRESS_LENGTH];
    out.copy_from_slice(&bytes);
    Ok(out)
}

pub fn sign(secret: &[u8], message: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let signing_key = signing_key(secret)?;
    let digest = keccak256(message);
    let (signature, recovery_id) = signing_key
        .sign_prehash_recoverable(&digest)
        .map_err(|e| CryptoError::InvalidData(e.to_string()))?;

    let mut out = Vec::with_capacity(SIGNATURE_LENGTH);
    out.extend_from_slice(&signature.to_bytes());
    out.push(recovery_id.to_byte());
    Ok(out)
}

/// Recover the signer and compare against `address`. Malformed input is `false`.
pub fn verify(signature: &[u8], message: &[u8], address: &[u8]) -> bool {
    if signature.len() != SIGNATURE_LENGTH || address.len() != ADDRESS_LENGTH {
        return false;
    }
    let v = signature[64];
    let v = if v >= 27 { v - 27 } else { v };
    let Some(recovery_id) = RecoveryId::from_byte(v) else {
        return false;
    };
    let Ok(sig) = Signature::from_slice(&signature[..64]) else {
        return false;
    };

    let digest = keccak256(message);
    match VerifyingKey::recover_from_prehash(&digest, &sig, recovery_id) {
        Ok(recovered) => address_of(&recovered)[..] == *address,
        Err(_) => false,
    }
}

/// BIP-39 seed (with passphrase) walked along a BIP-32 path
pub fn secret_from_mnemonic_seed(seed: &[u8; 64], path: &str) -> Result<[u8; SECRET_KEY_LENGTH], CryptoError> {
    let path: bip32::DerivationPath = path
        .parse()
        .map_err(|e| CryptoError::InvalidData(format!("invalid HD path {}: {}", path, e)))?;

    let child = bip32::XPrv::derive_from_path(seed, &path)
        .map_err(|e| CryptoError::InvalidKey(format!("key derivation failed: {}", e)))?;

    let mut secret = [0u8; SECRET_KEY_LENGTH];
    secret.copy_from_slice(&child.private_key().to_bytes());
    Ok(secret)
}
