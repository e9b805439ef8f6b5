//! SS58 address codec
//!
//! `base58(prefix || public_key || checksum)` where the checksum is the first
//! two bytes of `blake2b_512("SS58PRE" || prefix || public_key)`. Network
//! formats below 64 use a one-byte prefix, the rest (up to 16383) two bytes.
//!
//! ECDSA keys never pass through here; they use EIP-55 hex addresses.

use super::IdentityError;
use crate::crypto::hashing::blake2b_512;

pub const DEFAULT_NETWORK_FORMAT: u16 = 42;
pub const MAX_NETWORK_FORMAT: u16 = 16383;

const PREFIX: &[u8] = b"SS58PRE";
const CHECKSUM_LENGTH: usize = 2;
const PUBLIC_KEY_LENGTH: usize = 32;
const RESERVED_FORMATS: [u16; 2] = [46, 47];

fn checksum(body: &[u8]) -> [u8; CHECKSUM_LENGTH] {
    let hash = blake2b_512(&[PREFIX, body]);
    [hash[0], hash[1]]
}

fn check_format(format: u16) -> Result<(), IdentityError> {
    if format > MAX_NETWORK_FORMAT {
        return Err(IdentityError::InvalidAddress(format!(
            "network format {} out of range",
            format
        )));
    }
    if RESERVED_FORMATS.contains(&format) {
        return Err(IdentityError::InvalidAddress(format!(
            "network format {} is reserved",
            format
        )));
    }
    Ok(())
}

fn prefix_bytes(format: u16) -> Vec<u8> {
    if format < 64 {
        vec![format as u8]
    } else {
        let first = (((format & 0b0000_0000_1111_1100) as u8) >> 2) | 0b0100_0000;
        let second = ((format >> 8) as u8) | (((format & 0b0000_0000_0000_0011) as u8) << 6);
        vec![first, second]
    }
}

/// Encode a 32-byte public key for the given network format
pub fn encode(public_key: &[u8], format: u16) -> Result<String, IdentityError> {
    if public_key.len() != PUBLIC_KEY_LENGTH {
        return Err(IdentityError::InvalidAddress(format!(
            "public key must be {} bytes, got {}",
            PUBLIC_KEY_LENGTH,
            public_key.len()
        )));
    }
    check_format(format)?;

    let mut body = prefix_bytes(format);
    body.extend_from_slice(public_key);
    let checksum = checksum(&body);
    body.extend_from_slice(&checksum);

    Ok(bs58::encode(body).into_string())
}

/// Decode an address into (public key, network format).
///
/// A `0x`-prefixed 64-character hex public key is accepted as well; it
/// carries no format, so `expected_format` (or the default) is reported.
pub fn decode(address: &str, expected_format: Option<u16>) -> Result<([u8; 32], u16), IdentityError> {
    if let Some(hex_key) = address.strip_prefix("0x") {
        if hex_key.len() == PUBLIC_KEY_LENGTH * 2 {
            let bytes = hex::decode(hex_key).map_err(|e| IdentityError::InvalidAddress(e.to_string()))?;
            let mut public_key = [0u8; PUBLIC_KEY_LENGTH];
            public_key.copy_from_slice(&bytes);
            return Ok((public_key, expected_format.unwrap_or(DEFAULT_NETWORK_FORMAT)));
        }
    }

    let data = bs58::decode(address)
        .into_vec()
        .map_err(|e| IdentityError::InvalidAddress(format!("invalid base58: {}", e)))?;

    let (format, prefix_len) = match data.first() {
        None => return Err(IdentityError::InvalidAddress("empty address".into())),
        Some(&first) if first & 0b1100_0000 == 0b0100_0000 => {
            let second = *data
                .get(1)
                .ok_or_else(|| IdentityError::InvalidAddress("truncated prefix".into()))?;
            let lower = ((first & 0b0011_1111) << 2) | (second >> 6);
            let upper = second & 0b0011_1111;
            ((lower as u16) | ((upper as u16) << 8), 2)
        }
        Some(&first) if first < 64 => (first as u16, 1),
        Some(&first) => {
            return Err(IdentityError::InvalidAddress(format!(
                "invalid prefix byte {}",
                first
            )))
        }
    };

    if data.len() != prefix_len + PUBLIC_KEY_LENGTH + CHECKSUM_LENGTH {
        return Err(IdentityError::InvalidAddress(format!(
            "unexpected decoded length {}",
            data.len()
        )));
    }
    check_format(format)?;

    let (body, given_checksum) = data.split_at(prefix_len + PUBLIC_KEY_LENGTH);
    if checksum(body)[..] != *given_checksum {
        return Err(IdentityError::InvalidAddress("checksum mismatch".into()));
    }

    if let Some(expected) = expected_format {
        if expected != format {
            return Err(IdentityError::InvalidAddress(format!(
                "network format {} does not match expected {}",
                format, expected
            )));
        }
    }

    let mut public_key = [0u8; PUBLIC_KEY_LENGTH];
    public_key.copy_from_slice(&body[prefix_len..]);
    Ok((public_key, format))
}

/// Network format of an address, with full checksum validation
pub fn address_format(address: &str) -> Result<u16, IdentityError> {
    decode(address, None).map(|(_, format)| format)
}

/// Whether `address` is a valid SS58 address (optionally for a given format)
pub fn is_valid(address: &str, expected_format: Option<u16>) -> bool {
    decode(address, expected_format).is_ok()
}
