//! Secret URI parsing and hierarchical derivation
//!
//! A secret URI has the shape `phrase[/soft]*[//hard]*[///password]`. Soft and
//! hard junctions may be interleaved. An empty phrase (or a URI starting with
//! `/`) stands for the well-known development phrase.

use super::keys::KeyMaterial;
use super::{IdentityError, SignatureScheme};
use crate::crypto::hashing::blake2b_256;
use crate::crypto::sr25519;
use std::str::FromStr;
use zeroize::Zeroizing;

/// Publicly known development mnemonic
pub const DEV_PHRASE: &str = "bottom drive obey lake curtain smoke basket hold race lonely fit walk";

const JUNCTION_ID_LEN: usize = 32;
const PASSWORD_DELIMITER: &str = "///";

/// A parsed secret URI
#[derive(Clone)]
pub struct SecretUri {
    pub phrase: Zeroizing<String>,
    pub path: String,
    pub password: Option<Zeroizing<String>>,
}

impl SecretUri {
    pub fn parse(uri: &str) -> Result<Self, IdentityError> {
        let uri = uri.trim();

        let (body, password) = match uri.find(PASSWORD_DELIMITER) {
            Some(idx) => {
                let password = &uri[idx + PASSWORD_DELIMITER.len()..];
                let password = (!password.is_empty()).then(|| Zeroizing::new(password.to_string()));
                (&uri[..idx], password)
            }
            None => (uri, None),
        };

        let (phrase, path) = match body.find('/') {
            Some(idx) => (&body[..idx], &body[idx..]),
            None => (body, ""),
        };

        // Validate the path eagerly so a bad URI never reaches key derivation
        split_path(path)?;

        let phrase = phrase.trim();
        let phrase = if phrase.is_empty() { DEV_PHRASE } else { phrase };

        Ok(Self {
            phrase: Zeroizing::new(phrase.to_string()),
            path: path.to_string(),
            password,
        })
    }

    /// Phrase is a `0x` hex seed rather than a mnemonic
    pub fn is_hex_seed(&self) -> bool {
        self.phrase.starts_with("0x")
    }

    pub fn junctions(&self) -> Result<Vec<DeriveJunction>, IdentityError> {
        parse_path(&self.path)
    }
}

impl FromStr for SecretUri {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// One step of a derivation path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeriveJunction {
    pub chain_code: [u8; JUNCTION_ID_LEN],
    pub is_hard: bool,
}

impl DeriveJunction {
    pub fn soft(segment: &str) -> Self {
        Self {
            chain_code: chain_code(segment),
            is_hard: false,
        }
    }

    pub fn hard(segment: &str) -> Self {
        Self {
            chain_code: chain_code(segment),
            is_hard: true,
        }
    }
}

/// SCALE compact length prefix
fn compact_len(len: usize) -> Vec<u8> {
    match len {
        0..=0x3f => vec![(len as u8) << 2],
        0x40..=0x3fff => (((len as u16) << 2) | 0b01).to_le_bytes().to_vec(),
        _ => (((len as u32) << 2) | 0b10).to_le_bytes().to_vec(),
    }
}

fn chain_code(segment: &str) -> [u8; JUNCTION_ID_LEN] {
    let encoded = match segment.parse::<u64>() {
        Ok(index) => index.to_le_bytes().to_vec(),
        Err(_) => {
            let mut bytes = compact_len(segment.len());
            bytes.extend_from_slice(segment.as_bytes());
            bytes
        }
    };

    if encoded.len() > JUNCTION_ID_LEN {
        return blake2b_256(&encoded);
    }
    let mut code = [0u8; JUNCTION_ID_LEN];
    code[..encoded.len()].copy_from_slice(&encoded);
    code
}

/// Split a path into (segment, is_hard) pairs
fn split_path(path: &str) -> Result<Vec<(&str, bool)>, IdentityError> {
    let mut segments = Vec::new();
    let mut rest = path;

    while !rest.is_empty() {
        let slashes = rest.len() - rest.trim_start_matches('/').len();
        if slashes == 0 || slashes > 2 {
            return Err(IdentityError::InvalidDerivationPath(path.to_string()));
        }
        rest = &rest[slashes..];
        let end = rest.find('/').unwrap_or(rest.len());
        let segment = &rest[..end];
        if segment.is_empty() {
            return Err(IdentityError::InvalidDerivationPath(path.to_string()));
        }
        segments.push((segment, slashes == 2));
        rest = &rest[end..];
    }

    Ok(segments)
}

/// Parse `/soft//hard/...` into junctions
pub fn parse_path(path: &str) -> Result<Vec<DeriveJunction>, IdentityError> {
    Ok(split_path(path)?
        .into_iter()
        .map(|(segment, hard)| {
            if hard {
                DeriveJunction::hard(segment)
            } else {
                DeriveJunction::soft(segment)
            }
        })
        .collect())
}

/// Map a URI path to a BIP-32 path.
///
/// A literal `/m/...` path is taken as written. Otherwise segments must be
/// numeric indices and hard junctions become hardened indices. An empty path
/// is the Ethereum default.
pub fn bip32_path(path: &str) -> Result<String, IdentityError> {
    if let Some(literal) = path.strip_prefix('/').filter(|p| *p == "m" || p.starts_with("m/")) {
        let parsed = bip32::DerivationPath::from_str(literal)
            .map_err(|e| IdentityError::InvalidDerivationPath(format!("{}: {}", literal, e)))?;
        return Ok(parsed.to_string());
    }

    let segments = split_path(path)?;
    if segments.is_empty() {
        return Ok(crate::crypto::ecdsa::ETH_DERIVATION_PATH.to_string());
    }

    let mut out = String::from("m");
    for (segment, hard) in segments {
        let index: u32 = segment
            .parse()
            .map_err(|_| IdentityError::InvalidDerivationPath(format!("{} is not a BIP-32 index", segment)))?;
        out.push('/');
        out.push_str(&index.to_string());
        if hard {
            out.push('\'');
        }
    }
    Ok(out)
}

/// Walk Sr25519 junctions starting from `parent`.
///
/// Hard junctions need the private key. Soft junctions work on the public
/// key alone, producing a verify-only child.
pub fn derive_sr25519(parent: &KeyMaterial, junctions: &[DeriveJunction]) -> Result<KeyMaterial, IdentityError> {
    if parent.scheme() != SignatureScheme::Sr25519 {
        return Err(IdentityError::UnsupportedDerivation(format!(
            "derivation paths are not supported for {}",
            parent.scheme()
        )));
    }

    let mut public = parent.public_key().to_vec();
    let mut secret = parent.private_key().map(|k| Zeroizing::new(k.to_vec()));

    for junction in junctions {
        match (&secret, junction.is_hard) {
            (Some(parent_secret), true) => {
                let (child_public, child_secret) = sr25519::hard_derive(&junction.chain_code, parent_secret)?;
                public = child_public.to_vec();
                secret = Some(Zeroizing::new(child_secret.to_vec()));
            }
            (None, true) => return Err(IdentityError::NoPrivateKey),
            (Some(parent_secret), false) => {
                let (child_public, child_secret) = sr25519::soft_derive(&junction.chain_code, parent_secret)?;
                public = child_public.to_vec();
                secret = Some(Zeroizing::new(child_secret.to_vec()));
            }
            (None, false) => {
                public = sr25519::soft_derive_public(&junction.chain_code, &public)?.to_vec();
            }
        }
    }

    KeyMaterial::new(SignatureScheme::Sr25519, public, secret.map(|k| k.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uri_parts() {
        let uri = SecretUri::parse("hello world/foo//bar///secret").unwrap();
        assert_eq!(uri.phrase.as_str(), "hello world");
        assert_eq!(uri.path, "/foo//bar");
        assert_eq!(uri.password.as_deref().map(|p| p.as_str()), Some("secret"));
    }

    #[test]
    fn test_leading_slash_means_dev_phrase() {
        let uri: SecretUri = "//Alice".parse().unwrap();
        assert_eq!(uri.phrase.as_str(), DEV_PHRASE);
        assert_eq!(uri.path, "//Alice");
        assert!(uri.password.is_none());

        let empty = SecretUri::parse("").unwrap();
        assert_eq!(empty.phrase.as_str(), DEV_PHRASE);
        assert!(empty.path.is_empty());
    }

    #[test]
    fn test_password_only() {
        let uri = SecretUri::parse("//Alice///pw/with/slashes").unwrap();
        assert_eq!(uri.path, "//Alice");
        assert_eq!(uri.password.as_deref().map(|p| p.as_str()), Some("pw/with/slashes"));
    }

    #[test]
    fn test_hex_seed_phrase() {
        let uri = SecretUri::parse(&format!("0x{}//1", "00".repeat(32))).unwrap();
        assert!(uri.is_hex_seed());
        assert_eq!(uri.junctions().unwrap().len(), 1);
    }

    #[test]
    fn test_junction_classification_in_order() {
        let junctions = parse_path("//a/b//c").unwrap();
        let hardness: Vec<bool> = junctions.iter().map(|j| j.is_hard).collect();
        assert_eq!(hardness, vec![true, false, true]);
        assert_eq!(junctions[1], DeriveJunction::soft("b"));
    }

    #[test]
    fn test_invalid_paths() {
        assert!(parse_path("//").is_err());
        assert!(parse_path("/a/").is_err());
        assert!(parse_path("a").is_err());
    }

    #[test]
    fn test_chain_codes() {
        // Numeric junction: little-endian u64, zero padded
        let mut expected = [0u8; 32];
        expected[0] = 1;
        assert_eq!(DeriveJunction::hard("1").chain_code, expected);

        // Text junction: compact length prefix then bytes
        let alice = DeriveJunction::hard("Alice").chain_code;
        assert_eq!(alice[0], 5 << 2);
        assert_eq!(&alice[1..6], b"Alice");
        assert!(alice[6..].iter().all(|b| *b == 0));

        // Long junction is hashed
        let long = "x".repeat(40);
        let mut encoded = compact_len(40);
        encoded.extend_from_slice(long.as_bytes());
        assert_eq!(DeriveJunction::soft(&long).chain_code, blake2b_256(&encoded));
    }

    #[test]
    fn test_bip32_paths() {
        assert_eq!(bip32_path("").unwrap(), "m/44'/60'/0'/0/0");
        assert_eq!(bip32_path("//44//60//0/0/3").unwrap(), "m/44'/60'/0'/0/3");
        assert_eq!(bip32_path("/m/44'/60'/0'/0/7").unwrap(), "m/44'/60'/0'/0/7");
        assert!(matches!(
            bip32_path("/m/44'/x"),
            Err(IdentityError::InvalidDerivationPath(_))
        ));
        assert!(matches!(
            bip32_path("//Alice"),
            Err(IdentityError::InvalidDerivationPath(_))
        ));
    }

    #[test]
    fn test_sr25519_walk() {
        let parent = SignatureScheme::Sr25519.keypair_from_seed(&[9u8; 32]).unwrap();
        let junctions = parse_path("//hard/soft").unwrap();

        let a = derive_sr25519(&parent, &junctions).unwrap();
        let b = derive_sr25519(&parent, &junctions).unwrap();
        assert_eq!(a.public_key(), b.public_key());
        assert_ne!(a.public_key(), parent.public_key());
        assert!(!a.is_verify_only());
    }

    #[test]
    fn test_watch_only_soft_derivation() {
        let parent = SignatureScheme::Sr25519.keypair_from_seed(&[9u8; 32]).unwrap();
        let watch = KeyMaterial::new(SignatureScheme::Sr25519, parent.public_key().to_vec(), None).unwrap();
        let junctions = parse_path("/0/1").unwrap();

        let full = derive_sr25519(&parent, &junctions).unwrap();
        let public_only = derive_sr25519(&watch, &junctions).unwrap();
        assert_eq!(full.public_key(), public_only.public_key());
        assert!(public_only.is_verify_only());

        let hard = parse_path("//0").unwrap();
        assert!(matches!(derive_sr25519(&watch, &hard), Err(IdentityError::NoPrivateKey)));
    }

    #[test]
    fn test_other_schemes_cannot_walk() {
        let ed = SignatureScheme::Ed25519.keypair_from_seed(&[9u8; 32]).unwrap();
        assert!(matches!(
            derive_sr25519(&ed, &parse_path("//a").unwrap()),
            Err(IdentityError::UnsupportedDerivation(_))
        ));
    }
}
