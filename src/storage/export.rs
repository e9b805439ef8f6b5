//! polkadot-js compatible encrypted JSON export
//!
//! The secret is wrapped in a fixed PKCS#8-like envelope, sealed with
//! XSalsa20-Poly1305 under an scrypt-derived key and base64 encoded:
//!
//! ```text
//! encoded = salt(32) || N || p || r (u32 LE each) || nonce(24) || ciphertext
//! plaintext = PKCS8_HEADER || secret(64) || PKCS8_DIVIDER || public(32)
//! ```

use crate::crypto::encryption::{
    scrypt_key, secretbox_open, secretbox_seal, ScryptParams, SECRETBOX_KEY_SIZE, SECRETBOX_NONCE_SIZE,
};
use crate::crypto::{random_array, sr25519};
use crate::identity::{address, IdentityError, Keypair, SignatureScheme};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::info;
use zeroize::Zeroizing;

pub const PKCS8_HEADER: [u8; 16] = [48, 83, 2, 1, 1, 48, 5, 6, 3, 43, 101, 112, 4, 34, 4, 32];
pub const PKCS8_DIVIDER: [u8; 5] = [161, 35, 3, 33, 0];

const SALT_LENGTH: usize = 32;
const SCRYPT_HEADER_LENGTH: usize = 12;
const SECRET_LENGTH: usize = 64;
const PUBLIC_LENGTH: usize = 32;
const EXPORT_VERSION: &str = "3";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportEncoding {
    /// `["pkcs8", <scheme>]`
    pub content: Vec<String>,
    /// `["scrypt", "xsalsa20-poly1305"]`
    #[serde(rename = "type")]
    pub kind: Vec<String>,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Unix seconds
    #[serde(rename = "whenCreated", default)]
    pub when_created: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedExportRecord {
    pub encoded: String,
    pub encoding: ExportEncoding,
    #[serde(default)]
    pub address: String,
    pub meta: ExportMeta,
}

impl EncryptedExportRecord {
    fn uses_scrypt(&self) -> bool {
        self.encoding.kind.iter().any(|k| k == "scrypt")
    }

    fn content_scheme(&self) -> Result<SignatureScheme, IdentityError> {
        let content = &self.encoding.content;
        if content.iter().any(|c| c == "sr25519") {
            Ok(SignatureScheme::Sr25519)
        } else if content.iter().any(|c| c == "ed25519") {
            Ok(SignatureScheme::Ed25519)
        } else {
            Err(IdentityError::UnsupportedScheme(format!(
                "unknown keypair type in export: {:?}",
                content
            )))
        }
    }
}

/// Seal a (public, secret) pair into the `encoded` payload
pub fn encode_pair(public_key: &[u8], secret_key: &[u8], passphrase: &str) -> Result<Vec<u8>, IdentityError> {
    if public_key.len() != PUBLIC_LENGTH || secret_key.len() != SECRET_LENGTH {
        return Err(IdentityError::MalformedExport(format!(
            "expected {}-byte public and {}-byte secret key",
            PUBLIC_LENGTH, SECRET_LENGTH
        )));
    }

    let mut plaintext = Zeroizing::new(Vec::with_capacity(
        PKCS8_HEADER.len() + SECRET_LENGTH + PKCS8_DIVIDER.len() + PUBLIC_LENGTH,
    ));
    plaintext.extend_from_slice(&PKCS8_HEADER);
    plaintext.extend_from_slice(secret_key);
    plaintext.extend_from_slice(&PKCS8_DIVIDER);
    plaintext.extend_from_slice(public_key);

    let salt: [u8; SALT_LENGTH] = random_array();
    let params = ScryptParams::default();
    let derived = scrypt_key(passphrase.as_bytes(), &salt, params)?;
    let mut key = Zeroizing::new([0u8; SECRETBOX_KEY_SIZE]);
    key.copy_from_slice(&derived[..SECRETBOX_KEY_SIZE]);

    let nonce: [u8; SECRETBOX_NONCE_SIZE] = random_array();
    let sealed = secretbox_seal(&key, &nonce, &plaintext)?;

    let mut encoded = Vec::with_capacity(SALT_LENGTH + SCRYPT_HEADER_LENGTH + sealed.len());
    encoded.extend_from_slice(&salt);
    encoded.extend_from_slice(&params.to_bytes());
    encoded.extend_from_slice(&sealed);
    Ok(encoded)
}

/// Open an export record into (secret 64 bytes, public 32 bytes)
pub fn decode_pair(
    record: &EncryptedExportRecord,
    passphrase: &str,
) -> Result<(Zeroizing<Vec<u8>>, Vec<u8>), IdentityError> {
    if record.encoding.version != EXPORT_VERSION {
        return Err(IdentityError::MalformedExport(format!(
            "unsupported version {}",
            record.encoding.version
        )));
    }

    let encoded = BASE64
        .decode(record.encoded.as_bytes())
        .map_err(|e| IdentityError::MalformedExport(e.to_string()))?;

    let mut key = Zeroizing::new([0u8; SECRETBOX_KEY_SIZE]);
    let sealed = if record.uses_scrypt() {
        if encoded.len() < SALT_LENGTH + SCRYPT_HEADER_LENGTH {
            return Err(IdentityError::MalformedExport("encoded payload too short".into()));
        }
        let (salt, rest) = encoded.split_at(SALT_LENGTH);
        let (header, sealed) = rest.split_at(SCRYPT_HEADER_LENGTH);
        let params = ScryptParams::from_bytes(header)?;
        params
            .validate()
            .map_err(|e| IdentityError::MalformedExport(e.to_string()))?;
        let derived = scrypt_key(passphrase.as_bytes(), salt, params)?;
        key.copy_from_slice(&derived[..SECRETBOX_KEY_SIZE]);
        sealed
    } else {
        // Legacy exports: passphrase bytes left-padded with zeros
        let bytes = passphrase.as_bytes();
        let used = bytes.len().min(SECRETBOX_KEY_SIZE);
        key[SECRETBOX_KEY_SIZE - used..].copy_from_slice(&bytes[..used]);
        &encoded[..]
    };

    let plaintext = Zeroizing::new(secretbox_open(&key, sealed)?);

    let secret_start = PKCS8_HEADER.len();
    let divider_start = secret_start + SECRET_LENGTH;
    let public_start = divider_start + PKCS8_DIVIDER.len();
    if plaintext.len() < public_start + PUBLIC_LENGTH {
        return Err(IdentityError::MalformedExport("decrypted payload too short".into()));
    }
    if plaintext[..secret_start] != PKCS8_HEADER {
        return Err(IdentityError::MalformedExport("invalid PKCS#8 header".into()));
    }
    if plaintext[divider_start..public_start] != PKCS8_DIVIDER {
        return Err(IdentityError::MalformedExport("invalid PKCS#8 divider".into()));
    }

    let secret = Zeroizing::new(plaintext[secret_start..divider_start].to_vec());
    let public = plaintext[public_start..public_start + PUBLIC_LENGTH].to_vec();
    Ok((secret, public))
}

impl Keypair {
    /// Export as polkadot-js encrypted JSON. Sr25519 only.
    pub fn export_encrypted_json(
        &self,
        passphrase: &str,
        name: Option<&str>,
    ) -> Result<EncryptedExportRecord, IdentityError> {
        if self.scheme() != SignatureScheme::Sr25519 {
            return Err(IdentityError::UnsupportedScheme(format!(
                "cannot export {} keypairs as encrypted JSON",
                self.scheme()
            )));
        }
        let secret = self.private_key().ok_or(IdentityError::NoPrivateKey)?;

        // polkadot-js stores the Ed25519-style expanded secret
        let converted = Zeroizing::new(sr25519::secret_to_ed25519_bytes(secret)?);
        let encoded = encode_pair(self.public_key(), &converted[..], passphrase)?;

        info!("Exported keypair {} as encrypted JSON", self.address());
        Ok(EncryptedExportRecord {
            encoded: BASE64.encode(encoded),
            encoding: ExportEncoding {
                content: vec!["pkcs8".into(), "sr25519".into()],
                kind: vec!["scrypt".into(), "xsalsa20-poly1305".into()],
                version: EXPORT_VERSION.into(),
            },
            address: self.address().to_string(),
            meta: ExportMeta {
                name: name.unwrap_or(self.address()).to_string(),
                tags: Vec::new(),
                when_created: chrono::Utc::now().timestamp(),
            },
        })
    }

    /// Import a polkadot-js encrypted JSON export.
    ///
    /// Without an explicit `network_format` the record's address decides it.
    pub fn import_encrypted_json(
        record: &EncryptedExportRecord,
        passphrase: &str,
        network_format: Option<u16>,
    ) -> Result<Self, IdentityError> {
        let scheme = record.content_scheme()?;
        let (secret, public) = decode_pair(record, passphrase)?;

        let private_key = match scheme {
            SignatureScheme::Sr25519 => Zeroizing::new(sr25519::secret_from_ed25519_bytes(&secret)?.to_vec()),
            // Drop the appended public key half
            _ => Zeroizing::new(secret[..32].to_vec()),
        };

        let mut builder = Keypair::builder()
            .scheme(scheme)
            .private_key(&private_key[..])
            .public_key(public);

        builder = match network_format {
            Some(format) => builder.network_format(format),
            None if !record.address.is_empty() => {
                let format = address::address_format(&record.address)?;
                builder.network_format(format).address(&record.address)
            }
            None => builder,
        };

        let keypair = builder.build()?;
        info!("Imported {} keypair {} from encrypted JSON", scheme, keypair.address());
        Ok(keypair)
    }

    /// [`Keypair::import_encrypted_json`] from JSON text
    pub fn from_encrypted_json_str(
        json: &str,
        passphrase: &str,
        network_format: Option<u16>,
    ) -> Result<Self, IdentityError> {
        let record: EncryptedExportRecord =
            serde_json::from_str(json).map_err(|e| IdentityError::MalformedExport(e.to_string()))?;
        Self::import_encrypted_json(&record, passphrase, network_format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::encryption::secretbox_seal;
    use crate::crypto::{ed25519, CryptoError};

    fn alice() -> Keypair {
        Keypair::from_uri("//Alice", SignatureScheme::Sr25519).unwrap()
    }

    #[test]
    fn test_export_shape() {
        let record = alice().export_encrypted_json("pass", None).unwrap();
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["encoding"]["content"], serde_json::json!(["pkcs8", "sr25519"]));
        assert_eq!(json["encoding"]["type"], serde_json::json!(["scrypt", "xsalsa20-poly1305"]));
        assert_eq!(json["encoding"]["version"], "3");
        assert_eq!(json["address"], "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY");
        assert_eq!(json["meta"]["name"], "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY");
        assert_eq!(json["meta"]["tags"], serde_json::json!([]));
        assert!(json["meta"]["whenCreated"].as_i64().unwrap() > 0);

        let encoded = BASE64.decode(&record.encoded).unwrap();
        // salt + scrypt header + nonce + (117-byte body + 16-byte tag)
        assert_eq!(encoded.len(), 32 + 12 + 24 + 117 + 16);
        assert_eq!(&encoded[32..36], &(1u32 << 15).to_le_bytes());
    }

    #[test]
    fn test_export_import_roundtrip() {
        let original = alice();
        let record = original.export_encrypted_json("correct horse", Some("alice")).unwrap();
        assert_eq!(record.meta.name, "alice");

        let imported = Keypair::import_encrypted_json(&record, "correct horse", None).unwrap();
        assert_eq!(imported.address(), original.address());
        assert_eq!(imported.public_key(), original.public_key());
        assert_eq!(imported.network_format(), 42);

        // Imported secret still signs
        let signature = imported.sign("after import").unwrap();
        assert!(original.verify("after import", signature).unwrap());
    }

    #[test]
    fn test_import_wrong_passphrase() {
        let record = alice().export_encrypted_json("right", None).unwrap();
        assert!(matches!(
            Keypair::import_encrypted_json(&record, "wrong", None),
            Err(IdentityError::Crypto(CryptoError::DecryptionFailed))
        ));
    }

    #[test]
    fn test_import_with_explicit_format() {
        let record = alice().export_encrypted_json("pw", None).unwrap();
        let imported = Keypair::import_encrypted_json(&record, "pw", Some(0)).unwrap();

        assert_eq!(imported.network_format(), 0);
        assert_eq!(imported.address(), "15oF4uVJwmo4TdGW7VfQxNLavjCXviqxT9S1MgbjMNHr6Sp5");
    }

    #[test]
    fn test_from_json_text() {
        let record = alice().export_encrypted_json("pw", None).unwrap();
        let text = serde_json::to_string(&record).unwrap();

        let imported = Keypair::from_encrypted_json_str(&text, "pw", None).unwrap();
        assert_eq!(imported.address(), alice().address());

        assert!(matches!(
            Keypair::from_encrypted_json_str("{\"encoded\": 1}", "pw", None),
            Err(IdentityError::MalformedExport(_))
        ));
    }

    #[test]
    fn test_export_restrictions() {
        let ed = Keypair::from_seed(&[1u8; 32], SignatureScheme::Ed25519, 42).unwrap();
        assert!(matches!(
            ed.export_encrypted_json("pw", None),
            Err(IdentityError::UnsupportedScheme(_))
        ));

        let watcher = Keypair::from_address(alice().address(), SignatureScheme::Sr25519).unwrap();
        assert!(matches!(
            watcher.export_encrypted_json("pw", None),
            Err(IdentityError::NoPrivateKey)
        ));
    }

    #[test]
    fn test_version_check() {
        let mut record = alice().export_encrypted_json("pw", None).unwrap();
        record.encoding.version = "2".into();
        assert!(matches!(
            Keypair::import_encrypted_json(&record, "pw", None),
            Err(IdentityError::MalformedExport(_))
        ));
    }

    #[test]
    fn test_import_rejects_oversized_scrypt_header() {
        let mut record = alice().export_encrypted_json("pw", None).unwrap();
        let mut encoded = BASE64.decode(&record.encoded).unwrap();
        encoded[32..36].copy_from_slice(&(1u32 << 24).to_le_bytes());
        record.encoded = BASE64.encode(&encoded);

        assert!(matches!(
            Keypair::import_encrypted_json(&record, "pw", None),
            Err(IdentityError::MalformedExport(_))
        ));

        // Huge r and p are refused as well
        encoded[32..36].copy_from_slice(&(1u32 << 15).to_le_bytes());
        encoded[36..40].copy_from_slice(&u32::MAX.to_le_bytes());
        encoded[40..44].copy_from_slice(&u32::MAX.to_le_bytes());
        record.encoded = BASE64.encode(&encoded);
        assert!(matches!(
            Keypair::import_encrypted_json(&record, "pw", None),
            Err(IdentityError::MalformedExport(_))
        ));
    }

    #[test]
    fn test_import_ed25519_legacy_record() {
        // Hand-built ed25519 record without scrypt: key is the zero-padded passphrase
        let (public, secret) = ed25519::pair_from_seed(&[8u8; 32]).unwrap();
        let mut body = Vec::new();
        body.extend_from_slice(&PKCS8_HEADER);
        body.extend_from_slice(&secret);
        body.extend_from_slice(&PKCS8_DIVIDER);
        body.extend_from_slice(&public);

        let mut key = [0u8; 32];
        key[32 - 2..].copy_from_slice(b"pw");
        let sealed = secretbox_seal(&key, &[5u8; 24], &body).unwrap();

        let record = EncryptedExportRecord {
            encoded: BASE64.encode(sealed),
            encoding: ExportEncoding {
                content: vec!["pkcs8".into(), "ed25519".into()],
                kind: vec!["xsalsa20-poly1305".into()],
                version: "3".into(),
            },
            address: String::new(),
            meta: ExportMeta {
                name: "legacy".into(),
                tags: vec![],
                when_created: 0,
            },
        };

        let imported = Keypair::import_encrypted_json(&record, "pw", None).unwrap();
        assert_eq!(imported.scheme(), SignatureScheme::Ed25519);
        assert_eq!(imported.public_key(), &public[..]);
        assert_eq!(imported.network_format(), 42);
    }
}
