//! Keypair construction
//!
//! The first provenance that applies wins, in this order: seed (hex, raw or
//! free text), mnemonic, secret URI, raw keys/address. With none of them a
//! fresh mnemonic is generated. Whatever produced the key material, explicit
//! public key and address inputs are cross-checked and the length
//! invariants are enforced in [`KeyMaterial::new`] before the keypair exists.

use super::derivation::{self, SecretUri};
use super::keys::KeyMaterial;
use super::payload::{decode_prefixed_hex, BytesInput};
use super::seed::{MnemonicLanguage, SeedPhrase};
use super::{address, IdentityError, Keypair, SignatureScheme};
use crate::crypto::hashing::sha256;
use crate::crypto::{ecdsa, ed25519, sr25519};
use crate::KeyringConfig;
use tracing::{debug, info};
use zeroize::Zeroizing;

/// Output of a provenance state before final validation
struct Resolved {
    material: KeyMaterial,
    mnemonic: Option<Zeroizing<String>>,
    seed: Option<Zeroizing<Vec<u8>>>,
    derive_path: Option<String>,
}

impl Resolved {
    fn bare(material: KeyMaterial) -> Self {
        Self {
            material,
            mnemonic: None,
            seed: None,
            derive_path: None,
        }
    }
}

#[derive(Default)]
pub struct KeypairBuilder {
    scheme: SignatureScheme,
    network_format: Option<u16>,
    default_network_format: u16,
    language: MnemonicLanguage,
    mnemonic_words: usize,
    seed_hex: Option<Zeroizing<String>>,
    seed_text: Option<Zeroizing<String>>,
    seed: Option<Zeroizing<Vec<u8>>>,
    mnemonic: Option<Zeroizing<String>>,
    uri: Option<Zeroizing<String>>,
    public_key: Option<BytesInput>,
    private_key: Option<BytesInput>,
    address: Option<String>,
}

impl KeypairBuilder {
    pub fn new() -> Self {
        Self::with_config(&KeyringConfig::default())
    }

    /// Start from the defaults in `config`
    pub fn with_config(config: &KeyringConfig) -> Self {
        Self {
            scheme: config.default_scheme,
            default_network_format: config.network_format,
            language: config.language,
            mnemonic_words: config.mnemonic_words,
            ..Default::default()
        }
    }

    pub fn scheme(mut self, scheme: SignatureScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn network_format(mut self, format: u16) -> Self {
        self.network_format = Some(format);
        self
    }

    pub fn language(mut self, language: MnemonicLanguage) -> Self {
        self.language = language;
        self
    }

    /// Word count used when a mnemonic has to be generated
    pub fn mnemonic_words(mut self, words: usize) -> Self {
        self.mnemonic_words = words;
        self
    }

    /// Raw seed bytes
    pub fn seed(mut self, seed: impl AsRef<[u8]>) -> Self {
        self.seed = Some(Zeroizing::new(seed.as_ref().to_vec()));
        self
    }

    /// Hex seed, `0x` prefix optional
    pub fn seed_hex(mut self, seed_hex: &str) -> Self {
        self.seed_hex = Some(Zeroizing::new(seed_hex.to_string()));
        self
    }

    /// Free-form seed text, hashed to a 32-byte seed
    pub fn seed_text(mut self, text: &str) -> Self {
        self.seed_text = Some(Zeroizing::new(text.to_string()));
        self
    }

    pub fn mnemonic(mut self, phrase: &str) -> Self {
        self.mnemonic = Some(Zeroizing::new(phrase.to_string()));
        self
    }

    /// Secret URI: `phrase[/soft][//hard][///password]`
    pub fn uri(mut self, uri: &str) -> Self {
        self.uri = Some(Zeroizing::new(uri.to_string()));
        self
    }

    pub fn public_key(mut self, public_key: impl Into<BytesInput>) -> Self {
        self.public_key = Some(public_key.into());
        self
    }

    pub fn private_key(mut self, private_key: impl Into<BytesInput>) -> Self {
        self.private_key = Some(private_key.into());
        self
    }

    pub fn address(mut self, address: &str) -> Self {
        self.address = Some(address.to_string());
        self
    }

    fn has_raw_keys(&self) -> bool {
        self.public_key.is_some() || self.private_key.is_some() || self.address.is_some()
    }

    pub fn build(mut self) -> Result<Keypair, IdentityError> {
        let resolved = if let Some(seed_hex) = self.seed_hex.take() {
            let seed = Zeroizing::new(decode_prefixed_hex(&seed_hex)?);
            self.resolve_seed(seed)?
        } else if let Some(text) = self.seed_text.take() {
            let seed = Zeroizing::new(sha256(text.as_bytes()).to_vec());
            self.resolve_seed(seed)?
        } else if let Some(seed) = self.seed.take() {
            self.resolve_seed(seed)?
        } else if let Some(phrase) = self.mnemonic.take() {
            self.resolve_mnemonic(phrase, "", "")?
        } else if let Some(uri) = self.uri.take() {
            self.resolve_uri(&uri)?
        } else if self.has_raw_keys() {
            Resolved::bare(self.resolve_raw_keys()?)
        } else {
            let phrase = SeedPhrase::generate(self.mnemonic_words, self.language)?;
            let resolved = self.resolve_mnemonic(Zeroizing::new(phrase.phrase()), "", "")?;
            info!("Generated new {} keypair from a fresh mnemonic", self.scheme);
            resolved
        };

        self.finalize(resolved)
    }

    fn resolve_seed(&self, seed: Zeroizing<Vec<u8>>) -> Result<Resolved, IdentityError> {
        let material = self.scheme.keypair_from_seed(&seed)?;
        Ok(Resolved {
            seed: Some(seed),
            ..Resolved::bare(material)
        })
    }

    fn resolve_mnemonic(
        &self,
        phrase: Zeroizing<String>,
        path: &str,
        password: &str,
    ) -> Result<Resolved, IdentityError> {
        if self.scheme == SignatureScheme::Ecdsa {
            if self.language != MnemonicLanguage::English {
                return Err(IdentityError::UnsupportedFeature(
                    "ECDSA mnemonics must be English".into(),
                ));
            }
            let seed_phrase = SeedPhrase::from_phrase(&phrase, MnemonicLanguage::English)?;
            let hd_path = derivation::bip32_path(path)?;
            let secret = Zeroizing::new(ecdsa::secret_from_mnemonic_seed(
                &seed_phrase.to_seed(password),
                &hd_path,
            )?);
            let material = self.scheme.keypair_from_seed(&secret[..])?;
            return Ok(Resolved {
                material,
                mnemonic: Some(phrase),
                seed: None,
                derive_path: (!path.is_empty()).then(|| path.to_string()),
            });
        }

        let seed_phrase = SeedPhrase::from_phrase(&phrase, self.language)?;
        let mini_secret = seed_phrase.to_mini_secret(password);
        let material = self.scheme.keypair_from_seed(&mini_secret[..])?;

        Ok(Resolved {
            material,
            mnemonic: Some(phrase),
            seed: Some(Zeroizing::new(mini_secret.to_vec())),
            derive_path: None,
        })
    }

    fn resolve_uri(&self, uri: &str) -> Result<Resolved, IdentityError> {
        let uri = SecretUri::parse(uri)?;
        let password = uri.password.as_ref().map(|p| p.as_str()).unwrap_or("");

        if uri.is_hex_seed() {
            if !password.is_empty() {
                return Err(IdentityError::UnsupportedFeature(
                    "passwords are not supported with hex seeds".into(),
                ));
            }
            let seed = Zeroizing::new(decode_prefixed_hex(&uri.phrase)?);
            let resolved = self.resolve_seed(seed)?;
            return self.walk(resolved, &uri);
        }

        if self.scheme == SignatureScheme::Ecdsa {
            return self.resolve_mnemonic(uri.phrase.clone(), &uri.path, password);
        }

        if !password.is_empty() {
            return Err(IdentityError::UnsupportedFeature(format!(
                "passwords in secret URIs are not supported for {}",
                self.scheme
            )));
        }

        let resolved = self.resolve_mnemonic(uri.phrase.clone(), "", "")?;
        self.walk(resolved, &uri)
    }

    /// Apply the URI path to a resolved parent
    fn walk(&self, parent: Resolved, uri: &SecretUri) -> Result<Resolved, IdentityError> {
        if uri.path.is_empty() {
            return Ok(parent);
        }
        if !self.scheme.supports_derivation() {
            return Err(IdentityError::UnsupportedDerivation(format!(
                "derivation paths are not supported for {}",
                self.scheme
            )));
        }

        let junctions = uri.junctions()?;
        debug!("Walking {} junctions", junctions.len());
        let material = derivation::derive_sr25519(&parent.material, &junctions)?;

        // The parent seed no longer produces the child key
        Ok(Resolved {
            material,
            mnemonic: parent.mnemonic,
            seed: None,
            derive_path: Some(uri.path.clone()),
        })
    }

    fn resolve_raw_keys(&mut self) -> Result<KeyMaterial, IdentityError> {
        let scheme = self.scheme;

        if let Some(private_key) = self.private_key.take() {
            return material_from_private_key(scheme, &private_key.into_bytes()?);
        }

        if let Some(public_key) = self.public_key.take() {
            let public_key = public_key.into_bytes()?;
            // Keep the address for the cross-check in finalize
            return KeyMaterial::new(scheme, public_key.to_vec(), None);
        }

        match self.address.as_deref() {
            Some(addr) if scheme == SignatureScheme::Ecdsa => {
                let address = ecdsa::parse_address(addr)?;
                KeyMaterial::new(scheme, address.to_vec(), None)
            }
            Some(addr) => {
                let (public_key, _) = address::decode(addr, self.network_format)?;
                KeyMaterial::new(scheme, public_key.to_vec(), None)
            }
            None => Err(IdentityError::MissingKeyMaterial),
        }
    }

    fn finalize(self, resolved: Resolved) -> Result<Keypair, IdentityError> {
        let Resolved {
            material,
            mnemonic,
            seed,
            derive_path,
        } = resolved;

        if let Some(public_key) = self.public_key {
            if public_key.into_bytes()?[..] != *material.public_key() {
                return Err(IdentityError::KeyMismatch);
            }
        }

        // A private key next to a seed, mnemonic or URI must name the same key
        if let Some(private_key) = self.private_key {
            let given = material_from_private_key(material.scheme(), &private_key.into_bytes()?)?;
            if given.public_key() != material.public_key() {
                return Err(IdentityError::KeyMismatch);
            }
        }

        let mut inferred_format = None;
        if let Some(addr) = &self.address {
            let given = if material.scheme().uses_ss58() {
                let (public_key, format) = address::decode(addr, self.network_format)?;
                inferred_format = Some(format);
                public_key.to_vec()
            } else {
                ecdsa::parse_address(addr)?.to_vec()
            };
            if given != material.public_key() {
                return Err(IdentityError::InvalidAddress(format!(
                    "{} does not belong to this key",
                    addr
                )));
            }
        }

        let network_format = self
            .network_format
            .or(inferred_format)
            .unwrap_or(self.default_network_format);

        let mut keypair = Keypair::from_material(material, network_format)?;
        keypair.mnemonic = mnemonic;
        keypair.seed = seed;
        keypair.derive_path = derive_path;
        Ok(keypair)
    }
}

/// Key material from a raw private key. Ed25519 accepts the 32-byte seed
/// or the 64-byte expanded form.
fn material_from_private_key(scheme: SignatureScheme, private_key: &[u8]) -> Result<KeyMaterial, IdentityError> {
    let (public, secret) = match scheme {
        SignatureScheme::Sr25519 => {
            let public = sr25519::public_from_secret(private_key)?;
            (public.to_vec(), private_key.to_vec())
        }
        SignatureScheme::Ed25519 => {
            let (public, secret) = ed25519::expand_secret(private_key)?;
            (public.to_vec(), secret.to_vec())
        }
        SignatureScheme::Ecdsa => {
            crate::crypto::expect_len("ecdsa private key", private_key, ecdsa::SECRET_KEY_LENGTH)?;
            let address = ecdsa::address_from_secret(private_key)?;
            (address.to_vec(), private_key.to_vec())
        }
    };
    KeyMaterial::new(scheme, public, Some(secret))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::CryptoError;

    const ABANDON: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
    const ALICE_PUBLIC: &str = "d43593c715fdd31c61141abd04a99fd6822c8558854ccde39a5684e7a56da27d";

    #[test]
    fn test_seed_hex_and_raw_seed_agree() {
        let hex_seed = format!("0x{}", "11".repeat(32));
        let a = KeypairBuilder::new().seed_hex(&hex_seed).build().unwrap();
        let b = KeypairBuilder::new().seed([0x11u8; 32]).build().unwrap();
        let c = KeypairBuilder::new().seed_hex(&"11".repeat(32)).build().unwrap();

        assert_eq!(a.public_key(), b.public_key());
        assert_eq!(a.public_key(), c.public_key());
        assert_eq!(a.network_format(), 42);
    }

    #[test]
    fn test_seed_text_is_hashed() {
        let a = KeypairBuilder::new().seed_text("correct horse").build().unwrap();
        let b = KeypairBuilder::new().seed(sha256(b"correct horse")).build().unwrap();
        assert_eq!(a.address(), b.address());
    }

    #[test]
    fn test_seed_wins_over_mnemonic() {
        let keypair = KeypairBuilder::new()
            .seed([2u8; 32])
            .mnemonic(ABANDON)
            .build()
            .unwrap();
        assert!(keypair.mnemonic().is_none());
        assert_eq!(keypair.seed(), Some(&[2u8; 32][..]));
    }

    #[test]
    fn test_ecdsa_mnemonic_vector() {
        let keypair = KeypairBuilder::new()
            .scheme(SignatureScheme::Ecdsa)
            .mnemonic(ABANDON)
            .build()
            .unwrap();

        assert_eq!(keypair.address(), "0x9858EfFD232B4033E47d90003D41EC34EcaEda94");
        assert_eq!(keypair.public_key().len(), 20);
        assert_eq!(keypair.private_key().unwrap().len(), 32);
    }

    #[test]
    fn test_ecdsa_uri_path_and_password() {
        let default_path = Keypair::from_uri(ABANDON, SignatureScheme::Ecdsa).unwrap();
        let explicit = Keypair::from_uri(&format!("{}//44//60//0/0/0", ABANDON), SignatureScheme::Ecdsa).unwrap();
        let other_index = Keypair::from_uri(&format!("{}//44//60//0/0/1", ABANDON), SignatureScheme::Ecdsa).unwrap();
        let with_password = Keypair::from_uri(&format!("{}///pw", ABANDON), SignatureScheme::Ecdsa).unwrap();

        assert_eq!(default_path.address(), explicit.address());
        assert_ne!(default_path.address(), other_index.address());
        assert_ne!(default_path.address(), with_password.address());
        assert_eq!(explicit.derive_path(), Some("//44//60//0/0/0"));

        assert!(matches!(
            Keypair::from_uri(&format!("{}//Alice", ABANDON), SignatureScheme::Ecdsa),
            Err(IdentityError::InvalidDerivationPath(_))
        ));
    }

    #[test]
    fn test_ecdsa_uri_literal_bip32_path() {
        let literal = Keypair::builder()
            .scheme(SignatureScheme::Ecdsa)
            .uri(&format!("{}/m/44'/60'/0'/0/0", ABANDON))
            .build()
            .unwrap();
        assert_eq!(literal.address(), "0x9858EfFD232B4033E47d90003D41EC34EcaEda94");
        assert_eq!(literal.derive_path(), Some("/m/44'/60'/0'/0/0"));

        let junctions = Keypair::from_uri(&format!("{}//44//60//0/0/1", ABANDON), SignatureScheme::Ecdsa).unwrap();
        let literal_next = Keypair::from_uri(&format!("{}/m/44'/60'/0'/0/1", ABANDON), SignatureScheme::Ecdsa).unwrap();
        assert_eq!(literal_next.address(), junctions.address());
    }

    #[test]
    fn test_ecdsa_requires_english() {
        let result = KeypairBuilder::new()
            .scheme(SignatureScheme::Ecdsa)
            .language(MnemonicLanguage::French)
            .mnemonic(ABANDON)
            .build();
        assert!(matches!(result, Err(IdentityError::UnsupportedFeature(_))));
    }

    #[test]
    fn test_uri_restrictions_for_other_schemes() {
        assert!(matches!(
            Keypair::from_uri("//Alice", SignatureScheme::Ed25519),
            Err(IdentityError::UnsupportedDerivation(_))
        ));
        assert!(matches!(
            Keypair::from_uri("//Alice///secret", SignatureScheme::Sr25519),
            Err(IdentityError::UnsupportedFeature(_))
        ));
        // No path: plain mnemonic keypair for any scheme
        let ed = Keypair::from_uri("", SignatureScheme::Ed25519).unwrap();
        let direct = Keypair::from_mnemonic(derivation::DEV_PHRASE, SignatureScheme::Ed25519).unwrap();
        assert_eq!(ed.public_key(), direct.public_key());
    }

    #[test]
    fn test_hex_seed_uri() {
        let uri = format!("0x{}//Alice", "00".repeat(32));
        let derived = Keypair::from_uri(&uri, SignatureScheme::Sr25519).unwrap();
        let root = Keypair::from_seed(&[0u8; 32], SignatureScheme::Sr25519, 42).unwrap();

        assert_eq!(derived.public_key(), root.derive("//Alice").unwrap().public_key());
        assert!(derived.mnemonic().is_none());
    }

    #[test]
    fn test_private_key_inputs() {
        let alice = Keypair::from_uri("//Alice", SignatureScheme::Sr25519).unwrap();
        let secret_hex = format!("0x{}", hex::encode(alice.private_key().unwrap()));

        let restored = Keypair::from_private_key(secret_hex.as_str(), SignatureScheme::Sr25519).unwrap();
        assert_eq!(restored.public_key_hex(), ALICE_PUBLIC);

        let too_short = Keypair::from_private_key(&[1u8; 32], SignatureScheme::Sr25519);
        assert!(matches!(
            too_short,
            Err(IdentityError::Crypto(CryptoError::InvalidKeyLength { .. }))
        ));

        // Ed25519 accepts the bare seed and expands it
        let ed = Keypair::from_private_key(&[4u8; 32], SignatureScheme::Ed25519).unwrap();
        let from_seed = Keypair::from_seed(&[4u8; 32], SignatureScheme::Ed25519, 42).unwrap();
        assert_eq!(ed.public_key(), from_seed.public_key());
        assert_eq!(ed.private_key(), from_seed.private_key());
    }

    #[test]
    fn test_ecdsa_private_key_sets_address() {
        let mut key = [0u8; 32];
        key[31] = 1;
        let keypair = Keypair::from_private_key(&key, SignatureScheme::Ecdsa).unwrap();

        assert_eq!(keypair.address(), "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf");
        assert_eq!(hex::encode(keypair.public_key()), "7e5f4552091a69125d5dfcb7b8c2659029395bdf");

        let watcher = Keypair::from_address(keypair.address(), SignatureScheme::Ecdsa).unwrap();
        assert_eq!(watcher.public_key(), keypair.public_key());
    }

    #[test]
    fn test_public_key_and_address_cross_checks() {
        let alice = Keypair::from_uri("//Alice", SignatureScheme::Sr25519).unwrap();
        let bob = Keypair::from_uri("//Bob", SignatureScheme::Sr25519).unwrap();

        let ok = KeypairBuilder::new()
            .public_key(ALICE_PUBLIC)
            .address(alice.address())
            .build()
            .unwrap();
        assert_eq!(ok.address(), alice.address());

        let mismatched_address = KeypairBuilder::new()
            .public_key(ALICE_PUBLIC)
            .address(bob.address())
            .build();
        assert!(matches!(mismatched_address, Err(IdentityError::InvalidAddress(_))));

        let mismatched_key = KeypairBuilder::new()
            .private_key(alice.private_key().unwrap())
            .public_key(bob.public_key())
            .build();
        assert!(matches!(mismatched_key, Err(IdentityError::KeyMismatch)));
    }

    #[test]
    fn test_private_key_checked_against_uri_and_seed() {
        let alice = Keypair::from_uri("//Alice", SignatureScheme::Sr25519).unwrap();
        let bob = Keypair::from_uri("//Bob", SignatureScheme::Sr25519).unwrap();

        let same = KeypairBuilder::new()
            .uri("//Alice")
            .private_key(alice.private_key().unwrap())
            .build()
            .unwrap();
        assert_eq!(same.address(), alice.address());
        assert_eq!(same.derive_path(), Some("//Alice"));

        let other = KeypairBuilder::new()
            .uri("//Alice")
            .private_key(bob.private_key().unwrap())
            .build();
        assert!(matches!(other, Err(IdentityError::KeyMismatch)));

        let ed_seed = KeypairBuilder::new()
            .scheme(SignatureScheme::Ed25519)
            .seed([4u8; 32])
            .private_key(&[5u8; 32])
            .build();
        assert!(matches!(ed_seed, Err(IdentityError::KeyMismatch)));

        let ecdsa = KeypairBuilder::new()
            .scheme(SignatureScheme::Ecdsa)
            .mnemonic(ABANDON)
            .private_key(&[1u8; 32])
            .build();
        assert!(matches!(ecdsa, Err(IdentityError::KeyMismatch)));
    }

    #[test]
    fn test_network_format_inferred_from_address() {
        let polkadot = address::encode(&hex::decode(ALICE_PUBLIC).unwrap(), 0).unwrap();
        let keypair = Keypair::from_address(&polkadot, SignatureScheme::Sr25519).unwrap();

        assert_eq!(keypair.network_format(), 0);
        assert_eq!(keypair.address(), polkadot);

        let reformatted = KeypairBuilder::new()
            .public_key(ALICE_PUBLIC)
            .network_format(2)
            .build()
            .unwrap();
        assert_eq!(reformatted.network_format(), 2);
        assert_eq!(address::address_format(reformatted.address()).unwrap(), 2);
    }

    #[test]
    fn test_invalid_raw_inputs() {
        // A network format alone is not provenance, so a key is generated
        assert!(KeypairBuilder::new().network_format(0).build().is_ok());

        assert!(matches!(
            KeypairBuilder::new().public_key(&[1u8; 31]).build(),
            Err(IdentityError::Crypto(CryptoError::InvalidKeyLength { .. }))
        ));
        assert!(matches!(
            KeypairBuilder::new().address("not an address").build(),
            Err(IdentityError::InvalidAddress(_))
        ));
        assert!(matches!(
            KeypairBuilder::new().seed([0u8; 16]).build(),
            Err(IdentityError::Crypto(CryptoError::InvalidSeedLength { .. }))
        ));
    }

    #[test]
    fn test_with_config_defaults() {
        let config = KeyringConfig {
            default_scheme: SignatureScheme::Ed25519,
            network_format: 2,
            mnemonic_words: 24,
            ..KeyringConfig::default()
        };
        let keypair = KeypairBuilder::with_config(&config).build().unwrap();

        assert_eq!(keypair.scheme(), SignatureScheme::Ed25519);
        assert_eq!(keypair.network_format(), 2);
        assert_eq!(keypair.mnemonic().unwrap().split_whitespace().count(), 24);
    }
}
